use std::fmt;

use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeStruct,
};

use crate::models::Color;

/// Serialize a color as an `{r, g, b}` object
pub fn serialize_color_as_object<S: serde::ser::Serializer>(
    color: &Color,
    s: S,
) -> Result<S::Ok, S::Error> {
    let mut st = s.serialize_struct("Color", 3)?;
    st.serialize_field("r", &color.red)?;
    st.serialize_field("g", &color.green)?;
    st.serialize_field("b", &color.blue)?;
    st.end()
}

/// Serde visitor for colors given either as an `{r, g, b}` object or by name
struct ColorVisitor;

impl<'de> Visitor<'de> for ColorVisitor {
    type Value = Color;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an {r, g, b} object with components in 0-255, or a color name")
    }

    fn visit_str<E>(self, name: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        crate::color::named_color(name)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Str(name), &self))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let (mut r, mut g, mut b) = (None, None, None);

        while let Some(key) = map.next_key::<String>()? {
            let slot = match key.as_str() {
                "r" => &mut r,
                "g" => &mut g,
                "b" => &mut b,
                other => return Err(de::Error::unknown_field(other, &["r", "g", "b"])),
            };

            if slot.is_some() {
                return Err(de::Error::custom(format_args!("duplicate field `{}`", key)));
            }

            *slot = Some(map.next_value::<u8>()?);
        }

        Ok(Color::new(
            r.ok_or_else(|| de::Error::missing_field("r"))?,
            g.ok_or_else(|| de::Error::missing_field("g"))?,
            b.ok_or_else(|| de::Error::missing_field("b"))?,
        ))
    }
}

/// Deserialize a color from an `{r, g, b}` object or a color name
pub fn deserialize_color<'de, D>(d: D) -> Result<Color, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    d.deserialize_any(ColorVisitor)
}
