//! Color utilities

use std::fmt::Write;

use crate::models::Color;

/// Color used for highlights that don't specify one
pub const DEFAULT_HIGHLIGHT_COLOR: Color = Color::new(0, 0, 255);

/// Look up a color by its name
///
/// Matching is case-insensitive.
pub fn named_color(name: &str) -> Option<Color> {
    let (r, g, b) = match name.trim().to_ascii_lowercase().as_str() {
        "red" => (255, 0, 0),
        "green" => (0, 255, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "purple" => (255, 0, 255),
        "cyan" => (0, 255, 255),
        "white" => (255, 255, 255),
        "orange" => (255, 165, 0),
        "pink" => (255, 192, 203),
        "off" | "black" => (0, 0, 0),
        _ => return None,
    };

    Some(Color::new(r, g, b))
}

/// Scale a color by a brightness value, 255 leaving it unchanged
pub fn scale(color: Color, brightness: u8) -> Color {
    let (r, g, b) = color.into_components();
    let scale = |x: u8| ((x as u32 * brightness as u32 + 127) / 255) as u8;

    Color::new(scale(r), scale(g), scale(b))
}

/// Render LED colors as a truecolor ANSI string
pub trait AnsiDisplayExt {
    fn to_ansi_truecolor(self, buf: &mut String);
}

impl<T: Iterator<Item = Color>> AnsiDisplayExt for T {
    fn to_ansi_truecolor(self, buf: &mut String) {
        for led in self {
            // Writing to a String never fails
            write!(
                buf,
                "\x1B[38;2;{red};{green};{blue}m█",
                red = led.red,
                green = led.green,
                blue = led.blue
            )
            .ok();
        }

        buf.push_str("\x1B[0m");
    }
}
