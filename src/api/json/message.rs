use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::EnumString;
use validator::Validate;

use super::JsonApiError;
use crate::{
    color::DEFAULT_HIGHLIGHT_COLOR,
    models::Color,
    scheduler::{HighlightRequest, Target, DEFAULT_DURATION_SECS},
    serde::{deserialize_color, serialize_color_as_object},
};

/// Name of a requested action, as found in the `action` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Highlight,
    TurnOffAll,
    Status,
}

fn default_color() -> Color {
    DEFAULT_HIGHLIGHT_COLOR
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_SECS
}

/// Light a set of LEDs for a while
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct Highlight {
    /// Raw LED indices or position tokens such as `B2` and `A1-A4`
    #[validate(length(min = 1))]
    pub led_indices_or_positions: Vec<Target>,
    #[serde(default = "default_color", deserialize_with = "deserialize_color")]
    pub color: Color,
    /// Duration in seconds
    #[serde(default = "default_duration")]
    pub duration: u32,
}

impl From<Highlight> for HighlightRequest {
    fn from(highlight: Highlight) -> Self {
        HighlightRequest::new(
            highlight.led_indices_or_positions,
            highlight.color,
            highlight.duration,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LedRequest {
    Highlight(Highlight),
    TurnOffAll,
    Status,
}

impl Validate for LedRequest {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            LedRequest::Highlight(highlight) => highlight.validate(),
            LedRequest::TurnOffAll | LedRequest::Status => Ok(()),
        }
    }
}

/// Parse a request payload
///
/// The action is looked up first, so that an unknown action is reported as such even if the
/// rest of the payload doesn't make sense for any known action.
pub fn parse_request(src: &[u8]) -> Result<LedRequest, JsonApiError> {
    let value: Value =
        serde_json::from_slice(src).map_err(|err| JsonApiError::MalformedPayload(err.to_string()))?;

    let action = match value.get("action") {
        Some(Value::String(action)) => action,
        Some(_) => {
            return Err(JsonApiError::MalformedPayload(
                "action must be a string".to_owned(),
            ))
        }
        None => {
            return Err(JsonApiError::MalformedPayload(
                "missing action field".to_owned(),
            ))
        }
    };

    Ok(
        match Action::from_str(action)
            .map_err(|_| JsonApiError::UnknownAction(action.to_owned()))?
        {
            Action::Highlight => LedRequest::Highlight(
                serde_json::from_value(value)
                    .map_err(|err| JsonApiError::MalformedPayload(err.to_string()))?,
            ),
            Action::TurnOffAll => LedRequest::TurnOffAll,
            Action::Status => LedRequest::Status,
        },
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub hostname: String,
    pub version: String,
    /// Type of the output device, absent if it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'static str>,
}

impl DeviceInfo {
    pub fn new(name: String, output: Option<&'static str>) -> Self {
        Self {
            name,
            hostname: hostname(),
            version: version(),
            output,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GridInfo {
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseInfo {
    Highlight {
        led_count: usize,
        duration: u32,
        #[serde(serialize_with = "serialize_color_as_object")]
        color: Color,
    },
    TurnOffAll {
        message: String,
    },
    Status {
        device: DeviceInfo,
        led_count: usize,
        active_leds: usize,
        brightness: u8,
        grid: GridInfo,
        uptime_secs: u64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct LedResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", flatten)]
    info: Option<ResponseInfo>,
}

impl LedResponse {
    fn success_info(action: Action, info: ResponseInfo) -> Self {
        Self {
            success: true,
            action: Some(action),
            error: None,
            info: Some(info),
        }
    }

    pub fn highlight(led_count: usize, duration: u32, color: Color) -> Self {
        Self::success_info(
            Action::Highlight,
            ResponseInfo::Highlight {
                led_count,
                duration,
                color,
            },
        )
    }

    pub fn turn_off_all(count: usize) -> Self {
        Self::success_info(
            Action::TurnOffAll,
            ResponseInfo::TurnOffAll {
                message: format!("turned off {} LEDs", count),
            },
        )
    }

    pub fn status(
        device: DeviceInfo,
        led_count: usize,
        active_leds: usize,
        brightness: u8,
        grid: GridInfo,
        uptime_secs: u64,
    ) -> Self {
        Self::success_info(
            Action::Status,
            ResponseInfo::Status {
                device,
                led_count,
                active_leds,
                brightness,
                grid,
                uptime_secs,
            },
        )
    }

    pub fn error(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            action: None,
            error: Some(error.to_string()),
            info: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

fn hostname() -> String {
    hostname::get()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|_| "<unknown hostname>".to_owned())
}

fn version() -> String {
    git_version::git_version!(
        prefix = "gridlight-",
        args = ["--always", "--tags"],
        fallback = "unknown"
    )
    .to_owned()
}
