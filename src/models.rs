use std::path::Path;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

mod devices;
pub use devices::*;

mod layouts;
pub use layouts::*;

pub type Color = palette::rgb::LinSrgb<u8>;

pub trait ServerConfig {
    fn enable(&self) -> bool;

    fn port(&self) -> u16;
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    Rgb,
    Bgr,
    Rbg,
    Brg,
    Gbr,
    Grb,
}

impl ColorOrder {
    pub fn reorder_from_rgb(&self, color: Color) -> Color {
        let (r, g, b) = color.into_components();

        Color::from_components(match self {
            ColorOrder::Rgb => (r, g, b),
            ColorOrder::Bgr => (b, g, r),
            ColorOrder::Rbg => (r, b, g),
            ColorOrder::Brg => (b, r, g),
            ColorOrder::Gbr => (g, b, r),
            ColorOrder::Grb => (g, r, b),
        })
    }
}

impl Default for ColorOrder {
    fn default() -> Self {
        // WS2812 strips expect GRB data
        Self::Grb
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct General {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            name: "Storage grid".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Scheduler {
    /// Interval between two expiry sweeps, in milliseconds
    #[validate(range(min = 10, max = 10000))]
    pub tick_ms: u32,
}

impl Scheduler {
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_ms as _)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { tick_ms: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct JsonServer {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[validate(range(min = 1024))]
    pub port: u16,
}

impl Default for JsonServer {
    fn default() -> Self {
        Self {
            enable: true,
            port: 19444,
        }
    }
}

impl ServerConfig for JsonServer {
    fn enable(&self) -> bool {
        self.enable
    }

    fn port(&self) -> u16 {
        self.port
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct WebConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[validate(range(min = 80))]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: true,
            port: 8090,
        }
    }
}

impl ServerConfig for WebConfig {
    fn enable(&self) -> bool {
        self.enable
    }

    fn port(&self) -> u16 {
        self.port
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[validate(nested)]
    pub general: General,
    #[validate(nested)]
    pub grid: GridConfig,
    #[validate(nested)]
    pub device: Device,
    #[validate(nested)]
    pub scheduler: Scheduler,
    #[validate(nested)]
    pub json_server: JsonServer,
    #[validate(nested)]
    pub web_config: WebConfig,
}

impl Config {
    pub fn from_toml(src: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load_file(path: &Path) -> Result<Self, ConfigError> {
        use tokio::io::AsyncReadExt;

        let mut file = tokio::fs::File::open(path).await?;
        let mut full = String::new();
        file.read_to_string(&mut full).await?;

        let config = Self::from_toml(&full)?;

        debug!(
            path = %path.display(),
            name = %config.general.name,
            rows = %config.grid.rows,
            columns = %config.grid.columns,
            leds = %config.device.hardware_led_count(),
            "loaded",
        );

        Ok(config)
    }

    /// Location of the user configuration file, if there is one
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir()
            .map(|mut path| {
                path.push("gridlight");
                path.push("config.toml");
                path
            })
            .filter(|path| path.is_file())
    }

    pub fn to_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Addressing scheme for the configured grid and device
    pub fn addressing(&self) -> Addressing {
        Addressing::new(
            self.grid.grid(),
            self.grid.wiring.clone(),
            self.device.hardware_led_count(),
        )
    }
}
