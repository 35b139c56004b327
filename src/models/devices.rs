use ambassador::{delegatable_trait, Delegate};
use derive_more::From;
use serde_derive::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;
use validator::Validate;

use super::{default_false, ColorOrder};

#[delegatable_trait]
pub trait DeviceConfig: Sync + Send {
    fn hardware_led_count(&self) -> usize;

    /// Global brightness applied to every LED, 255 meaning full brightness
    fn brightness(&self) -> u8;

    fn rewrite_time(&self) -> Option<std::time::Duration> {
        None
    }
}

macro_rules! impl_device_config {
    ($t:ty) => {
        impl DeviceConfig for $t {
            fn hardware_led_count(&self) -> usize {
                self.hardware_led_count as _
            }

            fn brightness(&self) -> u8 {
                self.brightness
            }

            fn rewrite_time(&self) -> Option<std::time::Duration> {
                if self.rewrite_time == 0 {
                    None
                } else {
                    Some(std::time::Duration::from_millis(self.rewrite_time as _))
                }
            }
        }
    };
}

fn default_brightness() -> u8 {
    255
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DummyDeviceMode {
    Text,
    Ansi,
}

impl Default for DummyDeviceMode {
    fn default() -> Self {
        Self::Text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Dummy {
    #[validate(range(min = 1))]
    pub hardware_led_count: u32,
    pub rewrite_time: u32,
    pub brightness: u8,
    pub mode: DummyDeviceMode,
}

impl_device_config!(Dummy);

impl Default for Dummy {
    fn default() -> Self {
        Self {
            hardware_led_count: 25,
            rewrite_time: 0,
            brightness: default_brightness(),
            mode: Default::default(),
        }
    }
}

fn default_ws_spi_rate() -> u32 {
    3000000
}

fn default_ws_spi_rewrite_time() -> u32 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Ws2812Spi {
    #[serde(default = "Default::default")]
    pub color_order: ColorOrder,
    #[validate(range(min = 1))]
    pub hardware_led_count: u32,
    #[serde(default = "default_false")]
    pub invert: bool,
    pub output: String,
    #[serde(default = "default_ws_spi_rate")]
    #[validate(range(min = 100000))]
    pub rate: u32,
    #[serde(default = "default_ws_spi_rewrite_time")]
    pub rewrite_time: u32,
    #[serde(default = "default_brightness")]
    pub brightness: u8,
}

impl_device_config!(Ws2812Spi);

fn default_file_rewrite_time() -> u32 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct File {
    #[validate(range(min = 1))]
    pub hardware_led_count: u32,
    #[validate(length(min = 1))]
    pub output: String,
    #[serde(default = "default_file_rewrite_time")]
    pub rewrite_time: u32,
    #[serde(default = "Default::default")]
    pub print_time_stamp: bool,
    #[serde(default = "default_brightness")]
    pub brightness: u8,
}

impl_device_config!(File);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr, Delegate, From)]
#[serde(rename_all = "lowercase", tag = "type", deny_unknown_fields)]
#[delegate(DeviceConfig)]
pub enum Device {
    Dummy(Dummy),
    Ws2812Spi(Ws2812Spi),
    File(File),
}

impl Default for Device {
    fn default() -> Self {
        Self::Dummy(Dummy::default())
    }
}

impl Validate for Device {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            Device::Dummy(device) => device.validate(),
            Device::Ws2812Spi(device) => device.validate(),
            Device::File(device) => device.validate(),
        }
    }
}
