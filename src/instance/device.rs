use async_trait::async_trait;
use thiserror::Error;

use crate::{
    color,
    models::{self, DeviceConfig},
};

mod common;

// Device implementation modules

mod dummy;
mod file;
mod ws2812spi;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("format error: {0}")]
    Format(#[from] std::fmt::Error),
}

#[async_trait]
trait DeviceImpl: Send {
    /// Set the device implementation's view of the LED data to the given values
    ///
    /// # Panics
    ///
    /// Implementations are allowed to panic if led_data.len() != hardware_led_count. The [Device]
    /// wrapper is responsible for ensuring the given slice is the right size.
    async fn set_led_data(&mut self, led_data: &[models::Color]) -> Result<(), DeviceError>;

    /// Update the device implementation's temporal data. For devices that require regular rewrites
    /// (regardless of actual changes in the LED data), this should return a future that performs
    /// the required work.
    async fn update(&mut self) -> Result<(), DeviceError>;
}

/// LED output, with brightness applied
pub struct Device {
    name: &'static str,
    inner: Box<dyn DeviceImpl>,
    brightness: u8,
    led_data: Vec<models::Color>,
}

impl Device {
    fn build_inner(config: models::Device) -> Result<Box<dyn DeviceImpl>, DeviceError> {
        let inner: Box<dyn DeviceImpl> = match config {
            models::Device::Dummy(dummy) => Box::new(dummy::DummyDevice::new(dummy)?),
            models::Device::Ws2812Spi(ws2812spi) => {
                Box::new(ws2812spi::Ws2812SpiDevice::new(ws2812spi)?)
            }
            models::Device::File(file) => Box::new(file::FileDevice::new(file)?),
        };

        Ok(inner)
    }

    #[instrument(skip(config))]
    pub async fn new(config: models::Device) -> Result<Self, DeviceError> {
        let name: &'static str = (&config).into();
        let led_count = config.hardware_led_count();
        let brightness = config.brightness();
        let inner = Self::build_inner(config)?;

        Ok(Self {
            name,
            inner,
            brightness,
            led_data: vec![Default::default(); led_count],
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Write new colors to the device
    ///
    /// Missing colors are written as black, extra colors are ignored.
    #[instrument(skip(led_data))]
    pub async fn set_led_data(
        &mut self,
        led_data: impl Iterator<Item = models::Color> + Send,
    ) -> Result<(), DeviceError> {
        let brightness = self.brightness;
        let mut src = led_data.map(|led| color::scale(led, brightness));

        for dst in self.led_data.iter_mut() {
            *dst = src.next().unwrap_or_default();
        }

        self.inner.set_led_data(&self.led_data).await
    }

    #[instrument]
    pub async fn update(&mut self) -> Result<(), DeviceError> {
        self.inner.update().await
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("led_count", &self.led_data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_device_pads_and_scales() {
        let mut device = Device::new(models::Device::Dummy(models::Dummy {
            hardware_led_count: 3,
            brightness: 128,
            ..Default::default()
        }))
        .await
        .unwrap();

        assert_eq!(device.name(), "Dummy");

        device
            .set_led_data(vec![models::Color::new(255, 0, 0)].into_iter())
            .await
            .unwrap();

        assert_eq!(
            device.led_data,
            vec![
                models::Color::new(128, 0, 0),
                models::Color::new(0, 0, 0),
                models::Color::new(0, 0, 0)
            ]
        );
    }
}
