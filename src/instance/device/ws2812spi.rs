use async_trait::async_trait;
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};

use super::{common::*, DeviceError};
use crate::models;

/// WS2812 (NeoPixel) strip driven through a SPI bus
pub type Ws2812SpiDevice = Rewriter<Ws2812SpiImpl>;

pub struct Ws2812SpiImpl {
    dev: SpiState,
    notified_error: bool,
    buf: Vec<u8>,
}

const SPI_BYTES_PER_LED: usize = 3 * SPI_BYTES_PER_COLOUR;
const SPI_BYTES_PER_COLOUR: usize = 4;
const SPI_FRAME_END_LATCH_BYTES: usize = 116;
const BITPAIR_TO_BYTE: [u8; 4] = [0b10001000, 0b10001100, 0b11001000, 0b11001100];

/// SPI device, opened lazily so a missing bus at startup isn't fatal
enum SpiState {
    Pending { path: String, rate: u32 },
    Ready(Spidev),
}

impl SpiState {
    fn try_init(&mut self) -> Result<&Spidev, DeviceError> {
        if let SpiState::Pending { path, rate } = self {
            let mut dev = Spidev::open(&*path)?;
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(*rate)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            dev.configure(&options)?;

            info!(path = %path, "initialized SPI device");
            *self = SpiState::Ready(dev);
        }

        match self {
            SpiState::Ready(dev) => Ok(dev),
            SpiState::Pending { .. } => unreachable!("SPI device initialized above"),
        }
    }
}

/// Encode colors into the SPI bit pattern, two WS2812 bits per SPI byte
fn encode_frame(buf: &mut [u8], config: &models::Ws2812Spi, led_data: &[models::Color]) {
    let mut ptr = 0;
    for led in led_data {
        let (r, g, b) = config.color_order.reorder_from_rgb(*led).into_components();
        let mut color_bits = ((r as u32) << 16) | ((g as u32) << 8) | (b as u32);

        for j in (0..SPI_BYTES_PER_LED).rev() {
            buf[ptr + j] = BITPAIR_TO_BYTE[(color_bits & 0x3) as usize];
            color_bits >>= 2;
        }

        ptr += SPI_BYTES_PER_LED;
    }

    for dst in buf.iter_mut().skip(ptr) {
        *dst = 0;
    }

    if config.invert {
        for byte in buf.iter_mut() {
            *byte = !*byte;
        }
    }
}

#[async_trait]
impl WritingDevice for Ws2812SpiImpl {
    type Config = models::Ws2812Spi;

    fn new(config: &models::Ws2812Spi) -> Result<Self, DeviceError> {
        let buf = vec![
            0;
            config.hardware_led_count as usize * SPI_BYTES_PER_LED
                + SPI_FRAME_END_LATCH_BYTES
        ];

        let mut dev = SpiState::Pending {
            path: config.output.clone(),
            rate: config.rate,
        };

        if let Err(error) = dev.try_init() {
            warn!(%error, path = %config.output, "failed to initialize SPI device, will try again later");
        }

        Ok(Self {
            dev,
            notified_error: false,
            buf,
        })
    }

    async fn set_led_data(
        &mut self,
        config: &Self::Config,
        led_data: &[models::Color],
    ) -> Result<(), DeviceError> {
        encode_frame(&mut self.buf, config, led_data);
        Ok(())
    }

    async fn write(&mut self) -> Result<(), DeviceError> {
        let mut transfer = SpidevTransfer::write(&self.buf);

        match self.dev.try_init() {
            Ok(dev) => {
                self.notified_error = false;
                dev.transfer(&mut transfer)?;
            }
            Err(err) => {
                if !self.notified_error {
                    self.notified_error = true;
                    error!(error = %err, "failed to initialize SPI device");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(color_order: models::ColorOrder, invert: bool) -> models::Ws2812Spi {
        models::Ws2812Spi {
            color_order,
            hardware_led_count: 2,
            invert,
            output: "/dev/null".to_owned(),
            rate: 3000000,
            rewrite_time: 0,
            brightness: 255,
        }
    }

    #[test]
    fn test_encode_frame() {
        let config = config(models::ColorOrder::Rgb, false);
        let mut buf = vec![0xAA; 2 * SPI_BYTES_PER_LED + SPI_FRAME_END_LATCH_BYTES];

        encode_frame(&mut buf, &config, &[models::Color::new(0xFF, 0, 0x01)]);

        // Red: 0xFF is four 0b11 bit pairs
        assert_eq!(&buf[0..4], &[0b11001100; 4]);
        // Green: all zero bit pairs
        assert_eq!(&buf[4..8], &[0b10001000; 4]);
        // Blue: 0x01 ends with a 0b01 pair
        assert_eq!(
            &buf[8..12],
            &[0b10001000, 0b10001000, 0b10001000, 0b10001100]
        );
        // Unused LEDs and the latch are zeroed
        assert!(buf[SPI_BYTES_PER_LED..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_frame_grb_inverted() {
        let config = config(models::ColorOrder::Grb, true);
        let mut buf = vec![0; 2 * SPI_BYTES_PER_LED + SPI_FRAME_END_LATCH_BYTES];

        encode_frame(&mut buf, &config, &[models::Color::new(0, 0xFF, 0)]);

        // Green is sent first
        assert_eq!(&buf[0..4], &[!0b11001100u8; 4]);
        assert!(buf[SPI_BYTES_PER_LED..].iter().all(|&b| b == 0xFF));
    }
}
