use async_trait::async_trait;
use tokio::time::{self, Instant};

use super::{DeviceError, DeviceImpl};
use crate::models::{self, DeviceConfig};

/// A device that receives whole frames and pushes them out on demand
#[async_trait]
pub trait WritingDevice: Send + Sized {
    type Config: DeviceConfig;

    fn new(config: &Self::Config) -> Result<Self, DeviceError>;

    async fn set_led_data(
        &mut self,
        config: &Self::Config,
        led_data: &[models::Color],
    ) -> Result<(), DeviceError>;

    async fn write(&mut self) -> Result<(), DeviceError>;
}

/// Pushes every new frame immediately, and repeats the last one whenever the output has been
/// idle for the configured `rewrite_time`
///
/// Strips that latch their state don't need repeats; a zero `rewrite_time` disables them.
pub struct Rewriter<D: WritingDevice> {
    inner: D,
    config: D::Config,
    /// Deadline of the next repeat, None when repeats are disabled
    next_write: Option<Instant>,
}

impl<D: WritingDevice> Rewriter<D> {
    pub fn new(config: D::Config) -> Result<Self, DeviceError> {
        let next_write = config.rewrite_time().map(|_| Instant::now());

        Ok(Self {
            inner: D::new(&config)?,
            config,
            next_write,
        })
    }

    async fn write(&mut self) -> Result<(), DeviceError> {
        self.inner.write().await?;
        self.next_write = self
            .config
            .rewrite_time()
            .map(|period| Instant::now() + period);
        Ok(())
    }
}

#[async_trait]
impl<D: WritingDevice> DeviceImpl for Rewriter<D> {
    async fn set_led_data(&mut self, led_data: &[models::Color]) -> Result<(), DeviceError> {
        self.inner.set_led_data(&self.config, led_data).await?;
        self.write().await
    }

    async fn update(&mut self) -> Result<(), DeviceError> {
        // The deadline lives in self, so a cancelled update resumes on the same schedule
        match self.next_write {
            Some(deadline) => {
                time::sleep_until(deadline).await;
                self.write().await
            }
            None => futures::future::pending().await,
        }
    }
}
