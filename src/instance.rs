//! LED controller task
//!
//! An [Instance] owns the [Scheduler] and the output device. It runs as a single task that
//! handles commands from [InstanceHandle]s one at a time and sweeps expired highlights on a
//! fixed tick, so no two operations on the LED state ever interleave.

use std::time::Duration;

use thiserror::Error;
use tokio::{
    select,
    sync::{mpsc, oneshot},
    time::{self, Instant, Interval, MissedTickBehavior},
};

use crate::{
    grid::GridError,
    models::{Config, DeviceConfig},
    scheduler::{HighlightOutcome, HighlightRequest, Scheduler, SchedulerStatus},
};

mod device;
pub use device::DeviceError;
use device::*;

/// Snapshot of the controller state for health reporting
#[derive(Debug, Clone)]
pub struct InstanceStatus {
    pub scheduler: SchedulerStatus,
    pub device: Option<&'static str>,
    pub brightness: u8,
    pub uptime: Duration,
}

pub struct Instance {
    scheduler: Scheduler,
    device: InstanceDevice,
    brightness: u8,
    ticker: Interval,
    handle_rx: mpsc::Receiver<InstanceMessage>,
    started_at: Instant,
}

impl Instance {
    pub async fn new(config: &Config) -> (Self, InstanceHandle) {
        let device: InstanceDevice = Device::new(config.device.clone()).await.into();

        if let Err(error) = &device.inner {
            error!(
                name = %config.general.name,
                error = %error,
                "initializing device failed"
            );
        }

        let mut ticker = time::interval(config.scheduler.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let (tx, handle_rx) = mpsc::channel(8);

        (
            Self {
                scheduler: Scheduler::new(config.addressing()),
                device,
                brightness: config.device.brightness(),
                ticker,
                handle_rx,
                started_at: Instant::now(),
            },
            InstanceHandle { tx },
        )
    }

    fn now() -> std::time::Instant {
        Instant::now().into_std()
    }

    async fn write_leds(&mut self) {
        if let Err(error) = self.device.set_led_data(self.scheduler.led_data()).await {
            // A failing device shouldn't take the scheduler down with it
            error!(error = %error, "device write failed, disabling device");
            self.device.inner = Err(error);
        }
    }

    fn status(&self) -> InstanceStatus {
        InstanceStatus {
            scheduler: self.scheduler.status(),
            device: self.device.inner.as_ref().ok().map(Device::name),
            brightness: self.brightness,
            uptime: self.started_at.elapsed(),
        }
    }

    async fn handle_instance_message(&mut self, message: InstanceMessage) -> InstanceControl {
        // ok: the instance shouldn't care if the receiver dropped

        match message {
            InstanceMessage::Highlight(request, tx) => {
                let result = self.scheduler.highlight(&request, Self::now());

                match &result {
                    Ok(outcome) => {
                        debug!(
                            leds = %outcome.indices.len(),
                            duration = %request.duration_secs,
                            "highlight"
                        );

                        if !outcome.indices.is_empty() {
                            self.write_leds().await;
                        }
                    }
                    Err(error) => {
                        debug!(error = %error, "rejected highlight");
                    }
                }

                tx.send(result).ok();
            }
            InstanceMessage::TurnOffAll(tx) => {
                let count = self.scheduler.turn_off_all();
                debug!(leds = %count, "turned off all LEDs");

                self.write_leds().await;
                tx.send(count).ok();
            }
            InstanceMessage::Status(tx) => {
                tx.send(self.status()).ok();
            }
            InstanceMessage::Stop(tx) => {
                tx.send(()).ok();
                return InstanceControl::Break;
            }
        }

        InstanceControl::Continue
    }

    #[instrument]
    pub async fn run(mut self) {
        // Start from a known state
        self.write_leds().await;

        loop {
            select! {
                _ = self.ticker.tick() => {
                    let expired = self.scheduler.tick(Self::now());

                    if expired > 0 {
                        debug!(leds = %expired, "highlight expired");
                        self.write_leds().await;
                    }
                },
                update = self.device.update() => {
                    trace!("device update");

                    if let Err(error) = update {
                        // A device update shouldn't error, disable it
                        error!(error = %error, "device update failed, disabling device");
                        self.device.inner = Err(error);
                    }
                },
                message = self.handle_rx.recv() => {
                    trace!(message = ?message, "handle_rx msg");

                    if let Some(message) = message {
                        if InstanceControl::Break == self.handle_instance_message(message).await {
                            break;
                        }
                    } else {
                        // All handles were dropped
                        break;
                    }
                }
            }
        }

        self.scheduler.turn_off_all();
        self.write_leds().await;
        info!("controller stopped");
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// A wrapper for a device that may have failed initializing
struct InstanceDevice {
    inner: Result<Device, DeviceError>,
}

impl InstanceDevice {
    async fn update(&mut self) -> Result<(), DeviceError> {
        if let Ok(device) = &mut self.inner {
            device.update().await
        } else {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    async fn set_led_data(
        &mut self,
        led_data: impl Iterator<Item = crate::models::Color> + Send,
    ) -> Result<(), DeviceError> {
        if let Ok(device) = &mut self.inner {
            device.set_led_data(led_data).await
        } else {
            Ok(())
        }
    }
}

impl From<Result<Device, DeviceError>> for InstanceDevice {
    fn from(inner: Result<Device, DeviceError>) -> Self {
        Self { inner }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum InstanceControl {
    Continue,
    Break,
}

#[derive(Debug)]
enum InstanceMessage {
    Highlight(
        HighlightRequest,
        oneshot::Sender<Result<HighlightOutcome, GridError>>,
    ),
    TurnOffAll(oneshot::Sender<usize>),
    Status(oneshot::Sender<InstanceStatus>),
    Stop(oneshot::Sender<()>),
}

/// Cloneable handle used to send commands to a running [Instance]
#[derive(Debug, Clone)]
pub struct InstanceHandle {
    tx: mpsc::Sender<InstanceMessage>,
}

#[derive(Debug, Error)]
pub enum InstanceHandleError {
    #[error("the LED controller is no longer running")]
    Dropped,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for InstanceHandleError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::Dropped
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for InstanceHandleError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::Dropped
    }
}

impl InstanceHandle {
    /// Apply a highlight request
    ///
    /// The outer result fails if the controller is gone, the inner one if the request was
    /// rejected.
    pub async fn highlight(
        &self,
        request: HighlightRequest,
    ) -> Result<Result<HighlightOutcome, GridError>, InstanceHandleError> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(InstanceMessage::Highlight(request, tx)).await?;
        Ok(rx.await?)
    }

    /// Turn off every LED, returning how many were lit
    pub async fn turn_off_all(&self) -> Result<usize, InstanceHandleError> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(InstanceMessage::TurnOffAll(tx)).await?;
        Ok(rx.await?)
    }

    pub async fn status(&self) -> Result<InstanceStatus, InstanceHandleError> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(InstanceMessage::Status(tx)).await?;
        Ok(rx.await?)
    }

    pub async fn stop(&self) -> Result<(), InstanceHandleError> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(InstanceMessage::Stop(tx)).await?;
        Ok(rx.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::Color, scheduler::Target};

    const RED: Color = Color::new(255, 0, 0);
    const BLUE: Color = Color::new(0, 0, 255);

    async fn spawn() -> (InstanceHandle, tokio::task::JoinHandle<()>) {
        let (instance, handle) = Instance::new(&Config::default()).await;
        (handle, tokio::spawn(instance.run()))
    }

    fn request(targets: &[&str], color: Color, duration_secs: u32) -> HighlightRequest {
        HighlightRequest::new(targets.iter().map(|&t| Target::from(t)), color, duration_secs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_highlight_expires() {
        let (handle, _join) = spawn().await;

        let outcome = handle
            .highlight(request(&["A1-A3"], RED, 5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.indices, vec![0, 1, 2]);
        assert_eq!(handle.status().await.unwrap().scheduler.active_leds, 3);

        time::sleep(Duration::from_secs(4)).await;
        assert_eq!(handle.status().await.unwrap().scheduler.active_leds, 3);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.status().await.unwrap().scheduler.active_leds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_override_shortens_highlight() {
        let (handle, _join) = spawn().await;

        handle
            .highlight(request(&["A1"], RED, 10))
            .await
            .unwrap()
            .unwrap();
        time::sleep(Duration::from_secs(1)).await;
        handle
            .highlight(request(&["A1"], BLUE, 2))
            .await
            .unwrap()
            .unwrap();

        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(handle.status().await.unwrap().scheduler.active_leds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_highlight() {
        let (handle, _join) = spawn().await;

        let result = handle
            .highlight(request(&["B2", "A1-"], RED, 5))
            .await
            .unwrap();
        assert!(matches!(result, Err(GridError::MalformedRange(_))));
        assert_eq!(handle.status().await.unwrap().scheduler.active_leds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_off_all_and_stop() {
        let (handle, join) = spawn().await;

        handle
            .highlight(request(&["A1-E1", "C3"], RED, 60))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.turn_off_all().await.unwrap(), 6);
        assert_eq!(handle.turn_off_all().await.unwrap(), 0);

        let status = handle.status().await.unwrap();
        assert_eq!(status.scheduler.active_leds, 0);
        assert_eq!(status.device, Some("Dummy"));
        assert_eq!(status.brightness, 255);

        handle.stop().await.unwrap();
        join.await.unwrap();

        assert!(matches!(
            handle.status().await,
            Err(InstanceHandleError::Dropped)
        ));
    }
}
