use std::fmt::{self, Write};

use async_trait::async_trait;
use chrono::Utc;
use tokio::{fs::File, io::AsyncWriteExt, time::Instant};

use crate::models;

use super::{common::*, DeviceError};

pub type FileDevice = Rewriter<FileDeviceImpl>;

/// Format a frame as `[{r,g,b},{r,g,b},...]`
fn format_frame(out: &mut String, leds: &[models::Color]) -> fmt::Result {
    out.push('[');

    for (i, led) in leds.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }

        write!(out, "{{{},{},{}}}", led.red, led.green, led.blue)?;
    }

    out.push(']');
    Ok(())
}

/// Device that appends every frame it is given to a log file, one line per write
pub struct FileDeviceImpl {
    frame: Vec<models::Color>,
    print_timestamp: bool,
    output: File,
    previous_write: Option<Instant>,
    line: String,
}

#[async_trait]
impl WritingDevice for FileDeviceImpl {
    type Config = models::File;

    fn new(config: &Self::Config) -> Result<Self, DeviceError> {
        let output = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.output)?;

        Ok(Self {
            frame: vec![Default::default(); config.hardware_led_count as _],
            print_timestamp: config.print_time_stamp,
            output: File::from_std(output),
            previous_write: None,
            line: String::new(),
        })
    }

    async fn set_led_data(
        &mut self,
        _config: &Self::Config,
        led_data: &[models::Color],
    ) -> Result<(), DeviceError> {
        self.frame.copy_from_slice(led_data);
        Ok(())
    }

    async fn write(&mut self) -> Result<(), DeviceError> {
        let now = Instant::now();
        self.line.clear();

        if self.print_timestamp {
            let since_previous = self
                .previous_write
                .map(|previous| now.duration_since(previous).as_millis())
                .unwrap_or(0);

            write!(self.line, "{} | +{}ms ", Utc::now(), since_previous)?;
        }

        format_frame(&mut self.line, &self.frame)?;
        self.line.push('\n');
        self.previous_write = Some(now);

        self.output.write_all(self.line.as_bytes()).await?;
        self.output.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use super::super::DeviceImpl;
    use super::*;

    const RED: models::Color = models::Color::new(255, 0, 0);
    const BLACK: models::Color = models::Color::new(0, 0, 0);

    /// Log file path unique to a test, removed when dropped
    struct TempLog(PathBuf);

    impl TempLog {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "gridlight-{}-{}.log",
                name,
                std::process::id()
            ));
            std::fs::remove_file(&path).ok();
            Self(path)
        }

        fn device(&self, rewrite_time: u32, print_time_stamp: bool) -> FileDevice {
            FileDevice::new(models::File {
                hardware_led_count: 2,
                output: self.0.to_string_lossy().into_owned(),
                rewrite_time,
                print_time_stamp,
                brightness: 255,
            })
            .unwrap()
        }

        fn lines(&self) -> Vec<String> {
            std::fs::read_to_string(&self.0)
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    impl Drop for TempLog {
        fn drop(&mut self) {
            std::fs::remove_file(&self.0).ok();
        }
    }

    #[test]
    fn test_format_frame() {
        let mut line = String::new();
        format_frame(&mut line, &[RED, BLACK, models::Color::new(1, 2, 3)]).unwrap();
        assert_eq!(line, "[{255,0,0},{0,0,0},{1,2,3}]");

        line.clear();
        format_frame(&mut line, &[]).unwrap();
        assert_eq!(line, "[]");
    }

    #[tokio::test]
    async fn test_write_appends_frames() {
        let log = TempLog::new("append");
        let mut device = log.device(0, false);

        device.set_led_data(&[RED, BLACK]).await.unwrap();
        device.set_led_data(&[BLACK, BLACK]).await.unwrap();

        assert_eq!(
            log.lines(),
            vec!["[{255,0,0},{0,0,0}]", "[{0,0,0},{0,0,0}]"]
        );
    }

    #[tokio::test]
    async fn test_write_with_timestamp() {
        let log = TempLog::new("timestamp");
        let mut device = log.device(0, true);

        device.set_led_data(&[BLACK, RED]).await.unwrap();

        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(" | +0ms "));
        assert!(lines[0].ends_with("[{0,0,0},{255,0,0}]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewrite_repeats_last_frame() {
        let log = TempLog::new("rewrite");
        let mut device = log.device(1000, false);

        device.set_led_data(&[RED, BLACK]).await.unwrap();

        let start = Instant::now();
        device.update().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1000));

        assert_eq!(
            log.lines(),
            vec!["[{255,0,0},{0,0,0}]", "[{255,0,0},{0,0,0}]"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_rewrite_when_disabled() {
        let log = TempLog::new("no-rewrite");
        let mut device = log.device(0, false);

        device.set_led_data(&[RED, RED]).await.unwrap();

        assert!(
            tokio::time::timeout(Duration::from_secs(10), device.update())
                .await
                .is_err()
        );
        assert_eq!(log.lines().len(), 1);
    }
}
