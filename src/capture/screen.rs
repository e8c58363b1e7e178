//! Screen frame source
//!
//! Grabs the primary display through xcap and crops to the configured
//! region. Frames come back as RGBA and are converted to the interleaved
//! RGB24 layout the encoder expects.

use crate::capture::traits::{FrameSource, RawFrame};
use crate::config::CaptureRegion;
use crate::error::{RecorderError, RecorderResult};
use xcap::Monitor;

/// Captures the primary display, optionally restricted to a region.
pub struct ScreenSource {
    monitor: Monitor,
    region: Option<CaptureRegion>,
    width: u32,
    height: u32,
}

impl ScreenSource {
    /// Open the primary display. Region dimensions are clamped to the
    /// display bounds; coordinates are relative to the primary display's
    /// origin.
    pub fn open(region: Option<CaptureRegion>) -> RecorderResult<Self> {
        let monitors = Monitor::all().map_err(|e| {
            RecorderError::DeviceUnavailable(format!("cannot enumerate displays: {e}"))
        })?;
        let monitor = monitors
            .into_iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .ok_or_else(|| RecorderError::DeviceUnavailable("no primary display".to_string()))?;

        let monitor_width = monitor
            .width()
            .map_err(|e| RecorderError::DeviceUnavailable(format!("display width: {e}")))?;
        let monitor_height = monitor
            .height()
            .map_err(|e| RecorderError::DeviceUnavailable(format!("display height: {e}")))?;

        let (width, height) = match &region {
            Some(r) => (r.width.min(monitor_width), r.height.min(monitor_height)),
            None => (monitor_width, monitor_height),
        };

        tracing::info!(
            "screen source opened: {}x{} ({})",
            width,
            height,
            if region.is_some() { "region" } else { "full display" }
        );

        Ok(Self {
            monitor,
            region,
            width,
            height,
        })
    }
}

impl FrameSource for ScreenSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab(&mut self) -> RecorderResult<RawFrame> {
        let shot = self
            .monitor
            .capture_image()
            .map_err(|e| RecorderError::Capture(format!("screen grab failed: {e}")))?;

        let rgba = match &self.region {
            Some(r) => image::imageops::crop_imm(
                &shot,
                r.x.max(0) as u32,
                r.y.max(0) as u32,
                self.width,
                self.height,
            )
            .to_image(),
            None => shot,
        };

        let rgb = image::DynamicImage::ImageRgba8(rgba).into_rgb8();
        Ok(RawFrame {
            width: rgb.width(),
            height: rgb.height(),
            data: rgb.into_raw(),
        })
    }
}
