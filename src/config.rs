//! Session configuration and pipeline constants.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Audio capture and encode sample rate.
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Interleaved channel count for capture and encode.
pub const AUDIO_CHANNELS: u16 = 2;

/// Samples per channel in one audio block, matching one AAC frame.
pub const AUDIO_CHUNK_SIZE: usize = 1024;

/// Frame rate used when the caller does not pick one.
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Rectangle on the primary display, in physical pixels. Coordinates are
/// relative to the display's origin and may be negative after clamping
/// upstream window math; capture clamps them to the display bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Clamp dimensions down to even values. H.264 4:2:0 needs both sides
/// divisible by two.
pub fn even_dimensions(width: u32, height: u32) -> (u32, u32) {
    let width = if width % 2 == 1 { width - 1 } else { width };
    let height = if height % 2 == 1 { height - 1 } else { height };
    (width, height)
}

/// Everything a caller decides before a session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Output file, or a directory to place a timestamped file in.
    pub output_path: PathBuf,
    /// Portion of the primary display to record; `None` records all of it.
    #[serde(default)]
    pub region: Option<CaptureRegion>,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default)]
    pub audio_enabled: bool,
}

fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}

impl SessionConfig {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            region: None,
            frame_rate: DEFAULT_FRAME_RATE,
            audio_enabled: false,
        }
    }

    /// The file the container is written to. A directory gets a timestamped
    /// file name so repeated sessions never clobber each other.
    pub fn resolved_output_path(&self) -> PathBuf {
        if self.output_path.is_dir() {
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            self.output_path.join(format!("recording-{stamp}.mp4"))
        } else {
            self.output_path.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_even_dimensions_clamps_odd_sides() {
        assert_eq!(even_dimensions(641, 480), (640, 480));
        assert_eq!(even_dimensions(640, 481), (640, 480));
        assert_eq!(even_dimensions(640, 480), (640, 480));
        assert_eq!(even_dimensions(1, 1), (0, 0));
    }

    #[test]
    fn test_config_defaults_from_minimal_json() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"outputPath": "/tmp/out.mp4"}"#).unwrap();
        assert_eq!(config.output_path, Path::new("/tmp/out.mp4"));
        assert_eq!(config.frame_rate, DEFAULT_FRAME_RATE);
        assert!(config.region.is_none());
        assert!(!config.audio_enabled);
    }

    #[test]
    fn test_region_round_trips_through_json() {
        let region = CaptureRegion::new(10, -20, 1280, 720);
        let json = serde_json::to_string(&region).unwrap();
        assert!(json.contains("\"width\":1280"));
        let back: CaptureRegion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, region);
    }

    #[test]
    fn test_resolved_path_keeps_file_names() {
        let config = SessionConfig::new("/tmp/some-file.mp4");
        assert_eq!(config.resolved_output_path(), Path::new("/tmp/some-file.mp4"));
    }

    #[test]
    fn test_resolved_path_timestamps_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path());
        let resolved = config.resolved_output_path();
        assert_eq!(resolved.parent(), Some(dir.path()));
        let name = resolved.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("recording-"));
        assert!(name.ends_with(".mp4"));
    }
}
