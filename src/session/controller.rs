//! Session controller
//!
//! Orchestrates start/stop for one recording session: opens the devices
//! and the container, launches the two capture loops, and performs ordered
//! teardown (stop flag, join loops, flush encoders, close container,
//! release devices). Teardown is best-effort: every step is attempted even
//! when an earlier one failed, and the first failure is surfaced.

use crate::capture::audio::MicrophoneInput;
use crate::capture::screen::ScreenSource;
use crate::capture::traits::{AudioSource, FrameSource};
use crate::clock::SessionClock;
use crate::codec::{AudioEncoder, VideoEncoder};
use crate::config::{even_dimensions, SessionConfig, AUDIO_CHANNELS, AUDIO_SAMPLE_RATE};
use crate::error::{RecorderError, RecorderResult};
use crate::muxer::{AudioStreamParams, ContainerWriter, VideoStreamParams};
use crate::session::loops::{AudioLoop, AudioLoopOutcome, VideoLoop, VideoLoopOutcome};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Result of a completed recording
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub output_path: PathBuf,
    /// Encoded (even-clamped) video dimensions.
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub frames_encoded: u64,
    pub frames_dropped: u64,
    pub audio_blocks_encoded: u64,
    pub audio_blocks_skipped: u64,
    /// Audio packets the container actually accepted.
    pub audio_packets_muxed: u64,
}

/// One live recording: the loops' handles plus everything the controller
/// needs to tear the session down in order.
struct ActiveSession {
    running: Arc<AtomicBool>,
    writer: Arc<ContainerWriter>,
    clock: SessionClock,
    width: u32,
    height: u32,
    video_handle: JoinHandle<VideoLoopOutcome>,
    audio_handle: Option<JoinHandle<AudioLoopOutcome>>,
    /// Device guard for the live microphone stream; released last.
    audio_input: Option<MicrophoneInput>,
}

/// The session controller. At most one session is active at a time.
pub struct Recorder {
    active: Option<ActiveSession>,
}

impl Recorder {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Start a session against the real screen and microphone.
    pub fn start(&mut self, config: SessionConfig) -> RecorderResult<()> {
        if self.active.is_some() {
            return Err(RecorderError::InvalidState("session already running"));
        }

        let video_source = ScreenSource::open(config.region)?;
        let (audio_input, audio_source): (Option<MicrophoneInput>, Option<Box<dyn AudioSource>>) =
            if config.audio_enabled {
                let (input, reader) = MicrophoneInput::open()?;
                (Some(input), Some(Box::new(reader)))
            } else {
                (None, None)
            };

        self.start_session(config, Box::new(video_source), audio_source, audio_input)
    }

    /// Start with caller-supplied capture sources. Used by the tests and by
    /// headless rigs that bring their own frame/audio producers.
    pub fn start_with_sources(
        &mut self,
        config: SessionConfig,
        video_source: Box<dyn FrameSource>,
        audio_source: Option<Box<dyn AudioSource>>,
    ) -> RecorderResult<()> {
        if self.active.is_some() {
            return Err(RecorderError::InvalidState("session already running"));
        }
        self.start_session(config, video_source, audio_source, None)
    }

    fn start_session(
        &mut self,
        config: SessionConfig,
        video_source: Box<dyn FrameSource>,
        audio_source: Option<Box<dyn AudioSource>>,
        audio_input: Option<MicrophoneInput>,
    ) -> RecorderResult<()> {
        if config.frame_rate == 0 {
            return Err(RecorderError::Config("frame rate must be positive".to_string()));
        }

        let (source_width, source_height) = video_source.dimensions();
        let (width, height) = even_dimensions(source_width, source_height);
        if width == 0 || height == 0 {
            return Err(RecorderError::Config(format!(
                "capture region too small: {source_width}x{source_height}"
            )));
        }

        let output_path = config.resolved_output_path();
        let writer = ContainerWriter::create(
            &output_path,
            VideoStreamParams {
                width,
                height,
                frame_rate: config.frame_rate,
            },
            config.audio_enabled.then_some(AudioStreamParams {
                sample_rate: AUDIO_SAMPLE_RATE,
                channels: AUDIO_CHANNELS,
            }),
        )?;

        // The audio device must be usable before the session goes live; a
        // failed start must not leave a half-open output file behind.
        if config.audio_enabled && audio_source.is_none() {
            discard_container(&writer);
            return Err(RecorderError::DeviceUnavailable(
                "audio input unavailable".to_string(),
            ));
        }

        let video_encoder = match VideoEncoder::new(width, height, config.frame_rate) {
            Ok(encoder) => encoder,
            Err(e) => {
                discard_container(&writer);
                return Err(e);
            }
        };
        let audio_encoder = if config.audio_enabled {
            match AudioEncoder::new(AUDIO_SAMPLE_RATE, AUDIO_CHANNELS) {
                Ok(encoder) => Some(encoder),
                Err(e) => {
                    discard_container(&writer);
                    return Err(e);
                }
            }
        } else {
            None
        };

        let running = Arc::new(AtomicBool::new(true));
        let clock = SessionClock::start();
        let writer = Arc::new(writer);

        let video_loop = VideoLoop {
            source: video_source,
            encoder: video_encoder,
            writer: writer.clone(),
            clock,
            running: running.clone(),
            frame_rate: config.frame_rate,
            width,
            height,
        };
        let video_handle = std::thread::Builder::new()
            .name("recap-video".to_string())
            .spawn(move || video_loop.run())
            .map_err(|e| {
                discard_container(&writer);
                RecorderError::Io(e)
            })?;

        let audio_handle = match (audio_source, audio_encoder) {
            (Some(source), Some(encoder)) => {
                let audio_loop = AudioLoop {
                    source,
                    encoder,
                    writer: writer.clone(),
                    running: running.clone(),
                };
                match std::thread::Builder::new()
                    .name("recap-audio".to_string())
                    .spawn(move || audio_loop.run())
                {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        // Unwind the video loop before reporting the failure.
                        running.store(false, Ordering::Release);
                        let _ = video_handle.join();
                        discard_container(&writer);
                        return Err(RecorderError::Io(e));
                    }
                }
            }
            _ => None,
        };

        tracing::info!(
            "recording started: {}x{} @ {} fps, audio {}, output {}",
            width,
            height,
            config.frame_rate,
            if audio_handle.is_some() { "on" } else { "off" },
            writer.path().display()
        );

        self.active = Some(ActiveSession {
            running,
            writer,
            clock,
            width,
            height,
            video_handle,
            audio_handle,
            audio_input,
        });
        Ok(())
    }

    /// Stop the session: signal the loops, wait for them to exit, flush the
    /// encoders, close the container, release the devices.
    ///
    /// Returns `InvalidState` when no session is running; resources are
    /// never re-released on a second call.
    pub fn stop(&mut self) -> RecorderResult<SessionSummary> {
        let session = self
            .active
            .take()
            .ok_or(RecorderError::InvalidState("no session running"))?;
        session.finish()
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveSession {
    fn finish(self) -> RecorderResult<SessionSummary> {
        tracing::info!("stopping recording");

        // Sole cancellation signal; both loops poll it each iteration.
        self.running.store(false, Ordering::Release);

        let mut first_error: Option<RecorderError> = None;

        // Join both loops. A panicked loop is a teardown failure here, not
        // a crash: the remaining steps still run.
        let video_outcome = match self.video_handle.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                record_failure(&mut first_error, "video loop panicked");
                None
            }
        };
        let audio_outcome = match self.audio_handle {
            Some(handle) => match handle.join() {
                Ok(outcome) => Some(outcome),
                Err(_) => {
                    record_failure(&mut first_error, "audio loop panicked");
                    None
                }
            },
            None => None,
        };

        // Flush the encoders, draining whatever they were still buffering,
        // and mux every drained packet before the container closes.
        let mut frames_encoded = 0;
        let mut frames_dropped = 0;
        if let Some(mut outcome) = video_outcome {
            frames_encoded = outcome.frames_encoded;
            frames_dropped = outcome.frames_dropped;
            flush_into(&mut first_error, "video flush", || {
                let packets = outcome.encoder.flush()?;
                for packet in packets {
                    self.writer.write(packet)?;
                }
                Ok(())
            });
        }
        let mut audio_blocks_encoded = 0;
        let mut audio_blocks_skipped = 0;
        if let Some(mut outcome) = audio_outcome {
            audio_blocks_encoded = outcome.blocks_encoded;
            audio_blocks_skipped = outcome.blocks_skipped;
            flush_into(&mut first_error, "audio flush", || {
                let packets = outcome.encoder.flush()?;
                for packet in packets {
                    self.writer.write(packet)?;
                }
                Ok(())
            });
        }

        // Close the container. From here on no packet can reach the file.
        if let Err(e) = self.writer.finish() {
            record_failure(&mut first_error, &format!("container close: {e}"));
        }

        // Release the audio device last.
        if let Some(input) = self.audio_input {
            input.release();
        }

        let summary = SessionSummary {
            output_path: self.writer.path().to_path_buf(),
            width: self.width,
            height: self.height,
            duration_secs: self.clock.elapsed().as_secs_f64(),
            frames_encoded,
            frames_dropped,
            audio_blocks_encoded,
            audio_blocks_skipped,
            audio_packets_muxed: self.writer.audio_packets_muxed(),
        };

        match first_error {
            Some(error) => Err(error),
            None => {
                tracing::info!(
                    "recording stopped: {:.2}s, {} frames, {} audio blocks, output {}",
                    summary.duration_secs,
                    summary.frames_encoded,
                    summary.audio_blocks_encoded,
                    summary.output_path.display()
                );
                Ok(summary)
            }
        }
    }
}

/// Close and remove a container that never recorded anything, so a failed
/// start leaves no output file behind.
fn discard_container(writer: &ContainerWriter) {
    if writer.is_open() {
        let _ = writer.finish();
    }
    if let Err(e) = std::fs::remove_file(writer.path()) {
        tracing::debug!("could not remove {}: {e}", writer.path().display());
    }
}

fn record_failure(first: &mut Option<RecorderError>, message: &str) {
    tracing::error!("teardown: {message}");
    if first.is_none() {
        *first = Some(RecorderError::Teardown(message.to_string()));
    }
}

fn flush_into(
    first: &mut Option<RecorderError>,
    step: &str,
    flush: impl FnOnce() -> RecorderResult<()>,
) {
    if let Err(e) = flush() {
        record_failure(first, &format!("{step}: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fake::SyntheticFrameSource;
    use tempfile::tempdir;

    #[test]
    fn test_stop_without_session_is_invalid_state() {
        let mut recorder = Recorder::new();
        assert!(matches!(
            recorder.stop(),
            Err(RecorderError::InvalidState(_))
        ));
    }

    #[test]
    fn test_zero_frame_rate_rejected() {
        let dir = tempdir().unwrap();
        let mut config = SessionConfig::new(dir.path().join("out.mp4"));
        config.frame_rate = 0;

        let mut recorder = Recorder::new();
        let result = recorder.start_with_sources(
            config,
            Box::new(SyntheticFrameSource::new(64, 48)),
            None,
        );
        assert!(matches!(result, Err(RecorderError::Config(_))));
        assert!(!recorder.is_running());
    }

    #[test]
    fn test_degenerate_region_rejected() {
        let dir = tempdir().unwrap();
        let config = SessionConfig::new(dir.path().join("out.mp4"));

        let mut recorder = Recorder::new();
        let result = recorder.start_with_sources(
            config,
            Box::new(SyntheticFrameSource::new(1, 1)),
            None,
        );
        assert!(matches!(result, Err(RecorderError::Config(_))));
    }
}
