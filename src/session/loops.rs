//! Capture loops
//!
//! One loop per stream, each on its own thread. Both poll the shared
//! running flag every iteration; that flag is the only stop signal. A
//! failed grab, read or encode is logged and skipped, never fatal: a
//! transient capture hiccup must not abort the whole recording.

use crate::capture::traits::{AudioSource, FrameSource, RawFrame};
use crate::clock::SessionClock;
use crate::codec::{AudioEncoder, VideoEncoder};
use crate::config::{AUDIO_CHANNELS, AUDIO_CHUNK_SIZE};
use crate::error::{RecorderError, RecorderResult};
use crate::muxer::ContainerWriter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Everything the video thread needs; moved into the thread at start.
pub(crate) struct VideoLoop {
    pub source: Box<dyn FrameSource>,
    pub encoder: VideoEncoder,
    pub writer: Arc<ContainerWriter>,
    pub clock: SessionClock,
    pub running: Arc<AtomicBool>,
    pub frame_rate: u32,
    /// Even-clamped target dimensions; frames are conformed to these.
    pub width: u32,
    pub height: u32,
}

/// What the video thread hands back when it exits. The encoder returns to
/// the controller so it can be flushed after the join.
pub(crate) struct VideoLoopOutcome {
    pub encoder: VideoEncoder,
    pub frames_encoded: u64,
    pub frames_dropped: u64,
}

impl VideoLoop {
    pub fn run(mut self) -> VideoLoopOutcome {
        let interval = Duration::from_secs_f64(1.0 / self.frame_rate as f64);
        let mut frames_encoded = 0u64;
        let mut frames_dropped = 0u64;

        while self.running.load(Ordering::Acquire) {
            let tick_started = Instant::now();

            match self.capture_one() {
                Ok(()) => frames_encoded += 1,
                Err(e) => {
                    frames_dropped += 1;
                    tracing::warn!("video frame skipped: {e}");
                }
            }

            // Pace to the nominal tick. Best-effort only: the PTS assigned
            // above, not this sleep, is the source of truth for timing.
            let elapsed = tick_started.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }

        tracing::debug!(
            "video loop exited: {frames_encoded} frames encoded, {frames_dropped} dropped"
        );
        VideoLoopOutcome {
            encoder: self.encoder,
            frames_encoded,
            frames_dropped,
        }
    }

    fn capture_one(&mut self) -> RecorderResult<()> {
        let frame = self.source.grab()?;
        let frame = conform_frame(frame, self.width, self.height)?;
        let pts = self.clock.video_pts(self.frame_rate);
        for packet in self.encoder.encode(&frame, pts)? {
            self.writer.write(packet)?;
        }
        Ok(())
    }
}

/// Resize a captured frame to the even-clamped target dimensions. Capture
/// APIs occasionally hand back a slightly different size than requested.
pub(crate) fn conform_frame(frame: RawFrame, width: u32, height: u32) -> RecorderResult<RawFrame> {
    if frame.width == width && frame.height == height {
        return Ok(frame);
    }
    let image = image::RgbImage::from_raw(frame.width, frame.height, frame.data)
        .ok_or_else(|| RecorderError::Capture("malformed frame buffer".to_string()))?;
    let resized =
        image::imageops::resize(&image, width, height, image::imageops::FilterType::Triangle);
    Ok(RawFrame {
        width,
        height,
        data: resized.into_raw(),
    })
}

/// Everything the audio thread needs.
pub(crate) struct AudioLoop {
    pub source: Box<dyn AudioSource>,
    pub encoder: AudioEncoder,
    pub writer: Arc<ContainerWriter>,
    pub running: Arc<AtomicBool>,
}

pub(crate) struct AudioLoopOutcome {
    pub encoder: AudioEncoder,
    pub blocks_encoded: u64,
    pub blocks_skipped: u64,
}

/// Pause after a failed read. A healthy source blocks for one block's
/// duration; a dead one fails instantly and must not spin the loop.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(10);

impl AudioLoop {
    pub fn run(mut self) -> AudioLoopOutcome {
        let channels = AUDIO_CHANNELS as usize;
        let mut block_index = 0u64;
        let mut blocks_encoded = 0u64;
        let mut blocks_skipped = 0u64;

        while self.running.load(Ordering::Acquire) {
            let samples = match self.source.read_block() {
                Ok(samples) => samples,
                Err(e) => {
                    blocks_skipped += 1;
                    tracing::warn!("audio block skipped: {e}");
                    thread::sleep(READ_ERROR_BACKOFF);
                    continue;
                }
            };

            if samples.len() % channels != 0 {
                blocks_skipped += 1;
                tracing::warn!("malformed audio block ({} samples), skipped", samples.len());
                continue;
            }

            // PTS comes from the block counter, not wall-clock time: the
            // counter advances only on blocks actually encoded, so the
            // audio stream stays gapless even across skipped blocks.
            let pts = (block_index * AUDIO_CHUNK_SIZE as u64) as i64;
            match self.encoder.encode(&samples, pts) {
                Ok(packets) => {
                    block_index += 1;
                    let mut refused = false;
                    for packet in packets {
                        if let Err(e) = self.writer.write(packet) {
                            tracing::warn!("audio mux failed: {e}");
                            refused = true;
                        }
                    }
                    // A block whose packets the container refused is not in
                    // the recording; the summary counts it as skipped.
                    if refused {
                        blocks_skipped += 1;
                    } else {
                        blocks_encoded += 1;
                    }
                }
                Err(e) => {
                    blocks_skipped += 1;
                    tracing::warn!("audio encode failed, block skipped: {e}");
                }
            }
        }

        tracing::debug!(
            "audio loop exited: {blocks_encoded} blocks encoded, {blocks_skipped} skipped"
        );
        AudioLoopOutcome {
            encoder: self.encoder,
            blocks_encoded,
            blocks_skipped,
        }
    }
}
