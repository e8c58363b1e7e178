//! Microphone capture
//!
//! The cpal input stream delivers samples on its own callback thread. The
//! stream handle is not `Send`, so it stays with the session object on the
//! controller thread ([`MicrophoneInput`]); only the receiving end of a
//! bounded channel ([`MicrophoneReader`]) moves into the audio loop.

use crate::capture::traits::AudioSource;
use crate::config::{AUDIO_CHANNELS, AUDIO_CHUNK_SIZE, AUDIO_SAMPLE_RATE};
use crate::error::{RecorderError, RecorderResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on one block read. A 1024-frame block at 44100 Hz lasts
/// ~23ms; the timeout keeps a stuck device from stalling shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(250);

/// Holds the live cpal stream. Dropping it releases the device; the
/// controller keeps it until the container is closed so teardown order
/// matches the rest of the pipeline.
pub struct MicrophoneInput {
    stream: cpal::Stream,
}

impl MicrophoneInput {
    /// Open the default input device at 44100 Hz stereo and start capturing.
    ///
    /// Returns the device guard plus the `Send` half that the audio loop
    /// reads blocks from.
    pub fn open() -> RecorderResult<(MicrophoneInput, MicrophoneReader)> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            RecorderError::DeviceUnavailable("no default audio input device".to_string())
        })?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let config = cpal::StreamConfig {
            channels: AUDIO_CHANNELS,
            sample_rate: cpal::SampleRate(AUDIO_SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = bounded::<Vec<i16>>(64);
        let overflows = Arc::new(AtomicU64::new(0));
        let callback_overflows = overflows.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    // A full channel means the reader is not keeping up;
                    // drop the buffer and count it as an overflow.
                    if tx.try_send(samples).is_err() {
                        callback_overflows.fetch_add(1, Ordering::Relaxed);
                    }
                },
                |err| tracing::error!("audio input stream error: {err}"),
                None,
            )
            .map_err(|e| {
                RecorderError::DeviceUnavailable(format!("cannot open audio input: {e}"))
            })?;

        stream.play().map_err(|e| {
            RecorderError::DeviceUnavailable(format!("cannot start audio input: {e}"))
        })?;

        tracing::info!(
            "audio input opened: {device_name} ({AUDIO_SAMPLE_RATE} Hz, {AUDIO_CHANNELS} ch)"
        );

        Ok((
            MicrophoneInput { stream },
            MicrophoneReader {
                rx,
                pending: Vec::new(),
                overflows,
                overflows_seen: 0,
            },
        ))
    }

    /// Stop the stream and release the device.
    pub fn release(self) {
        if let Err(e) = self.stream.pause() {
            tracing::debug!("pausing audio stream on release: {e}");
        }
        tracing::info!("audio input released");
    }
}

/// The `Send` reading half: assembles callback buffers into fixed-size
/// blocks for the audio loop.
pub struct MicrophoneReader {
    rx: Receiver<Vec<i16>>,
    pending: Vec<i16>,
    overflows: Arc<AtomicU64>,
    overflows_seen: u64,
}

impl AudioSource for MicrophoneReader {
    fn read_block(&mut self) -> RecorderResult<Vec<i16>> {
        let total = self.overflows.load(Ordering::Relaxed);
        if total > self.overflows_seen {
            self.overflows_seen = total;
            return Err(RecorderError::Capture(
                "audio input overflow, block skipped".to_string(),
            ));
        }

        let want = AUDIO_CHUNK_SIZE * AUDIO_CHANNELS as usize;
        while self.pending.len() < want {
            match self.rx.recv_timeout(READ_TIMEOUT) {
                Ok(buffer) => self.pending.extend_from_slice(&buffer),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(RecorderError::Capture("audio read timed out".to_string()))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(RecorderError::Capture(
                        "audio input stream closed".to_string(),
                    ))
                }
            }
        }

        let rest = self.pending.split_off(want);
        Ok(std::mem::replace(&mut self.pending, rest))
    }
}
