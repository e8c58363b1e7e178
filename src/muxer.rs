//! Container writer
//!
//! The single shared sink for both encoded streams. Serializes interleaved
//! packet writes from the two capture loops into one MP4 file: a mutex
//! guards every write call, held only for the duration of that call.
//!
//! The container refuses audio that precedes the first video sample, and
//! the audio loop usually races ahead of the first grab. Audio packets
//! arriving before any video are therefore held back and released, clamped
//! to the first video timestamp, once the first video packet lands.

use crate::codec::packet::{EncodedPacket, StreamKind};
use crate::error::{RecorderError, RecorderResult};
use muxide::api::{AacProfile, AudioCodec, Muxer, MuxerBuilder, VideoCodec};
use parking_lot::Mutex;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Video stream descriptor for the container.
#[derive(Debug, Clone, Copy)]
pub struct VideoStreamParams {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// Audio stream descriptor for the container.
#[derive(Debug, Clone, Copy)]
pub struct AudioStreamParams {
    pub sample_rate: u32,
    pub channels: u16,
}

struct Inner {
    muxer: Option<Muxer<File>>,
    /// Timestamp of the first video packet written, in seconds.
    first_video_pts: Option<f64>,
    /// Audio packets held back until the first video packet lands.
    pending_audio: Vec<(f64, Vec<u8>)>,
    /// Audio packets the container has accepted.
    audio_packets: u64,
}

pub struct ContainerWriter {
    inner: Mutex<Inner>,
    /// Seconds per video tick (1 / frame rate).
    video_time_base: f64,
    /// Seconds per audio tick (1 / sample rate).
    audio_time_base: f64,
    path: PathBuf,
}

impl ContainerWriter {
    /// Create the output file and write the container header with one video
    /// track and, optionally, one audio track.
    pub fn create(
        path: &Path,
        video: VideoStreamParams,
        audio: Option<AudioStreamParams>,
    ) -> RecorderResult<Self> {
        let file = File::create(path)
            .map_err(|e| RecorderError::ContainerOpen(format!("{}: {e}", path.display())))?;

        let mut builder = MuxerBuilder::new(file).video(
            VideoCodec::H264,
            video.width,
            video.height,
            video.frame_rate as f64,
        );
        if let Some(a) = &audio {
            builder = builder.audio(AudioCodec::Aac(AacProfile::Lc), a.sample_rate, a.channels);
        }
        let muxer = builder.build().map_err(|e| {
            RecorderError::ContainerOpen(format!("cannot initialize container: {e}"))
        })?;

        tracing::info!(
            "container opened: {} ({}x{} @ {} fps{})",
            path.display(),
            video.width,
            video.height,
            video.frame_rate,
            if audio.is_some() { ", with audio" } else { "" }
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                muxer: Some(muxer),
                first_video_pts: None,
                pending_audio: Vec::new(),
                audio_packets: 0,
            }),
            video_time_base: 1.0 / video.frame_rate as f64,
            audio_time_base: 1.0 / audio.map_or(44_100, |a| a.sample_rate) as f64,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().muxer.is_some()
    }

    /// Audio packets the container has accepted so far. Held-back packets
    /// do not count until they are released.
    pub fn audio_packets_muxed(&self) -> u64 {
        self.inner.lock().audio_packets
    }

    /// Mux one packet. The lock is held only for this single write, which
    /// is what keeps concurrent video/audio writes from interleaving
    /// mid-packet.
    pub fn write(&self, packet: EncodedPacket) -> RecorderResult<()> {
        let inner = &mut *self.inner.lock();
        let muxer = inner
            .muxer
            .as_mut()
            .ok_or(RecorderError::InvalidState("container already closed"))?;

        match packet.stream {
            StreamKind::Video => {
                let pts = packet.pts as f64 * self.video_time_base;
                muxer
                    .write_video(pts, &packet.data, packet.keyframe)
                    .map_err(|e| RecorderError::Encoding(format!("mux video failed: {e}")))?;
                if inner.first_video_pts.is_none() {
                    inner.first_video_pts = Some(pts);
                    for (audio_pts, data) in std::mem::take(&mut inner.pending_audio) {
                        muxer
                            .write_audio(audio_pts.max(pts), &data)
                            .map_err(|e| {
                                RecorderError::Encoding(format!("mux audio failed: {e}"))
                            })?;
                        inner.audio_packets += 1;
                    }
                }
            }
            StreamKind::Audio => {
                let pts = packet.pts as f64 * self.audio_time_base;
                match inner.first_video_pts {
                    None => inner.pending_audio.push((pts, packet.data)),
                    Some(first) => {
                        muxer
                            .write_audio(pts.max(first), &packet.data)
                            .map_err(|e| {
                                RecorderError::Encoding(format!("mux audio failed: {e}"))
                            })?;
                        inner.audio_packets += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Finalize and close the container. After this, every `write` fails
    /// with `InvalidState`; nothing can reach the file anymore.
    pub fn finish(&self) -> RecorderResult<()> {
        let inner = &mut *self.inner.lock();
        match inner.muxer.take() {
            Some(muxer) => {
                if !inner.pending_audio.is_empty() {
                    tracing::warn!(
                        "dropping {} audio packets held for a video stream that never started",
                        inner.pending_audio.len()
                    );
                    inner.pending_audio.clear();
                }
                muxer.finish_with_stats().map_err(|e| {
                    RecorderError::Teardown(format!("cannot finalize container: {e}"))
                })?;
                tracing::info!("container closed: {}", self.path.display());
                Ok(())
            }
            None => Err(RecorderError::InvalidState("container already closed")),
        }
    }
}
