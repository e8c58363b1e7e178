//! Synthetic capture sources
//!
//! Deterministic stand-ins for the screen and microphone, used by the
//! integration tests and handy for development on machines without a
//! display or input device. Failures can be injected per iteration to
//! exercise the loops' skip-and-continue policy.

use crate::capture::traits::{AudioSource, FrameSource, RawFrame};
use crate::config::{AUDIO_CHANNELS, AUDIO_CHUNK_SIZE, AUDIO_SAMPLE_RATE};
use crate::error::{RecorderError, RecorderResult};
use std::thread;
use std::time::Duration;

/// Frame source producing a moving gradient so consecutive frames differ.
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    frame_index: u64,
    fail_on: Option<u64>,
}

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_index: 0,
            fail_on: None,
        }
    }

    /// Make the grab with the given index fail once.
    pub fn failing_on(mut self, index: u64) -> Self {
        self.fail_on = Some(index);
        self
    }
}

impl FrameSource for SyntheticFrameSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab(&mut self) -> RecorderResult<RawFrame> {
        let index = self.frame_index;
        self.frame_index += 1;

        if self.fail_on == Some(index) {
            return Err(RecorderError::Capture("injected grab failure".to_string()));
        }

        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push((x as u64 + index) as u8);
                data.push(y as u8);
                data.push(((x ^ y) as u64 + index) as u8);
            }
        }
        Ok(RawFrame {
            data,
            width: self.width,
            height: self.height,
        })
    }
}

/// Audio source yielding silent blocks at the device's real pace, so a
/// session of N seconds produces roughly N seconds of audio.
pub struct SyntheticAudioSource {
    blocks_read: u64,
    overflow_on: Option<u64>,
}

impl SyntheticAudioSource {
    pub fn new() -> Self {
        Self {
            blocks_read: 0,
            overflow_on: None,
        }
    }

    /// Report an overflow instead of the block with the given index.
    pub fn overflowing_on(mut self, index: u64) -> Self {
        self.overflow_on = Some(index);
        self
    }
}

impl Default for SyntheticAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for SyntheticAudioSource {
    fn read_block(&mut self) -> RecorderResult<Vec<i16>> {
        let index = self.blocks_read;
        self.blocks_read += 1;

        // Pace like a real device: one block takes chunk/rate seconds.
        let block_secs = AUDIO_CHUNK_SIZE as f64 / AUDIO_SAMPLE_RATE as f64;
        thread::sleep(Duration::from_secs_f64(block_secs));

        if self.overflow_on == Some(index) {
            return Err(RecorderError::Capture(
                "injected input overflow".to_string(),
            ));
        }

        Ok(vec![0i16; AUDIO_CHUNK_SIZE * AUDIO_CHANNELS as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_source_produces_well_formed_frames() {
        let mut source = SyntheticFrameSource::new(32, 24);
        let frame = source.grab().unwrap();
        assert!(frame.is_well_formed());
        assert_eq!((frame.width, frame.height), (32, 24));
    }

    #[test]
    fn test_consecutive_frames_differ() {
        let mut source = SyntheticFrameSource::new(16, 16);
        let first = source.grab().unwrap();
        let second = source.grab().unwrap();
        assert_ne!(first.data, second.data);
    }

    #[test]
    fn test_injected_grab_failure_fires_once() {
        let mut source = SyntheticFrameSource::new(16, 16).failing_on(1);
        assert!(source.grab().is_ok());
        assert!(source.grab().is_err());
        assert!(source.grab().is_ok());
    }

    #[test]
    fn test_audio_blocks_have_fixed_size() {
        let mut source = SyntheticAudioSource::new();
        let block = source.read_block().unwrap();
        assert_eq!(block.len(), AUDIO_CHUNK_SIZE * AUDIO_CHANNELS as usize);
    }

    #[test]
    fn test_injected_overflow_skips_one_block() {
        let mut source = SyntheticAudioSource::new().overflowing_on(0);
        assert!(source.read_block().is_err());
        assert!(source.read_block().is_ok());
    }
}
