//! Capture trait definitions
//!
//! Seams between the pipeline and the screen/audio devices. The production
//! backends live in [`super::screen`] and [`super::audio`]; synthetic ones
//! for tests and headless development live in [`super::fake`].

use crate::error::RecorderResult;

/// One captured frame: interleaved RGB24, row-major, no padding.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RawFrame {
    /// Whether `data` holds exactly width x height x 3 bytes.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 3
    }
}

/// Repeatedly captures a rectangular region of the display.
///
/// A failed `grab` is transient: the video loop logs it and retries on the
/// next tick, so implementations should return an error rather than panic.
pub trait FrameSource: Send {
    /// Dimensions the source delivers, before even-clamping. Capture APIs
    /// occasionally return a slightly different size than requested; callers
    /// must resize when that happens.
    fn dimensions(&self) -> (u32, u32);

    /// Grab one frame.
    fn grab(&mut self) -> RecorderResult<RawFrame>;
}

/// Repeatedly reads fixed-size blocks of PCM audio from an input device.
pub trait AudioSource: Send {
    /// Read one block of interleaved i16 samples
    /// (`AUDIO_CHUNK_SIZE * AUDIO_CHANNELS` values).
    ///
    /// Blocks for roughly one block's duration; implementations must bound
    /// the wait so a stuck device cannot stall shutdown. A device overflow
    /// surfaces as a transient error and the block is skipped.
    fn read_block(&mut self) -> RecorderResult<Vec<i16>>;
}
