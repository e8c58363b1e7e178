//! Capture sources
//!
//! Screen and microphone backends behind the [`FrameSource`] and
//! [`AudioSource`] traits, plus synthetic sources for tests.

pub mod audio;
pub mod fake;
pub mod screen;
pub mod traits;

pub use audio::{MicrophoneInput, MicrophoneReader};
pub use screen::ScreenSource;
pub use traits::{AudioSource, FrameSource, RawFrame};
