//! Encoders and packet types
//!
//! Both encoders follow the same contract: `encode` may return zero, one or
//! more packets per call (encoders buffer internally), and a terminal
//! `flush` drains whatever is still held back. Packets transfer ownership
//! to the container writer, which is the only component that touches the
//! output file.

pub mod audio;
pub mod packet;
pub mod video;

pub use audio::AudioEncoder;
pub use packet::{EncodedPacket, StreamKind};
pub use video::VideoEncoder;

/// Encoder lifecycle. `flush` is terminal: once an encoder reaches
/// `Closed`, further `encode` calls are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    /// Created, no input seen yet.
    Idle,
    /// Has accepted input; may be holding frames back.
    Accumulating,
    /// Draining buffered packets with no further input.
    Flushing,
    /// Flushed and done.
    Closed,
}
