//! Encoded packet types

use std::fmt;

/// Which stream a packet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
        }
    }
}

/// One compressed payload, ready to be muxed.
///
/// `pts` is in the owning stream's time base: ticks of `1/frame_rate`
/// seconds for video, `1/sample_rate` seconds for audio.
#[derive(Debug, Clone)]
pub struct EncodedPacket {
    pub stream: StreamKind,
    pub pts: i64,
    pub keyframe: bool,
    pub data: Vec<u8>,
}
