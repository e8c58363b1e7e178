//! H.264 video encoding
//!
//! Wraps openh264. Input frames are interleaved RGB24 at the even-clamped
//! session dimensions; output packets are Annex-B H.264.

use crate::capture::traits::RawFrame;
use crate::codec::packet::{EncodedPacket, StreamKind};
use crate::codec::EncoderState;
use crate::error::{RecorderError, RecorderResult};
use openh264::encoder::{Encoder, EncoderConfig, FrameType};
use openh264::formats::{RgbSliceU8, YUVBuffer};
use openh264::OpenH264API;

pub struct VideoEncoder {
    inner: Encoder,
    width: u32,
    height: u32,
    state: EncoderState,
}

impl VideoEncoder {
    /// Create an encoder for the given even dimensions.
    pub fn new(width: u32, height: u32, frame_rate: u32) -> RecorderResult<Self> {
        if width % 2 != 0 || height % 2 != 0 {
            return Err(RecorderError::Encoding(format!(
                "H.264 requires even dimensions, got {width}x{height}"
            )));
        }
        if frame_rate == 0 {
            return Err(RecorderError::Config(
                "frame rate must be positive".to_string(),
            ));
        }

        let inner = Encoder::with_api_config(OpenH264API::from_source(), EncoderConfig::new())
            .map_err(|e| RecorderError::Encoding(format!("cannot create H.264 encoder: {e}")))?;

        Ok(Self {
            inner,
            width,
            height,
            state: EncoderState::Idle,
        })
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    /// Encode one frame. Returns zero or more packets; the encoder may hold
    /// a frame back (e.g. a skipped frame under rate control).
    pub fn encode(&mut self, frame: &RawFrame, pts: i64) -> RecorderResult<Vec<EncodedPacket>> {
        if matches!(self.state, EncoderState::Flushing | EncoderState::Closed) {
            return Err(RecorderError::InvalidState("video encoder is closed"));
        }
        if frame.width != self.width || frame.height != self.height {
            return Err(RecorderError::Encoding(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        if !frame.is_well_formed() {
            return Err(RecorderError::Encoding(
                "frame buffer length does not match its dimensions".to_string(),
            ));
        }
        self.state = EncoderState::Accumulating;

        let rgb = RgbSliceU8::new(&frame.data, (self.width as usize, self.height as usize));
        let yuv = YUVBuffer::from_rgb_source(rgb);
        let bitstream = self
            .inner
            .encode(&yuv)
            .map_err(|e| RecorderError::Encoding(format!("H.264 encode failed: {e}")))?;

        let keyframe = matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I);
        let data = bitstream.to_vec();
        if data.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![EncodedPacket {
            stream: StreamKind::Video,
            pts,
            keyframe,
            data,
        }])
    }

    /// Terminal flush. openh264 runs with zero lookahead, so nothing is
    /// buffered across calls; this only closes the state machine.
    pub fn flush(&mut self) -> RecorderResult<Vec<EncodedPacket>> {
        if self.state == EncoderState::Closed {
            return Ok(Vec::new());
        }
        self.state = EncoderState::Flushing;
        self.state = EncoderState::Closed;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fake::SyntheticFrameSource;
    use crate::capture::traits::FrameSource;

    fn encoder() -> VideoEncoder {
        VideoEncoder::new(64, 48, 30).unwrap()
    }

    #[test]
    fn test_odd_dimensions_rejected() {
        assert!(VideoEncoder::new(641, 480, 30).is_err());
        assert!(VideoEncoder::new(640, 481, 30).is_err());
    }

    #[test]
    fn test_zero_frame_rate_rejected() {
        assert!(VideoEncoder::new(640, 480, 0).is_err());
    }

    #[test]
    fn test_first_frame_is_keyframe() {
        let mut enc = encoder();
        let frame = SyntheticFrameSource::new(64, 48).grab().unwrap();
        let packets = enc.encode(&frame, 0).unwrap();
        assert_eq!(packets.len(), 1);
        assert!(packets[0].keyframe);
        assert_eq!(packets[0].stream, StreamKind::Video);
        assert!(!packets[0].data.is_empty());
    }

    #[test]
    fn test_packet_carries_given_pts() {
        let mut enc = encoder();
        let mut source = SyntheticFrameSource::new(64, 48);
        enc.encode(&source.grab().unwrap(), 0).unwrap();
        let packets = enc.encode(&source.grab().unwrap(), 7).unwrap();
        assert!(packets.iter().all(|p| p.pts == 7));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut enc = encoder();
        let frame = SyntheticFrameSource::new(32, 32).grab().unwrap();
        assert!(enc.encode(&frame, 0).is_err());
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut enc = encoder();
        assert_eq!(enc.state(), EncoderState::Idle);

        let frame = SyntheticFrameSource::new(64, 48).grab().unwrap();
        enc.encode(&frame, 0).unwrap();
        assert_eq!(enc.state(), EncoderState::Accumulating);

        enc.flush().unwrap();
        assert_eq!(enc.state(), EncoderState::Closed);

        assert!(matches!(
            enc.encode(&frame, 1),
            Err(RecorderError::InvalidState(_))
        ));
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut enc = encoder();
        enc.flush().unwrap();
        assert!(enc.flush().unwrap().is_empty());
    }
}
