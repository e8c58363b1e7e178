//! AAC audio encoding
//!
//! Wraps fdk-aac (AAC-LC, ADTS-framed as the container requires). The C
//! encoder consumes one
//! AAC frame of input per call and may withhold output while priming, so
//! the PTS of every consumed block is queued and popped as packets emerge;
//! that keeps packet timestamps tied to the samples they cover.

use crate::codec::packet::{EncodedPacket, StreamKind};
use crate::codec::EncoderState;
use crate::error::{RecorderError, RecorderResult};
use fdk_aac::enc::{BitRate, ChannelMode, Encoder, EncoderParams, Transport};
use std::collections::VecDeque;

/// Samples per channel in one AAC-LC frame. Fixed by the codec.
pub const AAC_FRAME_SAMPLES: usize = 1024;

/// Worst-case AAC-LC frame is 768 bytes per channel; this covers stereo
/// plus the ADTS header.
const MAX_PACKET_BYTES: usize = 2048;

pub struct AudioEncoder {
    inner: Encoder,
    channels: usize,
    /// Samples handed to us but not yet consumed by the C encoder.
    pending: Vec<i16>,
    /// PTS of each consumed input frame that has not produced output yet.
    queued_pts: VecDeque<i64>,
    /// PTS of the first sample in `pending`.
    next_pts: i64,
    state: EncoderState,
}

impl AudioEncoder {
    pub fn new(sample_rate: u32, channels: u16) -> RecorderResult<Self> {
        let mode = match channels {
            1 => ChannelMode::Mono,
            2 => ChannelMode::Stereo,
            n => {
                return Err(RecorderError::Encoding(format!(
                    "unsupported channel count: {n}"
                )))
            }
        };
        let inner = Encoder::new(EncoderParams {
            bit_rate: BitRate::VbrMedium,
            sample_rate,
            transport: Transport::Adts,
            channels: mode,
        })
        .map_err(|e| RecorderError::Encoding(format!("cannot create AAC encoder: {e:?}")))?;

        Ok(Self {
            inner,
            channels: channels as usize,
            pending: Vec::new(),
            queued_pts: VecDeque::new(),
            next_pts: 0,
            state: EncoderState::Idle,
        })
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    /// Encode one block of interleaved samples tagged with the PTS of its
    /// first sample. Returns zero or more packets.
    pub fn encode(&mut self, samples: &[i16], pts: i64) -> RecorderResult<Vec<EncodedPacket>> {
        if matches!(self.state, EncoderState::Flushing | EncoderState::Closed) {
            return Err(RecorderError::InvalidState("audio encoder is closed"));
        }
        if samples.len() % self.channels != 0 {
            return Err(RecorderError::Encoding(format!(
                "block of {} samples is not divisible by {} channels",
                samples.len(),
                self.channels
            )));
        }
        self.state = EncoderState::Accumulating;

        if self.pending.is_empty() {
            self.next_pts = pts;
        }
        self.pending.extend_from_slice(samples);
        self.drain_full_frames()
    }

    /// Consume as many full AAC frames from `pending` as the codec will
    /// take, collecting whatever packets it emits.
    fn drain_full_frames(&mut self) -> RecorderResult<Vec<EncodedPacket>> {
        let frame_len = AAC_FRAME_SAMPLES * self.channels;
        let mut packets = Vec::new();

        while self.pending.len() >= frame_len {
            let mut output = vec![0u8; MAX_PACKET_BYTES];
            let info = self
                .inner
                .encode(&self.pending[..frame_len], &mut output)
                .map_err(|e| RecorderError::Encoding(format!("AAC encode failed: {e:?}")))?;
            if info.input_consumed == 0 {
                break;
            }

            self.pending.drain(..info.input_consumed);
            self.queued_pts.push_back(self.next_pts);
            self.next_pts += (info.input_consumed / self.channels) as i64;

            if info.output_size > 0 {
                output.truncate(info.output_size);
                let pts = self.queued_pts.pop_front().unwrap_or(self.next_pts);
                packets.push(EncodedPacket {
                    stream: StreamKind::Audio,
                    pts,
                    keyframe: true,
                    data: output,
                });
            }
        }

        Ok(packets)
    }

    /// Terminal flush: pad the tail to a full frame, then push silence
    /// through the codec until every consumed frame has produced a packet.
    pub fn flush(&mut self) -> RecorderResult<Vec<EncodedPacket>> {
        if self.state == EncoderState::Closed {
            return Ok(Vec::new());
        }
        self.state = EncoderState::Flushing;

        let frame_len = AAC_FRAME_SAMPLES * self.channels;
        let mut packets = Vec::new();

        if !self.pending.is_empty() {
            self.pending.resize(frame_len, 0);
            packets.extend(self.drain_full_frames()?);
        }

        // The codec withholds roughly one frame while priming; feed silence
        // until the queued frames have all been emitted. Bounded in case the
        // codec misbehaves.
        let mut guard = 0;
        while !self.queued_pts.is_empty() && guard < 8 {
            guard += 1;
            let silence = vec![0i16; frame_len];
            let mut output = vec![0u8; MAX_PACKET_BYTES];
            let info = self
                .inner
                .encode(&silence, &mut output)
                .map_err(|e| RecorderError::Encoding(format!("AAC flush failed: {e:?}")))?;
            if info.output_size > 0 {
                output.truncate(info.output_size);
                if let Some(pts) = self.queued_pts.pop_front() {
                    packets.push(EncodedPacket {
                        stream: StreamKind::Audio,
                        pts,
                        keyframe: true,
                        data: output,
                    });
                }
            } else if info.input_consumed == 0 {
                break;
            }
        }

        self.pending.clear();
        self.queued_pts.clear();
        self.state = EncoderState::Closed;
        Ok(packets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AUDIO_CHANNELS, AUDIO_CHUNK_SIZE, AUDIO_SAMPLE_RATE};

    fn encoder() -> AudioEncoder {
        AudioEncoder::new(AUDIO_SAMPLE_RATE, AUDIO_CHANNELS).unwrap()
    }

    fn block() -> Vec<i16> {
        vec![0i16; AUDIO_CHUNK_SIZE * AUDIO_CHANNELS as usize]
    }

    #[test]
    fn test_unsupported_channel_count_rejected() {
        assert!(AudioEncoder::new(AUDIO_SAMPLE_RATE, 6).is_err());
    }

    #[test]
    fn test_misaligned_block_rejected() {
        let mut enc = encoder();
        let samples = vec![0i16; 1023];
        assert!(enc.encode(&samples, 0).is_err());
    }

    #[test]
    fn test_pts_stride_is_exactly_one_chunk() {
        let mut enc = encoder();
        let mut packets = Vec::new();
        for index in 0..6u64 {
            let pts = (index * AUDIO_CHUNK_SIZE as u64) as i64;
            packets.extend(enc.encode(&block(), pts).unwrap());
        }
        packets.extend(enc.flush().unwrap());

        assert!(packets.len() >= 4, "got {} packets", packets.len());
        for pair in packets.windows(2) {
            assert_eq!(pair[1].pts - pair[0].pts, AUDIO_CHUNK_SIZE as i64);
        }
        assert_eq!(packets[0].pts, 0);
    }

    #[test]
    fn test_packets_are_adts_framed() {
        let mut enc = encoder();
        let mut packets = Vec::new();
        for index in 0..4u64 {
            let pts = (index * AUDIO_CHUNK_SIZE as u64) as i64;
            packets.extend(enc.encode(&block(), pts).unwrap());
        }
        assert!(!packets.is_empty());
        for packet in &packets {
            // ADTS syncword: twelve set bits at the start of every frame.
            assert!(packet.data.len() > 7);
            assert_eq!(packet.data[0], 0xFF);
            assert_eq!(packet.data[1] & 0xF0, 0xF0);
        }
    }

    #[test]
    fn test_flush_closes_encoder() {
        let mut enc = encoder();
        enc.encode(&block(), 0).unwrap();
        enc.flush().unwrap();
        assert_eq!(enc.state(), EncoderState::Closed);
        assert!(matches!(
            enc.encode(&block(), 0),
            Err(RecorderError::InvalidState(_))
        ));
    }

    #[test]
    fn test_flush_drains_partial_tail() {
        let mut enc = encoder();
        enc.encode(&block(), 0).unwrap();
        // Half a block left pending, padded out on flush.
        let half = vec![0i16; AUDIO_CHUNK_SIZE * AUDIO_CHANNELS as usize / 2];
        enc.encode(&half, AUDIO_CHUNK_SIZE as i64).unwrap();
        let flushed = enc.flush().unwrap();
        assert!(!flushed.is_empty());
    }
}
