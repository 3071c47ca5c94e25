//! Frame decoder using symphonia
//!
//! Decodes one MPEG audio frame per call from the compressed-stream window.
//! Framing (sync search, tag skipping, frame length) happens here; the
//! Layer III bitstream itself is decoded by symphonia's MPEG audio decoder,
//! fed one frame per packet. Decoder state (bit reservoir, overlap) carries
//! over between calls and is cleared by `reset()` at the start of a track.

use crate::audio::mpa_header::{self, FrameHeader, HEADER_LEN, ID3V2_HEADER_LEN};
use crate::audio::types::{DecodedFrame, FrameInfo};
use crate::error::{Error, Result};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_MP3};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;
use symphonia::default::codecs::MpaDecoder;
use tracing::{debug, trace, warn};

/// Stateful decoder session: compressed bytes in, one PCM frame out.
///
/// Contract for `decode`:
/// - `FrameInfo::frame_bytes` is how far the caller must advance its
///   window, whether or not audio was produced
/// - `frame_bytes == 0` is terminal for the current track
/// - `frame.sample_count == 0` with `frame_bytes > 0` is a non-audio frame
pub trait FrameDecoder {
    /// Drop all decoder state; called at the start of every track
    fn reset(&mut self);

    /// Decode at most one frame from `input` into `frame`
    fn decode(&mut self, input: &[u8], frame: &mut DecodedFrame) -> FrameInfo;
}

/// MPEG-1/2/2.5 Layer III frame decoder
pub struct Mp3FrameDecoder {
    decoder: MpaDecoder,
    /// (sample rate, channels) the symphonia decoder has produced so far
    stream_format: Option<(u32, u16)>,
    /// Conversion buffer with the spec and frame capacity it was built for
    sample_buf: Option<(SampleBuffer<i16>, SignalSpec, usize)>,
    /// Bytes of an ID3v2 tag still to be skipped (tag larger than the window)
    pending_skip: usize,
    /// Running timestamp in samples, only used to label packets
    next_ts: u64,
}

impl Mp3FrameDecoder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            decoder: Self::create_decoder()?,
            stream_format: None,
            sample_buf: None,
            pending_skip: 0,
            next_ts: 0,
        })
    }

    fn create_decoder() -> Result<MpaDecoder> {
        let mut params = CodecParameters::new();
        params.for_codec(CODEC_TYPE_MP3);

        MpaDecoder::try_new(&params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create MP3 decoder: {}", e)))
    }

    /// Start a fresh symphonia session; its output format is fixed by the
    /// first frame it decodes
    fn restart_decoder(&mut self) {
        match Self::create_decoder() {
            Ok(decoder) => self.decoder = decoder,
            Err(e) => {
                warn!("{}, resetting existing decoder instead", e);
                self.decoder.reset();
            }
        }
        self.stream_format = None;
    }

    /// Locate the first frame header in `input`.
    ///
    /// A header at offset 0 is trusted: the window is aligned after the
    /// previous frame or tag. A header found after junk must be followed by
    /// a compatible header (or a tag) when that position is inside the
    /// window; near the end of the window it is accepted unconfirmed.
    fn find_frame(input: &[u8]) -> Option<(usize, FrameHeader)> {
        if input.len() < HEADER_LEN {
            return None;
        }

        for offset in 0..=input.len() - HEADER_LEN {
            if input[offset] != 0xFF {
                continue;
            }
            let Some(header) = FrameHeader::parse(&input[offset..]) else {
                continue;
            };
            if offset == 0 {
                return Some((offset, header));
            }

            let next = offset + header.frame_len();
            if next + HEADER_LEN <= input.len() {
                let following = &input[next..];
                let confirmed = match FrameHeader::parse(following) {
                    Some(other) => header.is_compatible(&other),
                    None => following.starts_with(b"TAG") || following.starts_with(b"ID3"),
                };
                if !confirmed {
                    continue;
                }
            }

            return Some((offset, header));
        }

        None
    }

    /// Decode one complete frame and copy interleaved i16 PCM into `frame`
    fn decode_packet(&mut self, data: &[u8], frame: &mut DecodedFrame) -> Result<()> {
        let packet = Packet::new_from_slice(0, self.next_ts, 0, data);

        let decoded = self.decoder.decode(&packet).map_err(|e| match e {
            SymphoniaError::DecodeError(msg) => Error::Decode(msg.to_string()),
            other => Error::Decode(other.to_string()),
        })?;

        let spec = *decoded.spec();
        let frames = decoded.frames();
        let capacity = decoded.capacity();
        let channels = spec.channels.count();

        let reuse = matches!(
            &self.sample_buf,
            Some((_, built_for, built_capacity)) if *built_for == spec && *built_capacity >= capacity
        );
        if !reuse {
            trace!(rate = spec.rate, channels, capacity, "Allocating sample conversion buffer");
            self.sample_buf = Some((SampleBuffer::<i16>::new(capacity as u64, spec), spec, capacity));
        }

        let Some((sample_buf, _, _)) = self.sample_buf.as_mut() else {
            return Err(Error::InvalidState("sample buffer missing".to_string()));
        };
        sample_buf.copy_interleaved_ref(decoded);

        let samples = sample_buf.samples();
        let pcm = frame.pcm_mut();
        if samples.len() > pcm.len() || channels == 0 || channels > 2 {
            return Err(Error::Decode(format!(
                "unexpected frame layout: {} samples, {} channels",
                samples.len(),
                channels
            )));
        }
        pcm[..samples.len()].copy_from_slice(samples);

        frame.sample_count = frames;
        frame.channels = channels as u16;
        frame.sample_rate = spec.rate;
        self.next_ts += frames as u64;

        Ok(())
    }
}

impl FrameDecoder for Mp3FrameDecoder {
    fn reset(&mut self) {
        self.restart_decoder();
        self.pending_skip = 0;
        self.next_ts = 0;
    }

    fn decode(&mut self, input: &[u8], frame: &mut DecodedFrame) -> FrameInfo {
        frame.clear();

        if input.is_empty() {
            return FrameInfo::end_of_stream();
        }

        // Remainder of a tag that did not fit in the previous window
        if self.pending_skip > 0 {
            let n = self.pending_skip.min(input.len());
            self.pending_skip -= n;
            trace!(skipped = n, remaining = self.pending_skip, "Skipping tag data");
            return FrameInfo::skipped(n);
        }

        if input.len() >= ID3V2_HEADER_LEN {
            if let Some(tag_len) = mpa_header::id3v2_tag_len(input) {
                let n = tag_len.min(input.len());
                self.pending_skip = tag_len - n;
                debug!(tag_len, "Skipping ID3v2 tag");
                return FrameInfo::skipped(n);
            }
        }

        let Some((offset, header)) = Self::find_frame(input) else {
            // Keep the last bytes: they may be the start of a header
            let junk = input.len().saturating_sub(HEADER_LEN - 1);
            if junk > 0 {
                trace!(junk, "No frame sync in window");
            }
            return FrameInfo::skipped(junk);
        };

        let frame_len = header.frame_len();
        if offset + frame_len > input.len() {
            // Frame straddles the window end; drop only the junk before it
            return FrameInfo::skipped(offset);
        }

        let consumed = offset + frame_len;
        if offset > 0 {
            trace!(offset, "Resynchronised after junk bytes");
        }

        let format = (header.sample_rate, header.channels);
        if self.stream_format.is_some_and(|f| f != format) {
            debug!(
                sample_rate = header.sample_rate,
                channels = header.channels,
                "Stream format changed mid-track"
            );
            self.restart_decoder();
        }
        self.stream_format = Some(format);

        match self.decode_packet(&input[offset..consumed], frame) {
            Ok(()) => FrameInfo {
                channels: frame.channels,
                sample_rate: frame.sample_rate,
                frame_bytes: consumed,
            },
            Err(e) => {
                // Expected for the first frames after a reset (empty bit
                // reservoir); anything else is still only one lost frame
                debug!("Frame dropped: {}", e);
                frame.clear();
                FrameInfo::skipped(consumed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, joint stereo, no CRC
    const HEADER_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
    const FRAME_LEN_128K: usize = 417;

    /// Frames with a valid header and all-zero side info / main data:
    /// decodes to digital silence.
    fn silent_frames(count: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(count * FRAME_LEN_128K);
        for _ in 0..count {
            let start = data.len();
            data.extend_from_slice(&HEADER_128K);
            data.resize(start + FRAME_LEN_128K, 0);
        }
        data
    }

    #[test]
    fn test_empty_input_is_terminal() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();

        let info = decoder.decode(&[], &mut frame);

        assert!(info.is_terminal());
        assert_eq!(frame.sample_count, 0);
    }

    #[test]
    fn test_decodes_silent_frame() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();
        let data = silent_frames(3);

        let info = decoder.decode(&data, &mut frame);

        assert_eq!(info.frame_bytes, FRAME_LEN_128K);
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 2);
        assert_eq!(frame.sample_count, 1152);
        assert!(frame.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_id3_tag_is_non_audio_frame() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();

        // 20-byte tag body
        let mut data = vec![b'I', b'D', b'3', 3, 0, 0, 0, 0, 0, 20];
        data.extend_from_slice(&[0u8; 20]);
        data.extend_from_slice(&silent_frames(2));

        let info = decoder.decode(&data, &mut frame);
        assert_eq!(info.frame_bytes, 30);
        assert_eq!(frame.sample_count, 0);

        let info = decoder.decode(&data[30..], &mut frame);
        assert_eq!(info.frame_bytes, FRAME_LEN_128K);
    }

    #[test]
    fn test_tag_larger_than_window_spans_calls() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();

        // Tag of 10 + 1000 bytes, offered 100 bytes at a time
        let mut data = vec![b'I', b'D', b'3', 3, 0, 0, 0, 0, 0x07, 0x68];
        data.resize(1010, 0);

        let mut consumed = 0;
        while consumed < data.len() {
            let end = (consumed + 100).min(data.len());
            let info = decoder.decode(&data[consumed..end], &mut frame);
            assert!(info.frame_bytes > 0);
            assert_eq!(frame.sample_count, 0);
            consumed += info.frame_bytes;
        }
        assert_eq!(consumed, 1010);
    }

    #[test]
    fn test_junk_before_sync_is_consumed() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();

        let mut data = vec![0x12u8; 37];
        data.extend_from_slice(&silent_frames(2));

        let info = decoder.decode(&data, &mut frame);

        assert_eq!(info.frame_bytes, 37 + FRAME_LEN_128K);
    }

    #[test]
    fn test_false_sync_after_junk_rejected() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();

        // A lone header-like pattern in junk, not followed by another frame
        let mut data = vec![0x00u8; 16];
        data.extend_from_slice(&HEADER_128K);
        data.resize(16 + 600, 0x00);
        let real = data.len();
        data.extend_from_slice(&silent_frames(2));

        let info = decoder.decode(&data, &mut frame);

        assert_eq!(info.frame_bytes, real + FRAME_LEN_128K);
        assert_eq!(frame.sample_count, 1152);
    }

    #[test]
    fn test_last_frame_before_id3v1_tag() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();
        let mut data = silent_frames(1);
        data.extend_from_slice(b"TAG");
        data.resize(FRAME_LEN_128K + 128, b' ');

        let info = decoder.decode(&data, &mut frame);

        assert_eq!(info.frame_bytes, FRAME_LEN_128K);
        assert_eq!(frame.sample_count, 1152);
    }

    #[test]
    fn test_window_without_sync() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();

        let info = decoder.decode(&[0x55u8; 128], &mut frame);
        assert_eq!(info.frame_bytes, 125);

        let info = decoder.decode(&[0x55u8; 3], &mut frame);
        assert!(info.is_terminal());
    }

    #[test]
    fn test_truncated_frame_is_terminal_at_window_start() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();
        let data = silent_frames(1);

        let info = decoder.decode(&data[..200], &mut frame);

        assert!(info.is_terminal());
    }

    #[test]
    fn test_format_change_between_frames() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();

        // MPEG-2 Layer III, 64 kbit/s, 22050 Hz, mono: 208-byte frames
        let mut data = silent_frames(1);
        for _ in 0..2 {
            let start = data.len();
            data.extend_from_slice(&[0xFF, 0xF3, 0x80, 0xC0]);
            data.resize(start + 208, 0);
        }

        let info = decoder.decode(&data, &mut frame);
        assert_eq!(info.sample_rate, 44100);

        let info = decoder.decode(&data[FRAME_LEN_128K..], &mut frame);
        assert_eq!(info.frame_bytes, 208);
        assert_eq!(info.sample_rate, 22050);
        assert_eq!(info.channels, 1);
        assert_eq!(frame.sample_count, 576);
    }

    #[test]
    fn test_reset_drops_pending_tag_skip() {
        let mut decoder = Mp3FrameDecoder::new().unwrap();
        let mut frame = DecodedFrame::new();

        let mut tag = vec![b'I', b'D', b'3', 3, 0, 0, 0, 0, 0x07, 0x68];
        tag.resize(100, 0);
        decoder.decode(&tag, &mut frame);

        decoder.reset();
        let data = silent_frames(2);
        let info = decoder.decode(&data, &mut frame);
        assert_eq!(info.frame_bytes, FRAME_LEN_128K);
    }
}
