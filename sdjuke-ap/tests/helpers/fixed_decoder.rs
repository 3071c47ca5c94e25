//! Decoder stand-in with fixed framing
//!
//! Every `frame_len` bytes of input make one stereo frame of
//! `samples_per_frame` samples, each sample equal to the frame's first
//! byte. Lets playback tests count frames without real MP3 data.

use sdjuke_ap::audio::{DecodedFrame, FrameDecoder, FrameInfo};

pub struct FixedFrameDecoder {
    pub frame_len: usize,
    pub samples_per_frame: usize,
    pub sample_rate: u32,
    pub resets: usize,
}

impl FixedFrameDecoder {
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame_len,
            samples_per_frame: 32,
            sample_rate: 44100,
            resets: 0,
        }
    }
}

impl FrameDecoder for FixedFrameDecoder {
    fn reset(&mut self) {
        self.resets += 1;
    }

    fn decode(&mut self, input: &[u8], frame: &mut DecodedFrame) -> FrameInfo {
        frame.clear();
        if input.len() < self.frame_len {
            return FrameInfo::end_of_stream();
        }

        let value = input[0] as i16;
        frame.pcm_mut()[..self.samples_per_frame * 2].fill(value);
        frame.sample_count = self.samples_per_frame;
        frame.channels = 2;
        frame.sample_rate = self.sample_rate;

        FrameInfo {
            channels: 2,
            sample_rate: self.sample_rate,
            frame_bytes: self.frame_len,
        }
    }
}
