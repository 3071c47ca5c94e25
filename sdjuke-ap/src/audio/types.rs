//! Core audio data types
//!
//! Defines the per-frame structures passed between the frame decoder, the
//! output adapter and the playback controller.

/// Maximum PCM samples produced by one MPEG audio frame, all channels.
///
/// 1152 samples per channel (MPEG-1 Layer III) times two channels. Mono
/// frames are expanded to stereo inside the same buffer, so this is also
/// the capacity needed for in-place expansion.
pub const MAX_SAMPLES_PER_FRAME: usize = 1152 * 2;

/// Result metadata of one decode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInfo {
    /// Channel count of the decoded frame (1 or 2; 0 when nothing decoded)
    pub channels: u16,

    /// Sample rate in Hz of the decoded frame (0 when nothing decoded)
    pub sample_rate: u32,

    /// Compressed bytes consumed by this attempt.
    ///
    /// 0 is terminal for the current track: end of stream or an
    /// unrecoverable desync.
    pub frame_bytes: usize,
}

impl FrameInfo {
    /// Terminal result: nothing consumed, nothing decoded
    pub fn end_of_stream() -> Self {
        Self::default()
    }

    /// Bytes consumed without producing audio (tags, junk, bad frames)
    pub fn skipped(frame_bytes: usize) -> Self {
        Self {
            channels: 0,
            sample_rate: 0,
            frame_bytes,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.frame_bytes == 0
    }
}

/// One decoded PCM frame, reused across all frames of a track.
///
/// **Format:**
/// - Samples are i16, interleaved when stereo: [L, R, L, R, ...]
/// - `sample_count` counts samples per channel
/// - After mono expansion the buffer holds `sample_count * 2` samples
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Samples per channel in the current frame
    pub sample_count: usize,

    /// Channel count of the current frame (1 or 2)
    pub channels: u16,

    /// Sample rate in Hz of the current frame
    pub sample_rate: u32,

    pcm: Box<[i16]>,
}

impl DecodedFrame {
    /// Allocate a frame with capacity for the largest decoder output
    pub fn new() -> Self {
        Self {
            sample_count: 0,
            channels: 0,
            sample_rate: 0,
            pcm: vec![0i16; MAX_SAMPLES_PER_FRAME].into_boxed_slice(),
        }
    }

    /// Total sample capacity of the PCM buffer
    pub fn capacity(&self) -> usize {
        self.pcm.len()
    }

    /// Mark the frame empty (no samples) without touching the PCM buffer
    pub fn clear(&mut self) {
        self.sample_count = 0;
        self.channels = 0;
        self.sample_rate = 0;
    }

    /// Number of valid interleaved samples for the current channel layout
    pub fn interleaved_len(&self) -> usize {
        self.sample_count * self.channels as usize
    }

    /// Valid interleaved samples
    pub fn samples(&self) -> &[i16] {
        &self.pcm[..self.interleaved_len()]
    }

    /// Whole PCM buffer, for decoders to fill
    pub fn pcm_mut(&mut self) -> &mut [i16] {
        &mut self.pcm
    }

    /// Expand a mono frame to interleaved stereo in place.
    ///
    /// Walks from the last sample to the first so that writing
    /// `left = right = original[i]` at `2i, 2i+1` never clobbers a source
    /// sample that has not been read yet (`2i >= i`). A frame that is not
    /// mono is left untouched.
    pub fn expand_mono_to_stereo(&mut self) {
        if self.channels != 1 {
            return;
        }

        let count = self.sample_count.min(self.pcm.len() / 2);
        for i in (0..count).rev() {
            let sample = self.pcm[i];
            self.pcm[2 * i] = sample;
            self.pcm[2 * i + 1] = sample;
        }

        self.sample_count = count;
        self.channels = 2;
    }
}

impl Default for DecodedFrame {
    fn default() -> Self {
        Self::new()
    }
}
