//! MPEG audio frame header parsing
//!
//! Only what the frame decoder needs to cut a byte stream into whole
//! Layer III frames: sync detection, frame length, sample rate, channel
//! mode. Also recognises ID3v2 tags so they can be skipped.

/// Size of an MPEG audio frame header in bytes
pub const HEADER_LEN: usize = 4;

/// Size of an ID3v2 tag header (and footer) in bytes
pub const ID3V2_HEADER_LEN: usize = 10;

/// Layer III bitrates in kbit/s for MPEG-1, by bitrate index
const BITRATES_V1_L3: [u32; 15] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// Layer III bitrates in kbit/s for MPEG-2 and MPEG-2.5, by bitrate index
const BITRATES_V2_L3: [u32; 15] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
];

/// MPEG version encoded in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

impl MpegVersion {
    fn base_sample_rates(self) -> [u32; 3] {
        match self {
            MpegVersion::Mpeg1 => [44100, 48000, 32000],
            MpegVersion::Mpeg2 => [22050, 24000, 16000],
            MpegVersion::Mpeg25 => [11025, 12000, 8000],
        }
    }
}

/// Parsed Layer III frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub channels: u16,
    pub has_crc: bool,
}

impl FrameHeader {
    /// Parse four header bytes.
    ///
    /// Returns `None` for anything that is not a usable Layer III header:
    /// bad sync, reserved version/sample-rate, Layer I/II, free-format or
    /// invalid bitrate.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let (b0, b1, b2, b3) = (bytes[0], bytes[1], bytes[2], bytes[3]);

        if b0 != 0xFF || (b1 & 0xE0) != 0xE0 {
            return None;
        }

        let version = match (b1 >> 3) & 0x03 {
            0 => MpegVersion::Mpeg25,
            2 => MpegVersion::Mpeg2,
            3 => MpegVersion::Mpeg1,
            _ => return None,
        };

        // 01 = Layer III
        if (b1 >> 1) & 0x03 != 0x01 {
            return None;
        }

        let bitrate_index = (b2 >> 4) as usize;
        if bitrate_index == 0 || bitrate_index == 15 {
            return None;
        }
        let bitrate_kbps = match version {
            MpegVersion::Mpeg1 => BITRATES_V1_L3[bitrate_index],
            _ => BITRATES_V2_L3[bitrate_index],
        };

        let rate_index = ((b2 >> 2) & 0x03) as usize;
        if rate_index == 3 {
            return None;
        }
        let sample_rate = version.base_sample_rates()[rate_index];

        let channels = if (b3 >> 6) == 0x03 { 1 } else { 2 };

        Some(Self {
            version,
            bitrate_kbps,
            sample_rate,
            padding: (b2 >> 1) & 0x01 == 1,
            channels,
            has_crc: b1 & 0x01 == 0,
        })
    }

    /// PCM samples per channel carried by the frame
    pub fn samples_per_frame(&self) -> usize {
        match self.version {
            MpegVersion::Mpeg1 => 1152,
            _ => 576,
        }
    }

    /// Total frame length in bytes, header included
    pub fn frame_len(&self) -> usize {
        let coefficient = match self.version {
            MpegVersion::Mpeg1 => 144,
            _ => 72,
        };
        let padding = usize::from(self.padding);
        (coefficient * self.bitrate_kbps as usize * 1000) / self.sample_rate as usize + padding
    }

    /// Whether `other` can belong to the same stream (used to confirm sync)
    pub fn is_compatible(&self, other: &FrameHeader) -> bool {
        self.version == other.version && self.sample_rate == other.sample_rate
    }
}

/// Total size of an ID3v2 tag starting at `bytes[0]`, if one starts there.
///
/// Needs the 10-byte tag header; the size field is syncsafe (7 bits per
/// byte). A footer flag adds another 10 bytes.
pub fn id3v2_tag_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < ID3V2_HEADER_LEN || &bytes[..3] != b"ID3" {
        return None;
    }
    if bytes[3] == 0xFF || bytes[4] == 0xFF {
        return None;
    }
    if bytes[6..10].iter().any(|b| b & 0x80 != 0) {
        return None;
    }

    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, &b| (acc << 7) | (b & 0x7F) as usize);
    let footer = if bytes[5] & 0x10 != 0 { ID3V2_HEADER_LEN } else { 0 };

    Some(ID3V2_HEADER_LEN + size + footer)
}
