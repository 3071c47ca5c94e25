//! Audio test stream generation utilities
//!
//! Builds MP3 byte streams with known framing. Every frame carries a valid
//! Layer III header followed by all-zero side information and main data,
//! which decodes to digital silence without needing the bit reservoir.

/// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, joint stereo
pub const HEADER_44K_STEREO: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
pub const FRAME_LEN_44K_STEREO: usize = 417;
pub const SAMPLES_44K_STEREO: usize = 1152;

/// MPEG-2 Layer III, 64 kbit/s, 22.05 kHz, mono
pub const HEADER_22K_MONO: [u8; 4] = [0xFF, 0xF3, 0x80, 0xC0];
pub const FRAME_LEN_22K_MONO: usize = 208;
pub const SAMPLES_22K_MONO: usize = 576;

/// MPEG-1 Layer III, 320 kbit/s, 32 kHz, stereo
pub const HEADER_32K_320K: [u8; 4] = [0xFF, 0xFB, 0xE8, 0x00];
pub const FRAME_LEN_32K_320K: usize = 1440;
pub const SAMPLES_32K_320K: usize = 1152;

fn frames(header: [u8; 4], frame_len: usize, count: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(count * frame_len);
    for _ in 0..count {
        let start = data.len();
        data.extend_from_slice(&header);
        data.resize(start + frame_len, 0);
    }
    data
}

/// `count` silent 44.1 kHz stereo frames
pub fn silent_mp3(count: usize) -> Vec<u8> {
    frames(HEADER_44K_STEREO, FRAME_LEN_44K_STEREO, count)
}

/// `count` silent 22.05 kHz mono frames
pub fn silent_mp3_mono_22k(count: usize) -> Vec<u8> {
    frames(HEADER_22K_MONO, FRAME_LEN_22K_MONO, count)
}

/// `count` silent 32 kHz stereo frames at 320 kbit/s
pub fn silent_mp3_320k_32k(count: usize) -> Vec<u8> {
    frames(HEADER_32K_320K, FRAME_LEN_32K_320K, count)
}

/// ID3v2.3 tag with a zero-filled body of `body_len` bytes
pub fn id3v2_tag(body_len: usize) -> Vec<u8> {
    assert!(body_len < 1 << 28);
    let size = [
        ((body_len >> 21) & 0x7F) as u8,
        ((body_len >> 14) & 0x7F) as u8,
        ((body_len >> 7) & 0x7F) as u8,
        (body_len & 0x7F) as u8,
    ];
    let mut tag = vec![b'I', b'D', b'3', 3, 0, 0];
    tag.extend_from_slice(&size);
    tag.resize(10 + body_len, 0);
    tag
}
