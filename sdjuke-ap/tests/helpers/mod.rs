//! Test helper modules for sdjuke Audio Player integration tests
//!
//! Provides reusable test infrastructure components:
//! - Audio generator: deterministic MP3 byte streams
//! - Recording bus: audio bus that logs every call
//! - Fixed-frame decoder: decoder stand-in with predictable framing

#![allow(dead_code)]

pub mod audio_generator;
pub mod fixed_decoder;
pub mod recording_bus;

pub use audio_generator::{id3v2_tag, silent_mp3, silent_mp3_320k_32k, silent_mp3_mono_22k};
pub use fixed_decoder::FixedFrameDecoder;
pub use recording_bus::{BusCall, BusLog, RecordingBus};
