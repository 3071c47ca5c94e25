//! Streaming decode and output path

pub mod adapter;
pub mod decoder;
pub mod mpa_header;
pub mod output;
pub mod stream_buffer;
pub mod types;

pub use adapter::OutputAdapter;
pub use decoder::{FrameDecoder, Mp3FrameDecoder};
pub use output::{AudioBus, CpalAudioBus, WavFileBus};
pub use stream_buffer::CompressedStreamBuffer;
pub use types::{DecodedFrame, FrameInfo};
