//! # sdjuke Audio Player Library (sdjuke-ap)
//!
//! Continuous player for a folder tree of MP3 files, modelled on a
//! card-slot jukebox: play every track in on-disk order, loop forever, and
//! let two momentary inputs step forward or back.
//!
//! **Pipeline:** storage → compressed-stream buffer → frame decoder
//! (symphonia) → output adapter → audio bus (cpal or WAV file)
//!
//! **Control:** the playback loop runs on one blocking thread; input edges
//! only set atomic skip flags that the loop polls once per frame.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use playback::{PlaybackStatus, PlayerLoop, SkipRequests};
