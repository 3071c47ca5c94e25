//! Track navigation and playback control

pub mod controller;
pub mod navigator;
pub mod player_loop;
pub mod skip;

pub use controller::{ControllerState, PlaybackController, PlaybackStatus, TrackReport};
pub use navigator::{Direction, NavigatorQuery, NavigatorResult, TrackNavigator};
pub use player_loop::{LoopStep, LoopTiming, PlayerLoop};
pub use skip::{SkipRequest, SkipRequests};
