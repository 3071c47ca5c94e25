//! Player loop
//!
//! Outer driver: asks the navigator for the next track, plays it, turns the
//! outcome into the next navigation direction and waits the inter-track
//! gap. When nothing is playable it idles and starts over from the top of
//! the collection.

use crate::audio::decoder::FrameDecoder;
use crate::audio::output::AudioBus;
use crate::playback::controller::{PlaybackController, PlaybackStatus};
use crate::playback::navigator::{Direction, NavigatorQuery, TrackNavigator};
use crate::storage::Storage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay after a track that played to the end
pub const DEFAULT_TRACK_GAP: Duration = Duration::from_millis(500);

/// Extra delay after a skip; doubles as input debounce
pub const DEFAULT_SKIP_DEBOUNCE: Duration = Duration::from_millis(600);

/// Wait before re-scanning when nothing is playable
pub const DEFAULT_IDLE_RETRY: Duration = Duration::from_millis(5000);

/// Pauses between player loop iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    pub track_gap: Duration,
    pub skip_debounce: Duration,
    pub idle_retry: Duration,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            track_gap: DEFAULT_TRACK_GAP,
            skip_debounce: DEFAULT_SKIP_DEBOUNCE,
            idle_retry: DEFAULT_IDLE_RETRY,
        }
    }
}

impl LoopTiming {
    /// Pause that follows a track with the given outcome
    pub fn delay_after(&self, status: PlaybackStatus) -> Duration {
        if status.is_skip() {
            self.track_gap + self.skip_debounce
        } else {
            self.track_gap
        }
    }
}

/// What one loop iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStep {
    /// Nothing playable; the loop idled and reset to the start
    Idle { waited: Duration },
    /// A track was played
    Played {
        path: PathBuf,
        status: PlaybackStatus,
        waited: Duration,
    },
}

/// Player loop state and collaborators
pub struct PlayerLoop<S: Storage, D: FrameDecoder, B: AudioBus> {
    storage: S,
    navigator: TrackNavigator,
    controller: PlaybackController<D, B>,
    timing: LoopTiming,
    current: Option<PathBuf>,
    direction: Direction,
    sleep: fn(Duration),
}

impl<S: Storage, D: FrameDecoder, B: AudioBus> PlayerLoop<S, D, B> {
    pub fn new(
        storage: S,
        navigator: TrackNavigator,
        controller: PlaybackController<D, B>,
        timing: LoopTiming,
    ) -> Self {
        Self {
            storage,
            navigator,
            controller,
            timing,
            current: None,
            direction: Direction::Forward,
            sleep: std::thread::sleep,
        }
    }

    /// Replace the sleep function (tests run without real delays)
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn controller(&self) -> &PlaybackController<D, B> {
        &self.controller
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Run one iteration: navigate, play, pick the next direction, wait.
    pub fn step(&mut self) -> LoopStep {
        if let Some(current) = self.current.as_deref() {
            if !self.storage.exists(current) {
                warn!("Current track no longer exists: {}", current.display());
            }
        }

        let query = NavigatorQuery::new(self.current.clone(), self.direction);
        let Some(path) = self.navigator.find(&self.storage, &query).found else {
            info!(
                "No track found, restarting in {}s",
                self.timing.idle_retry.as_secs_f32()
            );
            self.current = None;
            self.direction = Direction::Forward;
            (self.sleep)(self.timing.idle_retry);
            return LoopStep::Idle {
                waited: self.timing.idle_retry,
            };
        };

        self.current = Some(path.clone());
        let status = self.controller.play(&self.storage, &path);

        self.direction = match status {
            PlaybackStatus::SkippedBackward => Direction::Backward,
            PlaybackStatus::Finished | PlaybackStatus::SkippedForward => Direction::Forward,
        };

        let waited = self.timing.delay_after(status);
        debug!(?status, direction = ?self.direction, "Waiting {:?}", waited);
        (self.sleep)(waited);

        LoopStep::Played {
            path,
            status,
            waited,
        }
    }

    /// Loop forever
    pub fn run(mut self) -> ! {
        info!("Player started, root folder {}", self.navigator.root().display());
        loop {
            self.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_after_status() {
        let timing = LoopTiming::default();

        assert_eq!(timing.delay_after(PlaybackStatus::Finished), Duration::from_millis(500));
        assert_eq!(
            timing.delay_after(PlaybackStatus::SkippedForward),
            Duration::from_millis(1100)
        );
        assert_eq!(
            timing.delay_after(PlaybackStatus::SkippedBackward),
            Duration::from_millis(1100)
        );
    }
}
