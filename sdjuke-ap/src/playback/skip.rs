//! Pending skip requests
//!
//! Input edges (stdin, signals, buttons) set a flag and return; the
//! playback thread polls and clears them once per decoded frame.

use std::sync::atomic::{AtomicBool, Ordering};

/// Direction of a requested skip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipRequest {
    Forward,
    Backward,
}

/// Two independent skip flags shared between input edges and the player
#[derive(Debug, Default)]
pub struct SkipRequests {
    forward: AtomicBool,
    backward: AtomicBool,
}

impl SkipRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the player to move to the next track
    pub fn request_forward(&self) {
        self.forward.store(true, Ordering::SeqCst);
    }

    /// Ask the player to move to the previous track
    pub fn request_backward(&self) {
        self.backward.store(true, Ordering::SeqCst);
    }

    /// Clear both flags, returning the pending request if any.
    ///
    /// When both are set, forward wins and backward is dropped.
    pub fn take(&self) -> Option<SkipRequest> {
        let forward = self.forward.swap(false, Ordering::SeqCst);
        let backward = self.backward.swap(false, Ordering::SeqCst);

        if forward {
            Some(SkipRequest::Forward)
        } else if backward {
            Some(SkipRequest::Backward)
        } else {
            None
        }
    }

    /// Drop any pending request
    pub fn clear(&self) {
        self.forward.store(false, Ordering::SeqCst);
        self.backward.store(false, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.forward.load(Ordering::SeqCst) || self.backward.load(Ordering::SeqCst)
    }
}
