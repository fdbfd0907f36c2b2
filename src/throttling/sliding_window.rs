//! Rejecting sliding-window admission controller.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use crate::clock::SharedClock;

/// Admits at most `request_limit` requests in any trailing `window`.
#[derive(Debug)]
pub struct SlidingWindow {
    /// Acceptance times, oldest first.
    accepted: Mutex<VecDeque<SystemTime>>,
    request_limit: usize,
    window: Duration,
    clock: SharedClock,
}

impl SlidingWindow {
    pub fn new(request_limit: usize, window: Duration, clock: SharedClock) -> Self {
        Self {
            accepted: Mutex::new(VecDeque::with_capacity(request_limit.min(4096))),
            request_limit,
            window,
            clock,
        }
    }

    /// Decide whether one more request may proceed right now.
    pub fn try_admit(&self) -> bool {
        let now = self.clock.now();
        let window_start = now.checked_sub(self.window).unwrap_or(SystemTime::UNIX_EPOCH);

        let mut accepted = self.accepted.lock().unwrap_or_else(PoisonError::into_inner);
        while accepted.front().is_some_and(|t| *t < window_start) {
            accepted.pop_front();
        }

        if accepted.len() >= self.request_limit {
            return false;
        }
        accepted.push_back(now);
        true
    }

    /// Requests currently counted against the window.
    pub fn in_window(&self) -> usize {
        self.accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn request_limit(&self) -> usize {
        self.request_limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
