//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → middleware.rs (ask the admission controller)
//!     → sliding_window.rs (evict expired timestamps, check limit, record)
//!     → admitted: pass to the load balancing pipeline
//!     → rejected: 429 with a fixed body, nothing else runs
//! ```
//!
//! # Design Decisions
//! - One global window shared by all clients
//! - Reject on exceed: no queueing, no delay, no retry scheduling
//! - Evict, check and record happen under a single lock

pub mod middleware;
pub mod sliding_window;

pub use middleware::{throttle_middleware, THROTTLED_BODY};
pub use sliding_window::SlidingWindow;

use crate::clock::SharedClock;
use crate::config::ThrottlingConfig;

/// The configured throttling policy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleKind {
    RejectingSlidingWindow,
}

impl ThrottleKind {
    /// Resolve a configured name. Every name maps to the only policy; unknown
    /// ones are logged.
    pub fn resolve(name: &str) -> Self {
        if name != "RejectingSlidingWindow" {
            tracing::warn!(strategy = %name, "Unknown throttling strategy, using RejectingSlidingWindow");
        }
        Self::RejectingSlidingWindow
    }
}

/// Build the admission controller described by `config`.
pub fn from_config(config: &ThrottlingConfig, clock: SharedClock) -> SlidingWindow {
    match ThrottleKind::resolve(&config.strategy) {
        ThrottleKind::RejectingSlidingWindow => {
            tracing::info!(
                request_limit = config.request_limit,
                window = ?config.window_size,
                "Throttling initialized"
            );
            SlidingWindow::new(config.request_limit, config.window_size, clock)
        }
    }
}
