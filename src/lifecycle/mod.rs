//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build strategy, throttle, forwarder → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any configuration error aborts before the listener is bound
//! - Background tasks subscribe to the same shutdown broadcast as the server

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
