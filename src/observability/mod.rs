//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape, when enabled)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event, request ID carried by the trace span
//! - Metrics are cheap no-ops until an exporter is installed
//! - Neither sink influences request handling

pub mod logging;
pub mod metrics;
