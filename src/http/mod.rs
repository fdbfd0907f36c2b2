//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request id, trace span)
//!     → [throttling middleware admits or rejects]
//!     → pipeline.rs (select server, forward, release)
//!     → forward.rs (upstream call, streamed response)
//!     → headers.rs (message / content / transport header tiers)
//!     → Send to client
//! ```

pub mod forward;
pub mod headers;
pub mod pipeline;
pub mod request;
pub mod server;

pub use forward::{ForwardError, RequestForwarder};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
