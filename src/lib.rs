//! Reverse-proxy load balancer library.
//!
//! Requests pass through a fixed pipeline: admission control, server
//! selection by the configured strategy, forwarding, and release of the
//! selection once the response is done.

pub mod clock;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod throttling;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
