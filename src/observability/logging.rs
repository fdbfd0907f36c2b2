//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level when set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber. Safe to call more than once; only
/// the first call takes effect.
pub fn init(log_level: &str) {
    let default_directive = format!("lb_proxy={log_level},tower_http={log_level}");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
