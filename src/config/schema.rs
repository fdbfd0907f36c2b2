//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the load balancer.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream servers and the routing strategy applied to them.
    pub load_balancer: LoadBalancerConfig,

    /// Admission control settings.
    pub throttling: ThrottlingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Load balancer section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    /// Strategy name, resolved once at startup.
    pub strategy: String,

    /// Sticky-session lifetime.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Upstream servers, in selection order.
    pub servers: Vec<ServerConfig>,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            strategy: "RoundRobin".to_string(),
            duration: Duration::from_secs(30 * 60),
            servers: Vec::new(),
        }
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Base URL of the upstream (e.g., "http://127.0.0.1:5001").
    pub url: String,

    /// Weight for weighted round robin. Non-positive values count as 1.
    #[serde(default = "default_weight")]
    pub weight: i64,
}

fn default_weight() -> i64 {
    1
}

impl ServerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            weight: default_weight(),
        }
    }

    pub fn weighted(url: impl Into<String>, weight: i64) -> Self {
        Self {
            url: url.into(),
            weight,
        }
    }
}

/// Throttling section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottlingConfig {
    /// Throttling policy name. Only the rejecting sliding window exists.
    pub strategy: String,

    /// Maximum accepted requests inside one window.
    pub request_limit: usize,

    /// Length of the trailing window.
    #[serde(with = "humantime_serde")]
    pub window_size: Duration,
}

impl Default for ThrottlingConfig {
    fn default() -> Self {
        Self {
            strategy: "RejectingSlidingWindow".to_string(),
            request_limit: 100,
            window_size: Duration::from_secs(1),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed until upstream response headers arrive, in seconds.
    pub upstream_secs: u64,

    /// Overall handler timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
