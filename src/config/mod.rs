//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → consumed once at startup to build the pool, strategy and throttle
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no reload at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ListenerConfig, LoadBalancerConfig, ObservabilityConfig, ProxyConfig, ServerConfig,
    ThrottlingConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
