//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, windows > 0)
//! - Check that every upstream URL is usable and unique
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::SystemTime;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("load_balancer.servers must not be empty")]
    NoServers,

    #[error("server url {url:?} is invalid: {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("server url {0:?} is listed more than once")]
    DuplicateServer(String),

    #[error("load_balancer.duration must be greater than zero")]
    ZeroSessionDuration,

    #[error("load_balancer.duration {0:?} is too large to compute a session expiry")]
    SessionDurationTooLarge(std::time::Duration),

    #[error("throttling.request_limit must be greater than zero")]
    ZeroRequestLimit,

    #[error("throttling.window_size must be greater than zero")]
    ZeroWindow,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.request_secs ({request}) must exceed timeouts.upstream_secs ({upstream})")]
    RequestTimeoutNotAboveUpstream { request: u64, upstream: u64 },

    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let lb = &config.load_balancer;
    if lb.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }

    let mut seen = HashSet::new();
    for server in &lb.servers {
        if let Err(reason) = check_server_url(&server.url) {
            errors.push(ValidationError::InvalidServerUrl {
                url: server.url.clone(),
                reason,
            });
        }
        if !seen.insert(server.url.as_str()) {
            errors.push(ValidationError::DuplicateServer(server.url.clone()));
        }
    }

    if lb.duration.is_zero() {
        errors.push(ValidationError::ZeroSessionDuration);
    } else if SystemTime::now().checked_add(lb.duration).is_none() {
        errors.push(ValidationError::SessionDurationTooLarge(lb.duration));
    }
    if config.throttling.request_limit == 0 {
        errors.push(ValidationError::ZeroRequestLimit);
    }
    if config.throttling.window_size.is_zero() {
        errors.push(ValidationError::ZeroWindow);
    }

    let timeouts = &config.timeouts;
    for (name, secs) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if secs == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }
    // A slow upstream must surface as 502 before the handler timeout fires.
    if timeouts.request_secs <= timeouts.upstream_secs {
        errors.push(ValidationError::RequestTimeoutNotAboveUpstream {
            request: timeouts.request_secs,
            upstream: timeouts.upstream_secs,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Upstreams are plain HTTP(S) origins with a host.
pub(crate) fn check_server_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme {other:?}")),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServerConfig;
    use std::time::Duration;

    fn valid_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config
            .load_balancer
            .servers
            .push(ServerConfig::new("http://127.0.0.1:5001"));
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(validate_config(&valid_config()), Ok(()));
    }

    #[test]
    fn test_empty_server_list_is_rejected() {
        let config = ProxyConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoServers]);
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid_config();
        config
            .load_balancer
            .servers
            .push(ServerConfig::new("ftp://files.local"));
        config
            .load_balancer
            .servers
            .push(ServerConfig::new("http://127.0.0.1:5001"));
        config.throttling.request_limit = 0;
        config.throttling.window_size = Duration::ZERO;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::InvalidServerUrl { .. }));
        assert_eq!(
            errors[1],
            ValidationError::DuplicateServer("http://127.0.0.1:5001".into())
        );
        assert!(errors.contains(&ValidationError::ZeroRequestLimit));
        assert!(errors.contains(&ValidationError::ZeroWindow));
    }

    #[test]
    fn test_bad_bind_address() {
        let mut config = valid_config();
        config.listener.bind_address = "localhost".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidBindAddress("localhost".into())]
        );
    }

    #[test]
    fn test_session_duration_must_fit_a_timestamp() {
        let mut config = valid_config();
        config.load_balancer.duration = Duration::from_secs(u64::MAX);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::SessionDurationTooLarge(Duration::from_secs(
                u64::MAX
            ))]
        );
    }

    #[test]
    fn test_huge_humantime_duration_is_rejected() {
        let raw = r#"
            [load_balancer]
            duration = "500000000000years"

            [[load_balancer.servers]]
            url = "http://127.0.0.1:5001"
        "#;
        let config: ProxyConfig = toml::from_str(raw).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[..],
            [ValidationError::SessionDurationTooLarge(_)]
        ));
    }

    #[test]
    fn test_timeouts_must_be_positive() {
        let mut config = valid_config();
        config.timeouts.connect_secs = 0;
        config.timeouts.upstream_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroTimeout("connect_secs"),
                ValidationError::ZeroTimeout("upstream_secs"),
            ]
        );
    }

    #[test]
    fn test_request_timeout_must_exceed_upstream_timeout() {
        let mut config = valid_config();
        config.timeouts.upstream_secs = 30;
        config.timeouts.request_secs = 30;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::RequestTimeoutNotAboveUpstream {
                request: 30,
                upstream: 30,
            }]
        );
    }
}
