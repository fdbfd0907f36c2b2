//! Upstream server pool.
//!
//! # Responsibilities
//! - Hold the ordered, immutable list of upstream servers
//! - Normalize weights and parse URLs once at startup
//! - Refuse to exist when empty

use std::ops::Index;
use std::sync::Arc;

use url::Url;

use crate::config::validation::check_server_url;
use crate::config::{ConfigError, ServerConfig, ValidationError};

/// A single upstream server. Identity is the configured URL string.
#[derive(Debug, PartialEq, Eq)]
pub struct Server {
    url: String,
    base_url: Url,
    weight: u32,
}

impl Server {
    /// Build a server from its configuration. Weights of zero or below count as 1.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ValidationError> {
        let base_url =
            check_server_url(&config.url).map_err(|reason| ValidationError::InvalidServerUrl {
                url: config.url.clone(),
                reason,
            })?;
        let weight = u32::try_from(config.weight.max(1)).unwrap_or(u32::MAX);
        Ok(Self {
            url: config.url.clone(),
            base_url,
            weight,
        })
    }

    /// The configured URL, used as the server's key everywhere.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parsed form of [`Server::url`].
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }
}

/// Ordered, non-empty, read-only list of upstream servers.
///
/// Cloning is cheap; every strategy keeps its own handle.
#[derive(Debug, Clone)]
pub struct ServerPool {
    servers: Arc<[Arc<Server>]>,
}

impl ServerPool {
    /// Build the pool from configuration. An empty list is a fatal error.
    pub fn from_config(configs: &[ServerConfig]) -> Result<Self, ConfigError> {
        if configs.is_empty() {
            return Err(ConfigError::Validation(vec![ValidationError::NoServers]));
        }

        let mut servers = Vec::with_capacity(configs.len());
        let mut errors = Vec::new();
        for config in configs {
            match Server::from_config(config) {
                Ok(server) => servers.push(Arc::new(server)),
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        Ok(Self {
            servers: servers.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Always false for a constructed pool.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Server>> {
        self.servers.iter()
    }

    pub fn as_slice(&self) -> &[Arc<Server>] {
        &self.servers
    }
}

impl Index<usize> for ServerPool {
    type Output = Arc<Server>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.servers[index]
    }
}

#[cfg(test)]
pub(crate) fn test_pool(urls: &[&str]) -> ServerPool {
    let configs: Vec<ServerConfig> = urls.iter().map(|u| ServerConfig::new(*u)).collect();
    ServerPool::from_config(&configs).unwrap()
}
