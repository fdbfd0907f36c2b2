//! Hash-based strategies (client IP or request path).
//!
//! The bucket is a plain `hash % N`: resizing the pool remaps nearly every
//! key. That is acceptable for a server list fixed at startup.

use std::sync::Arc;

use md5::{Digest, Md5};

use crate::load_balancer::context::RequestContext;
use crate::load_balancer::pool::{Server, ServerPool};
use crate::load_balancer::{LoadBalancer, StrategyError};

/// Which part of the request feeds the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    /// The peer IP address.
    Ip,
    /// The request path, without query.
    Url,
}

/// Stateless hash selector.
#[derive(Debug)]
pub struct HashBased {
    servers: ServerPool,
    mode: HashMode,
}

impl HashBased {
    pub fn new(servers: ServerPool, mode: HashMode) -> Self {
        Self { servers, mode }
    }

    pub fn mode(&self) -> HashMode {
        self.mode
    }

    fn key(&self, ctx: &RequestContext) -> String {
        match self.mode {
            HashMode::Ip => ctx.peer().map(|p| p.ip().to_string()).unwrap_or_default(),
            HashMode::Url => ctx.path().to_string(),
        }
    }
}

impl LoadBalancer for HashBased {
    fn name(&self) -> &'static str {
        match self.mode {
            HashMode::Ip => "IpHash",
            HashMode::Url => "UrlHash",
        }
    }

    fn next_server(&self, ctx: &mut RequestContext) -> Result<Arc<Server>, StrategyError> {
        let key = self.key(ctx);
        let bucket = stable_hash(&key) as usize % self.servers.len();
        tracing::debug!(mode = ?self.mode, key = %key, bucket, "Hashed request");
        Ok(self.servers[bucket].clone())
    }
}

/// First four bytes of the MD5 digest, little-endian.
pub fn stable_hash(key: &str) -> u32 {
    let digest = Md5::digest(key.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}
