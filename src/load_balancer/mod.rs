//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request admitted
//!     → context.rs (peer, forwarded address, path, affinity cookie)
//!     → Apply the configured strategy:
//!         - round_robin.rs (rotate through servers)
//!         - weighted.rs (smooth weighted rotation)
//!         - sticky.rs (bind a client to a server for a fixed lifetime)
//!         - hash.rs (client IP or path hashed onto the list)
//!         - least_conn.rs (pick server with fewest in-flight requests)
//!     → ConnectionGuard (releases the selection when dropped)
//! ```
//!
//! # Design Decisions
//! - Strategy chosen once at startup from a closed set of names
//! - Each strategy owns its state behind its own lock; the lock is never
//!   held across network I/O
//! - pool.rs is read-only after startup and needs no synchronization

pub mod context;
pub mod hash;
pub mod least_conn;
pub mod pool;
pub mod round_robin;
pub mod sticky;
pub mod weighted;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::clock::SharedClock;
use crate::config::{ConfigError, LoadBalancerConfig};
use crate::observability::metrics;

pub use context::{AffinityCookie, RequestContext, AFFINITY_COOKIE};
pub use hash::{HashBased, HashMode};
pub use least_conn::LeastConnections;
pub use pool::{Server, ServerPool};
pub use round_robin::RoundRobin;
pub use sticky::StickyRoundRobin;
pub use weighted::WeightedRoundRobin;

/// An internal invariant broken during selection. Never a client error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("weighted round robin did not converge within {steps} steps")]
    WeightedScanExhausted { steps: usize },

    #[error("session duration {duration:?} overflows the session expiry")]
    SessionExpiryOverflow { duration: Duration },

    #[error("server pool is empty")]
    EmptyPool,
}

/// A routing strategy: picks the upstream for one request.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Configuration name of the strategy.
    fn name(&self) -> &'static str;

    /// Select a server for the request described by `ctx`.
    fn next_server(&self, ctx: &mut RequestContext) -> Result<Arc<Server>, StrategyError>;

    /// Undo the bookkeeping of a successful selection. Called exactly once per
    /// selection by [`ConnectionGuard`].
    fn release(&self, _server: &Server) {}

    /// How often [`LoadBalancer::sweep`] should run, if the strategy keeps
    /// state that expires.
    fn sweep_interval(&self) -> Option<Duration> {
        None
    }

    /// Drop expired state. Returns the number of entries removed.
    fn sweep(&self) -> usize {
        0
    }
}

/// The configured strategy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    RoundRobin,
    WeightedRoundRobin,
    StickyRoundRobin,
    IpHash,
    UrlHash,
    LeastConnections,
}

impl StrategyKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RoundRobin" => Some(Self::RoundRobin),
            "WeightedRoundRobin" => Some(Self::WeightedRoundRobin),
            "StickyRoundRobin" => Some(Self::StickyRoundRobin),
            "IpHash" => Some(Self::IpHash),
            "UrlHash" => Some(Self::UrlHash),
            "LeastConnections" => Some(Self::LeastConnections),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "RoundRobin",
            Self::WeightedRoundRobin => "WeightedRoundRobin",
            Self::StickyRoundRobin => "StickyRoundRobin",
            Self::IpHash => "IpHash",
            Self::UrlHash => "UrlHash",
            Self::LeastConnections => "LeastConnections",
        }
    }

    /// Resolve a configured name, falling back to round robin.
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            tracing::warn!(strategy = %name, "Unknown load balancing strategy, using RoundRobin");
            Self::RoundRobin
        })
    }

    /// Instantiate the strategy over `servers`.
    pub fn build(
        self,
        servers: ServerPool,
        session_duration: Duration,
        clock: SharedClock,
    ) -> Arc<dyn LoadBalancer> {
        match self {
            Self::RoundRobin => Arc::new(RoundRobin::new(servers)),
            Self::WeightedRoundRobin => Arc::new(WeightedRoundRobin::new(servers)),
            Self::StickyRoundRobin => {
                Arc::new(StickyRoundRobin::new(servers, session_duration, clock))
            }
            Self::IpHash => Arc::new(HashBased::new(servers, HashMode::Ip)),
            Self::UrlHash => Arc::new(HashBased::new(servers, HashMode::Url)),
            Self::LeastConnections => Arc::new(LeastConnections::new(servers)),
        }
    }
}

/// Build the pool and the configured strategy. Fails on an unusable server list.
pub fn from_config(
    config: &LoadBalancerConfig,
    clock: SharedClock,
) -> Result<Arc<dyn LoadBalancer>, ConfigError> {
    let servers = ServerPool::from_config(&config.servers)?;
    let kind = StrategyKind::resolve(&config.strategy);
    tracing::info!(
        strategy = kind.as_str(),
        servers = servers.len(),
        "Load balancer initialized"
    );
    Ok(kind.build(servers, config.duration, clock))
}

/// A RAII guard around one selection.
/// Dropping it hands the server back to the strategy, whichever way the
/// request ends.
#[derive(Debug)]
pub struct ConnectionGuard {
    balancer: Arc<dyn LoadBalancer>,
    server: Arc<Server>,
}

impl ConnectionGuard {
    /// Run a selection and register its release.
    pub fn acquire(
        balancer: &Arc<dyn LoadBalancer>,
        ctx: &mut RequestContext,
    ) -> Result<Self, StrategyError> {
        let server = balancer.next_server(ctx)?;
        metrics::record_selection(balancer.name(), server.url());
        Ok(Self {
            balancer: balancer.clone(),
            server,
        })
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }
}

impl Deref for ConnectionGuard {
    type Target = Server;
    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.balancer.release(&self.server);
    }
}
