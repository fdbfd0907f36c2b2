//! Sticky round-robin strategy.
//!
//! Clients are bound to the server they were first given for a fixed
//! lifetime. The lifetime is absolute: a hit does not extend it, and the
//! binding is recomputed on the first request after it lapses.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::clock::SharedClock;
use crate::load_balancer::context::{AffinityCookie, RequestContext};
use crate::load_balancer::pool::{Server, ServerPool};
use crate::load_balancer::round_robin::RoundRobin;
use crate::load_balancer::{LoadBalancer, StrategyError};

#[derive(Debug, Clone)]
struct Session {
    server: Arc<Server>,
    expires_at: SystemTime,
}

/// Where the client key came from, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClientKey {
    Cookie(String),
    Forwarded(String),
    Peer(String),
    Generated(String),
}

impl ClientKey {
    fn resolve(ctx: &RequestContext) -> Self {
        if let Some(value) = ctx.affinity() {
            return Self::Cookie(value.to_string());
        }
        if let Some(addr) = ctx.forwarded_for() {
            return Self::Forwarded(addr.to_string());
        }
        if let Some(peer) = ctx.peer() {
            return Self::Peer(peer.ip().to_string());
        }
        Self::Generated(uuid::Uuid::new_v4().to_string())
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Cookie(k) | Self::Forwarded(k) | Self::Peer(k) | Self::Generated(k) => k,
        }
    }

    /// Keys the client carries back to us through the affinity cookie.
    fn is_cookie_backed(&self) -> bool {
        matches!(self, Self::Cookie(_) | Self::Generated(_))
    }
}

/// Session-affine round-robin selector.
#[derive(Debug)]
pub struct StickyRoundRobin {
    round_robin: RoundRobin,
    sessions: DashMap<String, Session>,
    duration: Duration,
    clock: SharedClock,
}

impl StickyRoundRobin {
    pub fn new(servers: ServerPool, duration: Duration, clock: SharedClock) -> Self {
        Self {
            round_robin: RoundRobin::new(servers),
            sessions: DashMap::new(),
            duration,
            clock,
        }
    }

    /// Number of sessions currently held, expired or not.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn expiry_from(&self, now: SystemTime) -> Result<SystemTime, StrategyError> {
        now.checked_add(self.duration)
            .ok_or(StrategyError::SessionExpiryOverflow {
                duration: self.duration,
            })
    }

    /// Drop every session whose expiry has passed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }
}

impl LoadBalancer for StickyRoundRobin {
    fn name(&self) -> &'static str {
        "StickyRoundRobin"
    }

    fn next_server(&self, ctx: &mut RequestContext) -> Result<Arc<Server>, StrategyError> {
        let key = ClientKey::resolve(ctx);
        let now = self.clock.now();

        // The shard lock is held across lookup and assignment so two requests
        // for the same key cannot bind it to different servers.
        let session = match self.sessions.entry(key.as_str().to_string()) {
            Entry::Occupied(entry) if entry.get().expires_at > now => {
                let session = entry.get();
                tracing::debug!(client = %key.as_str(), server = %session.server.url(), "Sticky session hit");
                return Ok(session.server.clone());
            }
            Entry::Occupied(mut entry) => {
                let session = Session {
                    server: self.round_robin.next(),
                    expires_at: self.expiry_from(now)?,
                };
                entry.insert(session.clone());
                session
            }
            Entry::Vacant(entry) => {
                let session = Session {
                    server: self.round_robin.next(),
                    expires_at: self.expiry_from(now)?,
                };
                entry.insert(session.clone());
                session
            }
        };

        tracing::debug!(
            client = %key.as_str(),
            server = %session.server.url(),
            "Sticky session assigned"
        );

        if key.is_cookie_backed() {
            ctx.set_affinity_cookie(AffinityCookie::new(key.as_str(), session.expires_at));
        }
        Ok(session.server)
    }

    fn sweep_interval(&self) -> Option<Duration> {
        Some(self.duration)
    }

    fn sweep(&self) -> usize {
        self.purge_expired()
    }
}
