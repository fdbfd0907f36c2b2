//! Least Connections load balancing strategy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::load_balancer::context::RequestContext;
use crate::load_balancer::pool::{Server, ServerPool};
use crate::load_balancer::{LoadBalancer, StrategyError};

/// Least connections selector.
/// Selects the server with the minimum number of active connections and
/// counts the new one against it until [`LoadBalancer::release`] is called.
#[derive(Debug)]
pub struct LeastConnections {
    servers: ServerPool,
    active: Mutex<HashMap<String, usize>>,
}

impl LeastConnections {
    pub fn new(servers: ServerPool) -> Self {
        let active = servers.iter().map(|s| (s.url().to_string(), 0)).collect();
        Self {
            servers,
            active: Mutex::new(active),
        }
    }

    /// Current connection count for a server URL.
    pub fn active_connections(&self, url: &str) -> usize {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.get(url).copied().unwrap_or(0)
    }

    /// Counts in pool order.
    pub fn snapshot(&self) -> Vec<usize> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        self.servers
            .iter()
            .map(|s| active.get(s.url()).copied().unwrap_or(0))
            .collect()
    }
}

impl LoadBalancer for LeastConnections {
    fn name(&self) -> &'static str {
        "LeastConnections"
    }

    fn next_server(&self, _ctx: &mut RequestContext) -> Result<Arc<Server>, StrategyError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        // In case of tie, the first one is selected (stability)
        let server = self
            .servers
            .iter()
            .min_by_key(|s| active.get(s.url()).copied().unwrap_or(0))
            .cloned()
            .ok_or(StrategyError::EmptyPool)?;

        *active.entry(server.url().to_string()).or_insert(0) += 1;
        Ok(server)
    }

    fn release(&self, server: &Server) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = active.get_mut(server.url()) {
            *count = count.saturating_sub(1);
        }
    }
}
