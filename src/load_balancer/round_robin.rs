//! Round-robin load balancing strategy.

use std::sync::{Arc, Mutex, PoisonError};

use crate::load_balancer::context::RequestContext;
use crate::load_balancer::pool::{Server, ServerPool};
use crate::load_balancer::{LoadBalancer, StrategyError};

/// Round-robin selector.
/// Stores an internal index to rotate through servers, starting at the first.
#[derive(Debug)]
pub struct RoundRobin {
    servers: ServerPool,
    current: Mutex<usize>,
}

impl RoundRobin {
    pub fn new(servers: ServerPool) -> Self {
        Self {
            servers,
            current: Mutex::new(0),
        }
    }

    /// Return the server at the current index and advance it.
    pub fn next(&self) -> Arc<Server> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let server = self.servers[*current].clone();
        *current = (*current + 1) % self.servers.len();
        server
    }
}

impl LoadBalancer for RoundRobin {
    fn name(&self) -> &'static str {
        "RoundRobin"
    }

    fn next_server(&self, _ctx: &mut RequestContext) -> Result<Arc<Server>, StrategyError> {
        Ok(self.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::pool::test_pool;
    use std::collections::HashMap;
    use std::thread;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new(test_pool(&["http://a.local", "http://b.local"]));
        let mut ctx = RequestContext::new("/");

        let s1 = lb.next_server(&mut ctx).unwrap();
        assert_eq!(s1.url(), "http://a.local");

        let s2 = lb.next_server(&mut ctx).unwrap();
        assert_eq!(s2.url(), "http://b.local");

        let s3 = lb.next_server(&mut ctx).unwrap();
        assert_eq!(s3.url(), "http://a.local");
    }

    #[test]
    fn test_even_distribution() {
        let urls = ["http://a.local", "http://b.local", "http://c.local"];
        let lb = RoundRobin::new(test_pool(&urls));

        let mut counts: HashMap<String, usize> = HashMap::new();
        for i in 0..100 {
            let server = lb.next();
            assert_eq!(server.url(), urls[i % urls.len()]);
            *counts.entry(server.url().to_string()).or_default() += 1;
        }
        assert_eq!(counts["http://a.local"], 34);
        assert_eq!(counts["http://b.local"], 33);
        assert_eq!(counts["http://c.local"], 33);
    }

    #[test]
    fn test_concurrent_callers_share_one_cycle() {
        let lb = Arc::new(RoundRobin::new(test_pool(&[
            "http://a.local",
            "http://b.local",
            "http://c.local",
            "http://d.local",
        ])));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lb = lb.clone();
                thread::spawn(move || {
                    (0..100)
                        .map(|_| lb.next().url().to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for url in handle.join().unwrap() {
                *counts.entry(url).or_default() += 1;
            }
        }
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 200));
    }
}
