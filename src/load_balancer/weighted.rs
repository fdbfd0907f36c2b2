//! Smooth weighted round-robin strategy.
//!
//! Each pass over the server list lowers a threshold by the GCD of all
//! weights, and a server is picked whenever its weight reaches the current
//! threshold. Heavier servers therefore appear in more passes, interleaved
//! with the lighter ones instead of in bursts.

use std::sync::{Arc, Mutex, PoisonError};

use crate::load_balancer::context::RequestContext;
use crate::load_balancer::pool::{Server, ServerPool};
use crate::load_balancer::{LoadBalancer, StrategyError};

#[derive(Debug)]
struct Cursor {
    index: usize,
    current_weight: u32,
}

/// Weighted round-robin selector.
#[derive(Debug)]
pub struct WeightedRoundRobin {
    servers: ServerPool,
    weights: Vec<u32>,
    max_weight: u32,
    gcd: u32,
    /// Upper bound on scan steps for one selection.
    max_steps: usize,
    cursor: Mutex<Cursor>,
}

impl WeightedRoundRobin {
    pub fn new(servers: ServerPool) -> Self {
        let weights: Vec<u32> = servers.iter().map(|s| s.weight().max(1)).collect();
        let max_weight = weights.iter().copied().max().unwrap_or(1);
        let gcd = weights.iter().copied().fold(0, gcd);
        let max_steps = weights.len() * (max_weight / gcd) as usize + weights.len();

        Self {
            // The first advance lands on index 0 and resets the threshold.
            cursor: Mutex::new(Cursor {
                index: servers.len() - 1,
                current_weight: 0,
            }),
            servers,
            weights,
            max_weight,
            gcd,
            max_steps,
        }
    }

    pub fn max_weight(&self) -> u32 {
        self.max_weight
    }

    pub fn gcd(&self) -> u32 {
        self.gcd
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn name(&self) -> &'static str {
        "WeightedRoundRobin"
    }

    fn next_server(&self, _ctx: &mut RequestContext) -> Result<Arc<Server>, StrategyError> {
        let len = self.servers.len();
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);

        for _ in 0..self.max_steps {
            cursor.index = (cursor.index + 1) % len;
            if cursor.index == 0 {
                cursor.current_weight = if cursor.current_weight <= self.gcd {
                    self.max_weight
                } else {
                    cursor.current_weight - self.gcd
                };
            }

            if self.weights[cursor.index] >= cursor.current_weight {
                return Ok(self.servers[cursor.index].clone());
            }
        }

        tracing::error!(
            steps = self.max_steps,
            max_weight = self.max_weight,
            gcd = self.gcd,
            "Weighted round robin scan did not converge"
        );
        Err(StrategyError::WeightedScanExhausted {
            steps: self.max_steps,
        })
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn weighted_pool(entries: &[(&str, i64)]) -> ServerPool {
        let configs: Vec<ServerConfig> = entries
            .iter()
            .map(|(url, w)| ServerConfig::weighted(*url, *w))
            .collect();
        ServerPool::from_config(&configs).unwrap()
    }

    fn pick(lb: &WeightedRoundRobin, n: usize) -> Vec<String> {
        let mut ctx = RequestContext::new("/");
        (0..n)
            .map(|_| lb.next_server(&mut ctx).unwrap().url().to_string())
            .collect()
    }

    #[test]
    fn test_three_to_one_pattern() {
        let lb = WeightedRoundRobin::new(weighted_pool(&[("http://a", 3), ("http://b", 1)]));
        assert_eq!(lb.max_weight(), 3);
        assert_eq!(lb.gcd(), 1);

        assert_eq!(
            pick(&lb, 8),
            vec![
                "http://a", "http://a", "http://a", "http://b",
                "http://a", "http://a", "http://a", "http://b",
            ]
        );
    }

    #[test]
    fn test_long_run_ratio_matches_weights() {
        let lb = WeightedRoundRobin::new(weighted_pool(&[("http://a", 3), ("http://b", 1)]));
        let picks = pick(&lb, 4000);
        let a = picks.iter().filter(|u| *u == "http://a").count();
        let b = picks.len() - a;
        assert_eq!(a, 3000);
        assert_eq!(b, 1000);

        // b is never starved for longer than max_weight / gcd selections of a.
        let mut gap = 0;
        for url in &picks {
            if url == "http://b" {
                gap = 0;
            } else {
                gap += 1;
                assert!(gap <= 3);
            }
        }
    }

    #[test]
    fn test_gcd_is_respected() {
        let lb = WeightedRoundRobin::new(weighted_pool(&[("http://a", 4), ("http://b", 2)]));
        assert_eq!(lb.gcd(), 2);
        assert_eq!(pick(&lb, 6), vec!["http://a", "http://a", "http://b", "http://a", "http://a", "http://b"]);
    }

    #[test]
    fn test_non_positive_weights_count_as_one() {
        let lb = WeightedRoundRobin::new(weighted_pool(&[("http://a", 0), ("http://b", -3)]));
        assert_eq!(pick(&lb, 4), vec!["http://a", "http://b", "http://a", "http://b"]);
    }

    #[test]
    fn test_three_servers_interleave() {
        let lb = WeightedRoundRobin::new(weighted_pool(&[
            ("http://a", 5),
            ("http://b", 1),
            ("http://c", 1),
        ]));
        let picks = pick(&lb, 700);
        let count = |u: &str| picks.iter().filter(|p| *p == u).count();
        assert_eq!(count("http://a"), 500);
        assert_eq!(count("http://b"), 100);
        assert_eq!(count("http://c"), 100);
    }
}
