//! Logical upstream name → socket address.
//!
//! # Responsibilities
//! - Group configured addresses by upstream name
//! - Rotate through each group's addresses
//!
//! # Design Decisions
//! - Discovery sits behind a trait; the static table is the only source for now
//! - Round robin per upstream, lock-free counter

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::UpstreamConfig;

pub trait UpstreamResolver: Send + Sync + fmt::Debug {
    /// Next address for `name`, or `None` if the upstream is unknown or empty.
    fn resolve(&self, name: &str) -> Option<SocketAddr>;
}

#[derive(Debug, Default)]
struct RoundRobin {
    addresses: Vec<SocketAddr>,
    counter: AtomicUsize,
}

impl RoundRobin {
    fn next(&self) -> Option<SocketAddr> {
        if self.addresses.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.addresses.len();
        Some(self.addresses[index])
    }
}

/// Fixed address table built from configuration.
#[derive(Debug, Default)]
pub struct StaticResolver {
    groups: HashMap<String, RoundRobin>,
}

impl StaticResolver {
    pub fn from_config(configs: &[UpstreamConfig]) -> Self {
        let mut groups = HashMap::new();

        for config in configs {
            let addresses = config
                .addresses
                .iter()
                .filter_map(|address| match address.parse() {
                    Ok(addr) => Some(addr),
                    Err(_) => {
                        tracing::warn!(upstream = %config.name, %address, "Invalid upstream address");
                        None
                    }
                })
                .collect();
            groups.insert(
                config.name.clone(),
                RoundRobin {
                    addresses,
                    counter: AtomicUsize::new(0),
                },
            );
        }

        Self { groups }
    }
}

impl UpstreamResolver for StaticResolver {
    fn resolve(&self, name: &str) -> Option<SocketAddr> {
        let address = self.groups.get(name).and_then(RoundRobin::next);
        if address.is_none() {
            tracing::debug!(upstream = %name, "Upstream not resolvable");
        }
        address
    }
}
