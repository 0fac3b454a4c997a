//! Client-side load balancing over the discovery cache.
//!
//! Four policies mirror the server's selector policies (§4.3): random
//! (default), round-robin, weighted-random, weighted-round-robin. Unlike
//! the server, which picks among a freshly-fetched live list per request,
//! these read from the agent's local [`Discovery`](crate::discovery::Discovery)
//! cache so a request never blocks on a registry round-trip.

pub mod client;
mod random;
mod round_robin;
mod weight_random;
mod weight_round_robin;

pub use client::LoadBalanceClient;
pub use random::RandomLoadBalance;
pub use round_robin::RoundRobinLoadBalance;
pub use weight_random::WeightRandomLoadBalance;
pub use weight_round_robin::WeightRoundRobinLoadBalance;

use crate::discovery::Discovery;
use crate::protocol::Instance;

pub trait LoadBalance {
    /// Cached instances for `service_name`, refreshing from the server if
    /// nothing is cached yet.
    fn instances(
        &self,
        discovery: &Discovery,
        service_name: &str,
    ) -> impl Future<Output = Result<Vec<Instance>, LoadBalanceError>> + Send {
        async move {
            if let Some(cached) = discovery.get_instances(service_name) {
                return Ok(cached);
            }
            discovery
                .fetch_instances(service_name)
                .await
                .map_err(|e| LoadBalanceError::GetInstancesError(e.to_string()))
        }
    }

    fn get_instance(
        &self,
        discovery: &Discovery,
        service_name: &str,
    ) -> impl Future<Output = Result<Instance, LoadBalanceError>> + Send;
}

#[derive(Debug)]
pub enum LoadBalanceError {
    GetInstancesError(String),
    NoAvailableInstance(String),
}

impl std::fmt::Display for LoadBalanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadBalanceError::GetInstancesError(e) => write!(f, "failed to get instances: {}", e),
            LoadBalanceError::NoAvailableInstance(s) => {
                write!(f, "no available instance for service: {}", s)
            }
        }
    }
}

impl std::error::Error for LoadBalanceError {}
