use crate::discovery::Discovery;
use crate::lb::{LoadBalance, LoadBalanceError};
use crate::protocol::Instance;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct WeightRoundRobinLoadBalance {
    cursor: DashMap<String, AtomicUsize>,
}

impl WeightRoundRobinLoadBalance {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalance for WeightRoundRobinLoadBalance {
    async fn get_instance(
        &self,
        discovery: &Discovery,
        service_name: &str,
    ) -> Result<Instance, LoadBalanceError> {
        let instances = self.instances(discovery, service_name).await?;

        if instances.is_empty() {
            return Err(LoadBalanceError::NoAvailableInstance(
                service_name.to_string(),
            ));
        }
        if instances.len() == 1 {
            return Ok(instances[0].clone());
        }

        let total_weight: i64 = instances.iter().map(|i| i.get_weight() as i64).sum();

        let pos = self
            .cursor
            .entry(service_name.to_string())
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::Relaxed) as i64
            % total_weight;

        let mut running = 0i64;
        for instance in &instances {
            running += instance.get_weight() as i64;
            if pos < running {
                return Ok(instance.clone());
            }
        }
        Ok(instances[0].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::ServerAddr;

    #[tokio::test]
    async fn empty_cache_surfaces_fetch_error_not_panic() {
        let discovery = Discovery::new(ServerAddr::Single("127.0.0.1:1".to_string()));
        let lb = WeightRoundRobinLoadBalance::new();
        assert!(lb.get_instance(&discovery, "api").await.is_err());
    }
}
