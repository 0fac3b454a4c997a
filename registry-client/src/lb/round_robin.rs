use crate::discovery::Discovery;
use crate::lb::{LoadBalance, LoadBalanceError};
use crate::protocol::Instance;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct RoundRobinLoadBalance {
    cursor: DashMap<String, usize>,
}

impl RoundRobinLoadBalance {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalance for RoundRobinLoadBalance {
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
        let mut cursor = self.cursor.entry(service_name.to_string()).or_insert(0);
        *cursor = (*cursor + 1) % instances.len();
        Ok(instances[*cursor].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::ServerAddr;

    #[tokio::test]
    async fn empty_cache_surfaces_fetch_error_not_panic() {
        let discovery = Discovery::new(ServerAddr::Single("127.0.0.1:1".to_string()));
        let lb = RoundRobinLoadBalance::new();
        assert!(lb.get_instance(&discovery, "api").await.is_err());
    }
}
