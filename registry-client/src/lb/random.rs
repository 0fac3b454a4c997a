use crate::discovery::Discovery;
use crate::lb::{LoadBalance, LoadBalanceError};
use crate::protocol::Instance;

#[derive(Debug, Default)]
pub struct RandomLoadBalance;

impl RandomLoadBalance {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalance for RandomLoadBalance {
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
        let idx = fastrand::usize(..instances.len());
        Ok(instances[idx].clone())
    }
}
