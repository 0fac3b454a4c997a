//! Load-balancing HTTP client.
//!
//! Parses `lb://service_name/path`-style URLs, resolves `service_name`
//! against the discovery cache using a per-service policy, and rewrites the
//! URL to `http://ip:port/path` before handing it to `reqwest`.
//!
//! Supported schemes:
//! - `lb` — the policy set via [`LoadBalanceClient::set_strategy`], or the
//!   default (random) if none was set.
//! - `lb-r` — random
//! - `lb-wr` — weighted-random
//! - `lb-rr` — round-robin
//! - `lb-wrr` — weighted-round-robin

use crate::conf::LoadBalanceStrategy;
use crate::discovery::Discovery;
use crate::lb::{
    LoadBalance, LoadBalanceError, RandomLoadBalance, RoundRobinLoadBalance,
    WeightRandomLoadBalance, WeightRoundRobinLoadBalance,
};
use crate::protocol::Instance;
use dashmap::DashMap;
use reqwest::{Client, Method, RequestBuilder, Url};
use std::time::Duration;

macro_rules! impl_parse_url {
    ($self:expr, $scheme:expr, $strategy:expr, $url:expr, $parsed_url:expr) => {{
        let service_name = $parsed_url.host_str().ok_or_else(|| {
            LoadBalanceError::GetInstancesError(format!("invalid {} url: {}", $scheme, $url))
        })?;
        let instance = $self.get_instance(service_name, $strategy).await?;
        let res = $url.replace(
            &format!("{}://{}", $scheme, service_name),
            &format!(
                "{}{}:{}",
                LoadBalanceClient::HTTP_PREFIX,
                instance.ip,
                instance.port
            ),
        );
        Ok(res)
    }};
}

pub struct LoadBalanceClient {
    client: Client,
    discovery: Discovery,
    strategies: DashMap<String, LoadBalanceStrategy>,
    random_lb: RandomLoadBalance,
    weight_random_lb: WeightRandomLoadBalance,
    round_robin_lb: RoundRobinLoadBalance,
    weight_round_robin_lb: WeightRoundRobinLoadBalance,
}

impl LoadBalanceClient {
    const HTTP_PREFIX: &'static str = "http://";

    pub fn new(discovery: Discovery) -> Self {
        Self::new_with_connect_timeout(discovery, Duration::from_secs(5))
    }

    pub fn new_with_connect_timeout(discovery: Discovery, timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .expect("reqwest client builds with static config");

        LoadBalanceClient {
            client,
            discovery,
            strategies: DashMap::new(),
            random_lb: RandomLoadBalance::default(),
            weight_random_lb: WeightRandomLoadBalance::default(),
            round_robin_lb: RoundRobinLoadBalance::default(),
            weight_round_robin_lb: WeightRoundRobinLoadBalance::default(),
        }
    }

    pub fn set_strategy(&self, service_name: impl Into<String>, strategy: LoadBalanceStrategy) {
        self.strategies.insert(service_name.into(), strategy);
    }

    /// Picks one live instance of `service_name` using whatever policy was
    /// set via [`LoadBalanceClient::set_strategy`] (random by default),
    /// without going through an `lb://` URL.
    pub async fn pick_instance(&self, service_name: &str) -> Result<Instance, LoadBalanceError> {
        self.get_instance(service_name, None).await
    }

    async fn get_instance(
        &self,
        service_name: &str,
        specify_strategy: Option<LoadBalanceStrategy>,
    ) -> Result<Instance, LoadBalanceError> {
        if let Some(strategy) = specify_strategy {
            return self.get_instance_(service_name, strategy).await;
        }

        if let Some(strategy) = self.strategies.get(service_name) {
            return self.get_instance_(service_name, *strategy).await;
        }

        let default_strategy = LoadBalanceStrategy::default();
        let result = self.get_instance_(service_name, default_strategy).await;
        self.strategies
            .insert(service_name.to_string(), default_strategy);
        result
    }

    async fn get_instance_(
        &self,
        service_name: &str,
        strategy: LoadBalanceStrategy,
    ) -> Result<Instance, LoadBalanceError> {
        match strategy {
            LoadBalanceStrategy::Random => {
                self.random_lb.get_instance(&self.discovery, service_name).await
            }
            LoadBalanceStrategy::WeightedRandom => {
                self.weight_random_lb
                    .get_instance(&self.discovery, service_name)
                    .await
            }
            LoadBalanceStrategy::RoundRobin => {
                self.round_robin_lb
                    .get_instance(&self.discovery, service_name)
                    .await
            }
            LoadBalanceStrategy::WeightedRoundRobin => {
                self.weight_round_robin_lb
                    .get_instance(&self.discovery, service_name)
                    .await
            }
        }
    }

    async fn parse_url(&self, url: &str) -> Result<String, LoadBalanceError> {
        let parsed_url = Url::parse(url)
            .map_err(|e| LoadBalanceError::GetInstancesError(format!("bad url {}: {}", url, e)))?;
        match parsed_url.scheme() {
            "lb" => impl_parse_url!(self, "lb", None, url, parsed_url),
            "lb-r" => {
                impl_parse_url!(self, "lb-r", Some(LoadBalanceStrategy::Random), url, parsed_url)
            }
            "lb-wr" => impl_parse_url!(
                self,
                "lb-wr",
                Some(LoadBalanceStrategy::WeightedRandom),
                url,
                parsed_url
            ),
            "lb-rr" => impl_parse_url!(
                self,
                "lb-rr",
                Some(LoadBalanceStrategy::RoundRobin),
                url,
                parsed_url
            ),
            "lb-wrr" => impl_parse_url!(
                self,
                "lb-wrr",
                Some(LoadBalanceStrategy::WeightedRoundRobin),
                url,
                parsed_url
            ),
            _ => Ok(url.to_string()),
        }
    }

    pub async fn get(&self, url: &str) -> Result<RequestBuilder, LoadBalanceError> {
        Ok(self.client.get(self.parse_url(url).await?))
    }

    pub async fn post(&self, url: &str) -> Result<RequestBuilder, LoadBalanceError> {
        Ok(self.client.post(self.parse_url(url).await?))
    }

    pub async fn put(&self, url: &str) -> Result<RequestBuilder, LoadBalanceError> {
        Ok(self.client.put(self.parse_url(url).await?))
    }

    pub async fn delete(&self, url: &str) -> Result<RequestBuilder, LoadBalanceError> {
        Ok(self.client.delete(self.parse_url(url).await?))
    }

    pub async fn request(
        &self,
        method: Method,
        url: &str,
    ) -> Result<RequestBuilder, LoadBalanceError> {
        Ok(self.client.request(method, self.parse_url(url).await?))
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::ServerAddr;

    #[tokio::test]
    async fn non_lb_scheme_passes_through_unchanged() {
        let discovery = Discovery::new(ServerAddr::Single("127.0.0.1:8000".to_string()));
        let client = LoadBalanceClient::new(discovery);
        let builder = client.get("https://example.com/health").await;
        assert!(builder.is_ok());
    }

    #[tokio::test]
    async fn lb_scheme_with_no_cached_instances_errs() {
        let discovery = Discovery::new(ServerAddr::Single("127.0.0.1:1".to_string()));
        let client = LoadBalanceClient::new(discovery);
        let err = client.get("lb://api/hello").await.unwrap_err();
        assert!(matches!(err, LoadBalanceError::GetInstancesError(_)));
    }
}
