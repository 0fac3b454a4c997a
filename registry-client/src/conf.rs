use derive_builder::Builder;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Address of the registry server(s) the agent talks to. Grounded on
/// `client/src/conf.rs::ServerAddr`; `Unset` makes "no address configured"
/// an explicit, checked state rather than an empty string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServerAddr {
    Single(String),
    Cluster(Vec<String>),
    Unset,
}

impl Default for ServerAddr {
    fn default() -> Self {
        ServerAddr::Unset
    }
}

impl From<&str> for ServerAddr {
    fn from(value: &str) -> Self {
        ServerAddr::Single(value.to_string())
    }
}
impl From<Vec<&str>> for ServerAddr {
    fn from(value: Vec<&str>) -> Self {
        ServerAddr::Cluster(value.into_iter().map(|s| s.to_string()).collect())
    }
}

/// Selector policy the agent's own load-balancing client picks among
/// (§4.3, mirrored client-side for `LoadBalanceClient`'s URL schemes).
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub enum LoadBalanceStrategy {
    #[default]
    Random,
    RoundRobin,
    WeightedRandom,
    WeightedRoundRobin,
}

/// Everything a registration agent needs to register once and heartbeat on
/// a fixed cadence (§4.4). Built via `AgentConfigBuilder`, grounded on
/// `client/src/conf.rs::ConRegConfig` / `ClientConfig`.
#[derive(Debug, Clone, Builder)]
pub struct AgentConfig {
    /// Registry server address(es) to register against.
    #[builder(setter(into))]
    pub server_addr: ServerAddr,
    /// Service name under which this instance is registered.
    #[builder(setter(into))]
    pub name: String,
    /// Client-supplied instance id, unique within `name` + `hostname`.
    #[builder(setter(into))]
    pub id: String,
    #[builder(setter(into))]
    pub hostname: String,
    #[builder(setter(into))]
    pub ip: String,
    pub port: u16,
    #[builder(setter(into), default = "String::new()")]
    pub version: String,
    #[builder(default = "HashMap::new()")]
    pub metadata: HashMap<String, String>,
    /// Heartbeat cadence. Must stay well under the server's `service_ttl`.
    #[builder(default = "Duration::from_secs(10)")]
    pub heartbeat_interval: Duration,
    /// Load-balancing policy for the agent's own `LoadBalanceClient`.
    #[builder(default)]
    pub lb_strategy: LoadBalanceStrategy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let cfg = AgentConfigBuilder::default()
            .server_addr("127.0.0.1:8000")
            .name("api")
            .id("1")
            .hostname("h1")
            .ip("10.0.0.1")
            .port(8080u16)
            .build()
            .unwrap();
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(cfg.lb_strategy, LoadBalanceStrategy::Random);
    }
}
