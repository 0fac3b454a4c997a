use clap::Parser;
use std::time::Duration;

/// Server configuration. Parsed once at startup from CLI args; no config
/// file or hot-reload (out of scope per spec's ambient-config rules).
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct ServerConfig {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,
    /// Bind port
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,
    /// How often a registered instance must send a heartbeat, in seconds
    #[arg(long, default_value_t = 10)]
    pub heartbeat_interval_secs: u64,
    /// How long since the last heartbeat before an instance is considered
    /// stale and swept, in seconds. Must be greater than heartbeat_interval.
    #[arg(long, default_value_t = 30)]
    pub service_ttl_secs: u64,
    /// Default instance-selection policy
    #[arg(long, default_value = "random")]
    pub selector: String,
}

impl ServerConfig {
    /// Fails fast at startup rather than surfacing a confusing runtime
    /// eviction bug, modeled on `openraft::Config::validate()`.
    pub fn validate(self) -> anyhow::Result<Self> {
        if self.service_ttl_secs <= self.heartbeat_interval_secs {
            anyhow::bail!(
                "service_ttl_secs ({}) must be greater than heartbeat_interval_secs ({})",
                self.service_ttl_secs,
                self.heartbeat_interval_secs
            );
        }
        self.selector
            .parse::<crate::discovery::selector::SelectorKind>()
            .map_err(anyhow::Error::msg)?;
        Ok(self)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn service_ttl(&self) -> Duration {
        Duration::from_secs(self.service_ttl_secs)
    }

    pub fn selector_kind(&self) -> crate::discovery::selector::SelectorKind {
        self.selector
            .parse()
            .expect("validated at startup in ServerConfig::validate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ServerConfig {
        ServerConfig {
            address: "127.0.0.1".to_string(),
            port: 8000,
            heartbeat_interval_secs: 10,
            service_ttl_secs: 30,
            selector: "random".to_string(),
        }
    }

    #[test]
    fn rejects_ttl_not_greater_than_heartbeat() {
        let mut cfg = base();
        cfg.service_ttl_secs = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_selector() {
        let mut cfg = base();
        cfg.selector = "bogus".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_valid_config() {
        assert!(base().validate().is_ok());
    }
}
