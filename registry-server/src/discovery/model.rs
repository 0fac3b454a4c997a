use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;
use strum_macros::Display;

/// A single registered service process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub id: String,
    pub hostname: String,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub status: InstanceStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub weight: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum InstanceStatus {
    #[serde(rename = "UP")]
    #[strum(serialize = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    #[strum(serialize = "DOWN")]
    Down,
    #[serde(rename = "STARTING")]
    #[strum(serialize = "STARTING")]
    Starting,
    #[serde(rename = "OUT_OF_SERVICE")]
    #[strum(serialize = "OUT_OF_SERVICE")]
    OutOfService,
}

impl Instance {
    /// `name-hostname-id`, the store's primary key.
    pub fn unique_id(&self) -> String {
        unique_id(&self.name, &self.hostname, &self.id)
    }

    pub fn is_available(&self) -> bool {
        self.status == InstanceStatus::Up
    }

    pub fn is_heartbeat_stale(&self, ttl: chrono::Duration) -> bool {
        Utc::now().signed_duration_since(self.last_heartbeat) > ttl
    }

    pub fn validate_ip(&self) -> anyhow::Result<()> {
        if IpAddr::from_str(&self.ip).is_err() {
            anyhow::bail!("invalid IP address format: {}", self.ip);
        }
        Ok(())
    }
}

pub fn unique_id(name: &str, hostname: &str, id: &str) -> String {
    format!("{}-{}-{}", name, hostname, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_id_is_name_hostname_id() {
        assert_eq!(unique_id("api", "h1", "1"), "api-h1-1");
    }

    #[test]
    fn status_serializes_to_wire_string() {
        assert_eq!(InstanceStatus::Up.to_string(), "UP");
        assert_eq!(InstanceStatus::OutOfService.to_string(), "OUT_OF_SERVICE");
    }
}
