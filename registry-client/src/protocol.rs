use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire shape of one instance record, mirroring the server's `Instance`
/// (§3 / §6). Kept as a separate type on the client side, matching the
/// teacher's own client/server type split (`client/src/protocol/mod.rs`
/// vs. `server/src/discovery/discovery.rs`).
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
    pub status: String,
    pub last_heartbeat: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub weight: i32,
}

impl Instance {
    pub fn get_weight(&self) -> i32 {
        if self.weight > 0 { self.weight } else { 1 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterReq {
    pub name: String,
    pub id: String,
    pub hostname: String,
    pub ip: String,
    pub port: u16,
    pub version: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRes {
    #[allow(unused)]
    pub message: String,
    pub service: Instance,
}

#[derive(Debug, Deserialize)]
pub struct GetInstancesRes {
    pub services: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
pub struct GetInstanceRes {
    pub service: Instance,
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatRes {
    #[allow(unused)]
    pub message: String,
}

/// Outcome of one heartbeat attempt. `NoInstanceFound` is the 404 the server
/// returns once the sweeper has already evicted the record; distinguishing
/// it from a generic transport failure is what lets the agent decide to
/// re-register (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    Ok,
    NoInstanceFound,
    Unknown,
}
