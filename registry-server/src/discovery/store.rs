use super::error::RegistryError;
use super::model::{Instance, InstanceStatus, unique_id};
use chrono::Utc;
use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// Request fields accepted by `register`. Mirrors the `/services` POST body.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub id: String,
    pub hostname: String,
    pub ip: String,
    /// Wide enough to accept any integer Rocket's JSON layer will
    /// deserialize (including negatives and values over `u16::MAX`), so
    /// out-of-range values reach `validate` as a normal `Validation` error
    /// instead of failing JSON deserialization with a 422 first.
    pub port: i64,
    pub version: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceStats {
    pub total_instances: usize,
    pub healthy_instances: usize,
    pub unhealthy_instances: usize,
    pub average_uptime_secs: i64,
    pub last_update_time: chrono::DateTime<Utc>,
}

struct RegistryState {
    /// uniqueId -> instance record (owns the record).
    instances: HashMap<String, Instance>,
    /// name -> ordered sequence of uniqueIds present under that name.
    by_name: HashMap<String, Vec<String>>,
}

impl RegistryState {
    fn new() -> Self {
        RegistryState {
            instances: HashMap::new(),
            by_name: HashMap::new(),
        }
    }
}

/// Concurrent in-memory registry store. All mutation is serialized under one
/// coarse readers-writer lock (§5); readers return owned copies.
#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<RegistryState>>,
    ttl: chrono::Duration,
}

impl Store {
    pub fn new(ttl: std::time::Duration) -> Self {
        Store {
            state: Arc::new(RwLock::new(RegistryState::new())),
            ttl: chrono::Duration::from_std(ttl).expect("ttl fits in chrono::Duration"),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    fn validate(req: &RegisterRequest) -> Result<(), RegistryError> {
        if req.name.is_empty() || req.id.is_empty() || req.hostname.is_empty() {
            return Err(RegistryError::Validation(
                "name, id, and hostname must not be empty".to_string(),
            ));
        }
        if IpAddr::from_str(&req.ip).is_err() {
            return Err(RegistryError::Validation(format!(
                "invalid ip address: {}",
                req.ip
            )));
        }
        if req.port <= 0 || req.port > 65535 {
            return Err(RegistryError::Validation(format!(
                "invalid port: {}",
                req.port
            )));
        }
        Ok(())
    }

    /// Registers (or refreshes) one instance. A second register of the same
    /// uniqueId overwrites mutable fields but preserves `start_time`.
    pub fn register(&self, req: RegisterRequest) -> Result<Instance, RegistryError> {
        Self::validate(&req)?;
        let uid = unique_id(&req.name, &req.hostname, &req.id);
        let now = Utc::now();

        let mut state = self.state.write().expect("registry lock poisoned");
        let start_time = state
            .instances
            .get(&uid)
            .map(|existing| existing.start_time)
            .unwrap_or(now);

        let instance = Instance {
            name: req.name.clone(),
            id: req.id,
            hostname: req.hostname,
            ip: req.ip,
            port: req.port as u16,
            version: req.version,
            metadata: req.metadata,
            status: InstanceStatus::Up,
            last_heartbeat: now,
            start_time,
            weight: 0,
        };

        state.instances.insert(uid.clone(), instance.clone());
        let names = state.by_name.entry(req.name).or_default();
        if !names.contains(&uid) {
            names.push(uid);
        }

        Ok(instance)
    }

    /// Removes one instance. Tie-break on duplicate client-supplied `id`
    /// under one name: first match in sequence order (§4.1).
    pub fn deregister(&self, name: &str, id: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write().expect("registry lock poisoned");
        let uids = state
            .by_name
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(format!("service {} does not exist", name)))?
            .clone();

        let position = uids.iter().position(|uid| {
            state
                .instances
                .get(uid)
                .map(|instance| instance.id == id)
                .unwrap_or(false)
        });

        match position {
            Some(pos) => {
                let uid = uids[pos].clone();
                state.instances.remove(&uid);
                let names = state.by_name.get_mut(name).expect("checked above");
                names.remove(pos);
                if names.is_empty() {
                    state.by_name.remove(name);
                }
                Ok(())
            }
            None => Err(RegistryError::NotFound(format!(
                "instance {} does not exist",
                id
            ))),
        }
    }

    /// Refreshes `last_heartbeat` for one instance. Never resurrects a
    /// record the sweeper has already deleted.
    pub fn heartbeat(&self, name: &str, id: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write().expect("registry lock poisoned");
        let uids = state
            .by_name
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(format!("service {} does not exist", name)))?
            .clone();

        for uid in uids {
            if let Some(instance) = state.instances.get_mut(&uid) {
                if instance.id == id {
                    instance.last_heartbeat = Utc::now();
                    instance.status = InstanceStatus::Up;
                    return Ok(());
                }
            }
        }

        Err(RegistryError::NotFound(format!(
            "instance {} does not exist",
            id
        )))
    }

    /// Currently live instances for `name` (status UP and within TTL).
    pub fn get_live(&self, name: &str) -> Result<Vec<Instance>, RegistryError> {
        let state = self.state.read().expect("registry lock poisoned");
        let uids = state
            .by_name
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(format!("service {} does not exist", name)))?;

        let live: Vec<Instance> = uids
            .iter()
            .filter_map(|uid| state.instances.get(uid))
            .filter(|instance| instance.is_available() && !instance.is_heartbeat_stale(self.ttl))
            .cloned()
            .collect();

        if live.is_empty() {
            return Err(RegistryError::NoLiveInstance(format!(
                "no live instances for service {}",
                name
            )));
        }
        Ok(live)
    }

    /// Snapshot of every name and its current records, including stale ones
    /// not yet swept.
    pub fn list_all(&self) -> HashMap<String, Vec<Instance>> {
        let state = self.state.read().expect("registry lock poisoned");
        state
            .by_name
            .iter()
            .map(|(name, uids)| {
                let instances = uids
                    .iter()
                    .filter_map(|uid| state.instances.get(uid))
                    .cloned()
                    .collect();
                (name.clone(), instances)
            })
            .collect()
    }

    pub fn stats_for(&self, name: &str) -> Result<ServiceStats, RegistryError> {
        let state = self.state.read().expect("registry lock poisoned");
        let uids = state
            .by_name
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(format!("service {} does not exist", name)))?;

        let now = Utc::now();
        let mut healthy = 0usize;
        let mut total_uptime = chrono::Duration::zero();
        let total = uids.len();

        for uid in uids {
            if let Some(instance) = state.instances.get(uid) {
                if instance.is_available() && !instance.is_heartbeat_stale(self.ttl) {
                    healthy += 1;
                }
                total_uptime += now.signed_duration_since(instance.start_time);
            }
        }

        let average_uptime_secs = if total > 0 {
            total_uptime.num_seconds() / total as i64
        } else {
            0
        };

        Ok(ServiceStats {
            total_instances: total,
            healthy_instances: healthy,
            unhealthy_instances: total - healthy,
            average_uptime_secs,
            last_update_time: now,
        })
    }

    /// Used by the sweeper: evicts every instance that is stale or not UP,
    /// in one pass under the same lock discipline as the other mutators.
    pub fn sweep(&self) {
        let mut state = self.state.write().expect("registry lock poisoned");
        let ttl = self.ttl;
        let names: Vec<String> = state.by_name.keys().cloned().collect();

        for name in names {
            let uids = state.by_name.get(&name).cloned().unwrap_or_default();
            let mut kept = Vec::with_capacity(uids.len());
            for uid in uids {
                let keep = state
                    .instances
                    .get(&uid)
                    .map(|instance| instance.is_available() && !instance.is_heartbeat_stale(ttl))
                    .unwrap_or(false);
                if keep {
                    kept.push(uid);
                } else {
                    state.instances.remove(&uid);
                }
            }
            if kept.is_empty() {
                state.by_name.remove(&name);
            } else {
                state.by_name.insert(name, kept);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn req(name: &str, id: &str, hostname: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            id: id.to_string(),
            hostname: hostname.to_string(),
            ip: "10.0.0.1".to_string(),
            port: 8080,
            version: "".to_string(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn register_then_get_live_returns_instance() {
        let store = Store::new(Duration::from_secs(30));
        store.register(req("api", "1", "h1")).unwrap();
        let live = store.get_live("api").unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].status, InstanceStatus::Up);
    }

    #[test]
    fn unknown_name_is_not_found() {
        let store = Store::new(Duration::from_secs(30));
        assert!(matches!(
            store.get_live("nope"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn re_register_preserves_start_time_overwrites_mutable_fields() {
        let store = Store::new(Duration::from_secs(30));
        let first = store.register(req("api", "1", "h1")).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let mut second_req = req("api", "1", "h1");
        second_req.version = "2.0".to_string();
        let second = store.register(second_req).unwrap();

        assert_eq!(second.start_time, first.start_time);
        assert_eq!(second.version, "2.0");

        let live = store.get_live("api").unwrap();
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn register_then_deregister_round_trips_indices() {
        let store = Store::new(Duration::from_secs(30));
        store.register(req("api", "1", "h1")).unwrap();
        store.deregister("api", "1").unwrap();
        assert!(matches!(
            store.get_live("api"),
            Err(RegistryError::NotFound(_))
        ));
        assert!(store.list_all().get("api").is_none());
    }

    #[test]
    fn heartbeat_on_unknown_instance_is_not_found() {
        let store = Store::new(Duration::from_secs(30));
        store.register(req("api", "1", "h1")).unwrap();
        assert!(matches!(
            store.heartbeat("api", "99"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn sweep_removes_stale_instances() {
        let store = Store::new(Duration::from_millis(10));
        store.register(req("api", "1", "h1")).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        store.sweep();
        assert!(matches!(
            store.get_live("api"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn heartbeat_before_sweep_prevents_eviction() {
        let store = Store::new(Duration::from_millis(100));
        store.register(req("api", "1", "h1")).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        store.heartbeat("api", "1").unwrap();
        std::thread::sleep(Duration::from_millis(60));
        store.sweep();
        assert!(store.get_live("api").is_ok());
    }

    #[test]
    fn invalid_port_is_rejected() {
        let store = Store::new(Duration::from_secs(30));
        let mut bad = req("api", "1", "h1");
        bad.port = 0;
        assert!(matches!(
            store.register(bad),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let store = Store::new(Duration::from_secs(30));
        let mut bad = req("api", "1", "h1");
        bad.port = 70000;
        assert!(matches!(
            store.register(bad),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn negative_port_is_rejected() {
        let store = Store::new(Duration::from_secs(30));
        let mut bad = req("api", "1", "h1");
        bad.port = -1;
        assert!(matches!(
            store.register(bad),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn invalid_ip_is_rejected() {
        let store = Store::new(Duration::from_secs(30));
        let mut bad = req("api", "1", "h1");
        bad.ip = "not-an-ip".to_string();
        assert!(matches!(
            store.register(bad),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn stats_counts_healthy_and_unhealthy() {
        let store = Store::new(Duration::from_millis(20));
        store.register(req("api", "1", "h1")).unwrap();
        store.register(req("api", "2", "h2")).unwrap();
        std::thread::sleep(Duration::from_millis(40));
        store.heartbeat("api", "1").unwrap();
        let stats = store.stats_for("api").unwrap();
        assert_eq!(stats.total_instances, 2);
        assert_eq!(stats.healthy_instances, 1);
        assert_eq!(stats.unhealthy_instances, 1);
    }
}
