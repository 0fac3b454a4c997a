use super::model::Instance;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A pluggable instance-selection policy over an already-filtered live set.
/// Grounded on `client/src/lb/mod.rs::LoadBalance`, moved server-side and
/// adapted to read `Instance::weight` directly rather than a metadata key.
///
/// One `Selector` is shared process-wide across every service name, so
/// stateful policies (round-robin, weighted-round-robin) key their cursor by
/// `name` rather than keeping a single cursor for the whole instance —
/// otherwise requests against different service names would advance the
/// same cursor and starve each other's rotation.
pub trait Selector: Send + Sync {
    /// Picks one instance of `name` out of `instances`. Callers guarantee
    /// `instances` is non-empty and holds only instances of `name`.
    fn select<'a>(&self, name: &str, instances: &'a [Instance]) -> &'a Instance;
}

#[derive(Debug, Default)]
pub struct Random;

impl Selector for Random {
    fn select<'a>(&self, _name: &str, instances: &'a [Instance]) -> &'a Instance {
        let idx = fastrand::usize(..instances.len());
        &instances[idx]
    }
}

/// Round-robin with one cursor per service name, grounded on
/// `client/src/lb/round.rs::RoundRobinLoadBalance`'s `DashMap<String, usize>`
/// cursor.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: DashMap<String, usize>,
}

impl Selector for RoundRobin {
    fn select<'a>(&self, name: &str, instances: &'a [Instance]) -> &'a Instance {
        let mut cursor = self.cursor.entry(name.to_string()).or_insert(0);
        let idx = *cursor % instances.len();
        *cursor = (*cursor + 1) % instances.len();
        &instances[idx]
    }
}

#[derive(Debug, Default)]
pub struct WeightedRandom;

impl Selector for WeightedRandom {
    fn select<'a>(&self, _name: &str, instances: &'a [Instance]) -> &'a Instance {
        weighted_pick(instances, fastrand::i64(0..total_weight(instances)))
    }
}

/// Weighted round-robin with one cursor per service name, grounded on
/// `client/src/lb/weight_round.rs::WeightRoundRobinLoadBalance`'s
/// `DashMap<String, AtomicUsize>` cursor.
#[derive(Debug, Default)]
pub struct WeightedRoundRobin {
    cursor: DashMap<String, AtomicUsize>,
}

impl Selector for WeightedRoundRobin {
    fn select<'a>(&self, name: &str, instances: &'a [Instance]) -> &'a Instance {
        let total = total_weight(instances);
        let pos = self
            .cursor
            .entry(name.to_string())
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::Relaxed) as i64
            % total;
        weighted_pick(instances, pos)
    }
}

/// Sum of instance weights, treating non-positive weights as 1 so an
/// instance that never set a weight still gets picked.
fn total_weight(instances: &[Instance]) -> i64 {
    instances
        .iter()
        .map(|i| if i.weight > 0 { i.weight as i64 } else { 1 })
        .sum()
}

fn weighted_pick(instances: &[Instance], mut n: i64) -> &Instance {
    for instance in instances {
        let w = if instance.weight > 0 {
            instance.weight as i64
        } else {
            1
        };
        if n < w {
            return instance;
        }
        n -= w;
    }
    instances.last().expect("instances non-empty")
}

/// Policy name as accepted in config/query params. Grounded on
/// `conreg-client/src/conf.rs::LoadBalanceStrategy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Random,
    RoundRobin,
    WeightedRandom,
    WeightedRoundRobin,
}

impl SelectorKind {
    /// Builds the shared, long-lived selector for this policy. Call once at
    /// startup and `.manage()` the result — constructing a fresh one per
    /// request resets stateful cursors back to zero every time.
    pub fn build(self) -> Arc<dyn Selector> {
        match self {
            SelectorKind::Random => Arc::new(Random),
            SelectorKind::RoundRobin => Arc::new(RoundRobin::default()),
            SelectorKind::WeightedRandom => Arc::new(WeightedRandom),
            SelectorKind::WeightedRoundRobin => Arc::new(WeightedRoundRobin::default()),
        }
    }
}

impl std::str::FromStr for SelectorKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(SelectorKind::Random),
            "round_robin" => Ok(SelectorKind::RoundRobin),
            "weighted_random" => Ok(SelectorKind::WeightedRandom),
            "weighted_round_robin" => Ok(SelectorKind::WeightedRoundRobin),
            other => Err(format!("unknown selector policy: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::model::InstanceStatus;
    use chrono::Utc;
    use std::collections::HashMap;

    fn instance(id: &str, weight: i32) -> Instance {
        Instance {
            name: "api".to_string(),
            id: id.to_string(),
            hostname: "h".to_string(),
            ip: "10.0.0.1".to_string(),
            port: 8080,
            version: "".to_string(),
            metadata: HashMap::new(),
            status: InstanceStatus::Up,
            last_heartbeat: Utc::now(),
            start_time: Utc::now(),
            weight,
        }
    }

    #[test]
    fn round_robin_cycles_through_all_instances() {
        let instances = vec![instance("1", 0), instance("2", 0), instance("3", 0)];
        let rr = RoundRobin::default();
        let picks: Vec<&str> = (0..6)
            .map(|_| rr.select("api", &instances).id.as_str())
            .collect();
        assert_eq!(picks, vec!["1", "2", "3", "1", "2", "3"]);
    }

    #[test]
    fn round_robin_keeps_separate_cursors_per_service_name() {
        let api_instances = vec![instance("1", 0), instance("2", 0)];
        let web_instances = vec![instance("a", 0), instance("b", 0), instance("c", 0)];
        let rr = RoundRobin::default();

        assert_eq!(rr.select("api", &api_instances).id, "1");
        assert_eq!(rr.select("web", &web_instances).id, "a");
        assert_eq!(rr.select("api", &api_instances).id, "2");
        assert_eq!(rr.select("web", &web_instances).id, "b");
        assert_eq!(rr.select("api", &api_instances).id, "1");
    }

    #[test]
    fn weighted_round_robin_favors_higher_weight() {
        let instances = vec![instance("low", 1), instance("high", 9)];
        let wrr = WeightedRoundRobin::default();
        let picks: Vec<&str> = (0..10)
            .map(|_| wrr.select("api", &instances).id.as_str())
            .collect();
        let high_count = picks.iter().filter(|&&id| id == "high").count();
        assert_eq!(high_count, 9);
    }

    #[test]
    fn random_always_returns_a_member() {
        let instances = vec![instance("1", 0)];
        let r = Random;
        assert_eq!(r.select("api", &instances).id, "1");
    }

    #[test]
    fn selector_kind_parses_known_names() {
        assert_eq!(
            "round_robin".parse::<SelectorKind>().unwrap(),
            SelectorKind::RoundRobin
        );
        assert!("bogus".parse::<SelectorKind>().is_err());
    }
}
