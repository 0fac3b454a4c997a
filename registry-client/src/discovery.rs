use crate::conf::ServerAddr;
use crate::network::HTTP;
use crate::protocol::{GetInstancesRes, Instance};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Periodically-refreshed client-side cache of live instances per service
/// name. Grounded on `client/src/discovery.rs::Discovery`'s
/// `start_sync_timer` poll loop, trimmed to drop the namespace dimension
/// (not present in this system).
#[derive(Clone)]
pub struct Discovery {
    server_addr: Arc<ServerAddr>,
    services: Arc<DashMap<String, Vec<Instance>>>,
}

impl Discovery {
    pub fn new(server_addr: ServerAddr) -> Self {
        Discovery {
            server_addr: Arc::new(server_addr),
            services: Arc::new(DashMap::new()),
        }
    }

    /// Fetches and caches the live instance list for `name` once.
    pub async fn fetch_instances(&self, name: &str) -> anyhow::Result<Vec<Instance>> {
        let url = self.server_addr.build_url(&format!("/services/{}", name))?;
        let res: GetInstancesRes = HTTP.get(&url).await?;
        self.services.insert(name.to_string(), res.services.clone());
        Ok(res.services)
    }

    /// Cached instances for `name`, without a network round-trip.
    pub fn get_instances(&self, name: &str) -> Option<Vec<Instance>> {
        self.services.get(name).map(|entry| entry.clone())
    }

    /// Spawns the background poll loop, refreshing every name already
    /// present in the cache (i.e. every name some caller has fetched at
    /// least once). Stops when `shutdown` fires.
    pub fn start_sync_timer(
        &self,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let names: Vec<String> =
                            this.services.iter().map(|entry| entry.key().clone()).collect();
                        for name in names {
                            if let Err(e) = this.fetch_instances(&name).await {
                                log::warn!("failed to refresh instances for {}: {}", name, e);
                            }
                        }
                    }
                    _ = shutdown.changed() => {
                        log::info!("discovery sync task shutting down");
                        break;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_instances_is_none_before_any_fetch() {
        let discovery = Discovery::new(ServerAddr::Single("127.0.0.1:1".to_string()));
        assert!(discovery.get_instances("api").is_none());
    }

    #[tokio::test]
    async fn fetch_instances_against_unreachable_server_errs() {
        let discovery = Discovery::new(ServerAddr::Single("127.0.0.1:1".to_string()));
        assert!(discovery.fetch_instances("api").await.is_err());
    }
}
