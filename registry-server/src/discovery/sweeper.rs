use super::store::Store;
use tokio::sync::watch;
use tokio::time::{self, Duration};

/// Periodically sweeps stale instances out of `store`. Grounded on
/// `server/src/discovery/discovery.rs::start_cleanup_timer`, but replaces its
/// un-cancellable `loop { sleep().await }` with a `select!` against a
/// `watch` channel so shutdown doesn't leak the task.
pub fn spawn(store: Store, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    store.sweep();
                }
                _ = shutdown.changed() => {
                    tracing::info!("sweeper shutting down");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::store::RegisterRequest;
    use std::collections::HashMap;

    #[tokio::test]
    async fn sweep_task_evicts_stale_instance() {
        let store = Store::new(Duration::from_millis(20));
        store
            .register(RegisterRequest {
                name: "api".to_string(),
                id: "1".to_string(),
                hostname: "h1".to_string(),
                ip: "10.0.0.1".to_string(),
                port: 8080,
                version: "".to_string(),
                metadata: HashMap::new(),
            })
            .unwrap();

        let (tx, rx) = watch::channel(false);
        spawn(store.clone(), Duration::from_millis(10), rx);
        tokio::time::sleep(Duration::from_millis(80)).await;
        drop(tx);

        assert!(store.get_live("api").is_err());
    }
}
