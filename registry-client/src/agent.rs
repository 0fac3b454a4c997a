use crate::conf::AgentConfig;
use crate::network::HTTP;
use crate::protocol::{HeartbeatResult, Instance, RegisterReq, RegisterRes};
use reqwest::StatusCode;
use std::sync::Mutex;
use tokio::sync::watch;

/// The registration agent's lifecycle state (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Registering,
    Live,
    LiveDegraded,
    Failed,
    Stopped,
}

/// Registers one instance once, then heartbeats on a fixed cadence until
/// stopped. Grounded on `client/src/discovery.rs::{DiscoveryClient, Discovery}`
/// and `original_source/soundwave-go/client/client.go`'s `Start`/ticker/`Stop`
/// shape.
pub struct Agent {
    config: AgentConfig,
    state: Mutex<AgentState>,
    shutdown: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        Agent {
            config,
            state: Mutex::new(AgentState::Idle),
            shutdown,
            shutdown_rx,
        }
    }

    pub fn state(&self) -> AgentState {
        *self.state.lock().expect("agent state lock poisoned")
    }

    fn set_state(&self, state: AgentState) {
        *self.state.lock().expect("agent state lock poisoned") = state;
    }

    /// One synchronous register attempt, then spawns the background
    /// heartbeat loop on success. Does not launch the loop on failure.
    pub async fn start(self: &std::sync::Arc<Self>) -> anyhow::Result<Instance> {
        self.set_state(AgentState::Registering);
        match self.register().await {
            Ok(instance) => {
                self.set_state(AgentState::Live);
                self.spawn_heartbeat_loop();
                Ok(instance)
            }
            Err(e) => {
                self.set_state(AgentState::Failed);
                Err(e)
            }
        }
    }

    /// Cancels the heartbeat loop. Already-sent heartbeats finish or are
    /// aborted by the transport; this does not deregister the instance.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
        self.set_state(AgentState::Stopped);
    }

    async fn register(&self) -> anyhow::Result<Instance> {
        let req = RegisterReq {
            name: self.config.name.clone(),
            id: self.config.id.clone(),
            hostname: self.config.hostname.clone(),
            ip: self.config.ip.clone(),
            port: self.config.port,
            version: self.config.version.clone(),
            metadata: self.config.metadata.clone(),
        };
        let url = self.config.server_addr.build_url("/services")?;
        let res: RegisterRes = HTTP.post(&url, req).await?;
        Ok(res.service)
    }

    async fn heartbeat(&self) -> anyhow::Result<HeartbeatResult> {
        let url = self.config.server_addr.build_url(&format!(
            "/services/{}/{}/heartbeat",
            self.config.name, self.config.id
        ))?;
        let status = HTTP.put(&url).await?;
        Ok(match status {
            StatusCode::OK => HeartbeatResult::Ok,
            StatusCode::NOT_FOUND => HeartbeatResult::NoInstanceFound,
            _ => HeartbeatResult::Unknown,
        })
    }

    fn spawn_heartbeat_loop(self: &std::sync::Arc<Self>) {
        let this = self.clone();
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.config.heartbeat_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match this.heartbeat().await {
                            Ok(HeartbeatResult::Ok) => {
                                this.set_state(AgentState::Live);
                                log::debug!("heartbeat ok for {}/{}", this.config.name, this.config.id);
                            }
                            Ok(HeartbeatResult::NoInstanceFound) => {
                                this.set_state(AgentState::LiveDegraded);
                                log::info!(
                                    "instance {}/{} not found by registry, re-registering",
                                    this.config.name,
                                    this.config.id
                                );
                                if let Err(e) = this.register().await {
                                    log::error!("re-register failed: {}", e);
                                } else {
                                    this.set_state(AgentState::Live);
                                }
                            }
                            Ok(HeartbeatResult::Unknown) => {
                                this.set_state(AgentState::LiveDegraded);
                                log::error!("unknown heartbeat result for {}/{}", this.config.name, this.config.id);
                            }
                            Err(e) => {
                                this.set_state(AgentState::LiveDegraded);
                                log::error!("heartbeat transport error: {}", e);
                            }
                        }
                    }
                    _ = shutdown.changed() => {
                        log::info!("agent heartbeat loop stopping");
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
    use crate::conf::{AgentConfigBuilder, ServerAddr};
    use std::sync::Arc;

    fn config() -> AgentConfig {
        AgentConfigBuilder::default()
            .server_addr(ServerAddr::Single("127.0.0.1:1".to_string()))
            .name("api")
            .id("1")
            .hostname("h1")
            .ip("10.0.0.1")
            .port(8080u16)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn start_fails_and_reports_failed_state_when_registry_unreachable() {
        let agent = Arc::new(Agent::new(config()));
        let result = agent.start().await;
        assert!(result.is_err());
        assert_eq!(agent.state(), AgentState::Failed);
    }

    #[test]
    fn initial_state_is_idle() {
        let agent = Agent::new(config());
        assert_eq!(agent.state(), AgentState::Idle);
    }

    #[test]
    fn stop_sets_stopped_state() {
        let agent = Agent::new(config());
        agent.stop();
        assert_eq!(agent.state(), AgentState::Stopped);
    }
}
