//! # Registry Client
//!
//! Client SDK for the service registry: register an instance once, heartbeat
//! on a fixed cadence, and discover/load-balance across other services'
//! live instances.
//!
//! ```rust,no_run
//! use registry_client::conf::{AgentConfigBuilder, ServerAddr};
//! use registry_client::Conreg;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AgentConfigBuilder::default()
//!     .server_addr(ServerAddr::Single("127.0.0.1:8000".to_string()))
//!     .name("orders-api")
//!     .id("1")
//!     .hostname(registry_client::utils::current_hostname())
//!     .ip("10.0.0.5")
//!     .port(9000u16)
//!     .build()?;
//!
//! let conreg = Conreg::start(config).await?;
//! let instance = conreg.pick("payments-api").await?;
//! println!("picked instance: {:?}", instance);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod conf;
pub mod discovery;
pub mod lb;
pub mod network;
pub mod protocol;
pub mod utils;

pub use agent::{Agent, AgentState};
pub use conf::{AgentConfig, AgentConfigBuilder, LoadBalanceStrategy, ServerAddr};
pub use discovery::Discovery;
pub use lb::LoadBalanceClient;
pub use protocol::Instance;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Convenience facade bundling a started [`Agent`], a [`Discovery`] cache,
/// and a [`LoadBalanceClient`] behind one handle. Mirrors the
/// `init`/`init_with` entry points of `conreg-client::lib.rs`, trimmed to
/// drop the config-center half (not part of this system).
pub struct Conreg {
    pub agent: Arc<Agent>,
    pub discovery: Discovery,
    pub lb_client: LoadBalanceClient,
    discovery_shutdown: watch::Sender<bool>,
}

impl Conreg {
    /// Registers against the configured server and starts the background
    /// heartbeat and discovery-refresh loops.
    pub async fn start(config: AgentConfig) -> anyhow::Result<Self> {
        #[cfg(feature = "logger")]
        utils::init_log();

        let server_addr = config.server_addr.clone();
        let agent = Arc::new(Agent::new(config));
        agent.start().await?;

        let discovery = Discovery::new(server_addr);
        let (discovery_shutdown, discovery_shutdown_rx) = watch::channel(false);
        discovery.start_sync_timer(Duration::from_secs(5), discovery_shutdown_rx);

        let lb_client = LoadBalanceClient::new(discovery.clone());

        Ok(Conreg {
            agent,
            discovery,
            lb_client,
            discovery_shutdown,
        })
    }

    /// Picks one live instance of `service_name` using the policy
    /// configured on `lb_client` (random unless `set_strategy` was called),
    /// fetching instances fresh if nothing is cached yet.
    pub async fn pick(&self, service_name: &str) -> anyhow::Result<Instance> {
        Ok(self.lb_client.pick_instance(service_name).await?)
    }

    /// Stops the agent's heartbeat loop and the discovery refresh loop.
    pub fn stop(&self) {
        self.agent.stop();
        let _ = self.discovery_shutdown.send(true);
    }
}
