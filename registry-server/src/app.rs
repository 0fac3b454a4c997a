use crate::config::ServerConfig;
use crate::discovery::Store;
use crate::discovery::selector::Selector;
use anyhow::Context;
use std::sync::{Arc, OnceLock};

/// Process-wide state. Trimmed from the teacher's `App` (which also carried
/// raft, config-center, and namespace handles) down to what this spec needs.
pub struct App {
    pub config: ServerConfig,
    pub store: Store,
    /// Built once and shared: round-robin/weighted-round-robin policies
    /// hold a cursor that must persist across requests, not be rebuilt per
    /// call (rebuilding would reset the cursor to 0 on every pick).
    pub selector: Arc<dyn Selector>,
}

impl App {
    pub fn new(config: ServerConfig) -> App {
        let store = Store::new(config.service_ttl());
        let selector = config.selector_kind().build();
        App {
            config,
            store,
            selector,
        }
    }
}

static APP: OnceLock<App> = OnceLock::new();

pub fn init(config: ServerConfig) -> &'static App {
    APP.get_or_init(|| App::new(config))
}

pub fn get_app() -> &'static App {
    APP.get().context("APP not init").unwrap()
}
