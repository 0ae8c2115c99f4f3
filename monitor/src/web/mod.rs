// File: monitor/src/web/mod.rs
pub mod broadcaster;
pub mod handlers;
pub mod server;

pub use broadcaster::EventBroadcaster;
pub use server::{create_router, start_web_server};

use std::sync::Arc;

use crate::config::Config;
use crate::services::MonitoringService;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub monitoring: Arc<MonitoringService>,
    pub broadcaster: Arc<EventBroadcaster>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        monitoring: Arc<MonitoringService>,
        broadcaster: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            config,
            monitoring,
            broadcaster,
        }
    }
}
