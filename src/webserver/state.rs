/// Shared application state passed to all route handlers
use std::sync::Arc;

use crate::store::VitalsSink;
use crate::webserver::ws::HubHandle;

#[derive(Clone)]
pub struct AppState {
    /// Handle to the hub dispatch loop
    pub hub: HubHandle,

    /// Persistence; `None` when the store is disabled
    pub store: Option<Arc<dyn VitalsSink>>,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(hub: HubHandle, store: Option<Arc<dyn VitalsSink>>) -> Self {
        Self {
            hub,
            store,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}
