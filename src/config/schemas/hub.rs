// Broadcast hub configuration schema

use crate::config_struct;

// ============================================================================
// HUB CONFIGURATION
// ============================================================================

config_struct! {
    /// WebSocket hub and HTTP API settings
    pub struct HubConfig {
        /// Host/IP address to bind (0.0.0.0 = all interfaces)
        host: String = "0.0.0.0".to_string(),

        /// Listen port
        port: u16 = 8080,

        /// Liveness sweep period; a peer must answer one probe per period
        liveness_interval_secs: u64 = 30,

        /// Per-peer outbound queue length before messages are dropped
        peer_buffer_size: usize = 256,

        /// "any_peer" or "device_peers" (which evictions mark the device disconnected)
        eviction_policy: String = "any_peer".to_string(),

        /// Bound on a single persistence write
        persist_timeout_secs: u64 = 5,

        /// Text sent in the connection confirmation event
        welcome_message: String = "Successfully connected to vitals relay".to_string(),
    }
}
