// Bridge configuration schema

use crate::config_struct;

// ============================================================================
// BRIDGE CONFIGURATION
// ============================================================================

config_struct! {
    /// Hardware-side bridge settings
    pub struct BridgeConfig {
        /// Hub WebSocket URL (ws:// or wss://)
        hub_url: String = "ws://127.0.0.1:8080/ws".to_string(),

        /// Serial device path ("-" reads standard input)
        serial_path: String = "/dev/ttyUSB0".to_string(),

        /// Serial baud rate used when the path is a serial port
        baud_rate: u32 = 115200,

        /// Fixed delay before each reconnect attempt
        reconnect_delay_secs: u64 = 5,

        /// Keepalive interval while connected
        heartbeat_secs: u64 = 15,

        /// Delay before reopening a serial device that closed or failed
        serial_reopen_delay_secs: u64 = 5,

        /// "vitals" (send normalized samples) or "raw" (send serial lines)
        forward_mode: String = "vitals".to_string(),

        /// Optional POST endpoint for persisting each sample
        #[serde(skip_serializing_if = "Option::is_none")]
        persist_url: Option<String> = None,

        /// Bound on a single persistence request
        persist_timeout_secs: u64 = 5,
    }
}
