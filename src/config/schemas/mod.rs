// Config schema submodule - one file per process concern

use crate::config_struct;

mod bridge;
mod hub;
mod store;

pub use bridge::*;
pub use hub::*;
pub use store::*;

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration shared by the hub and bridge binaries
    pub struct Config {
        /// Broadcast hub / HTTP server
        hub: HubConfig = HubConfig::default(),

        /// Hardware-side bridge
        bridge: BridgeConfig = BridgeConfig::default(),

        /// Sample persistence
        store: StoreConfig = StoreConfig::default(),
    }
}
