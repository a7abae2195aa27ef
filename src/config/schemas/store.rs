// Persistence configuration schema

use crate::config_struct;

config_struct! {
    /// Hub-side sample store
    pub struct StoreConfig {
        /// Persist samples received over HTTP and serialData relays
        enabled: bool = true,

        /// SQLite database file
        path: String = "data/vitals.db".to_string(),
    }
}
