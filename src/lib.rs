//! vitalsrelay - pulse-oximeter telemetry relay
//!
//! - `vitals`: sensor line parsing and normalization
//! - `webserver`: broadcast hub, liveness monitor, HTTP API
//! - `bridge`: hardware-side serial reader and hub client
//! - `store`: sample persistence
pub mod arguments;
pub mod bridge;
pub mod config;
pub mod device_status;
pub mod errors;
pub mod logger;
pub mod store;
pub mod vitals;
pub mod webserver;
