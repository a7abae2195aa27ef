/// Hardware-side bridge
///
/// - `serial`: line source for the sensor tty, reopened forever
/// - `link`: Disconnected/Connecting/Connected state machine with fixed-delay reconnect
/// - `client`: WebSocket client that forwards parsed frames while the link is up
pub mod client;
pub mod link;
pub mod serial;

pub use client::{BridgeClient, BridgeSettings, BridgeStats, ForwardMode};
pub use link::{LinkState, LinkStateMachine};
pub use serial::{spawn_serial_reader, SerialEvent, SerialSettings, SourceKind};
