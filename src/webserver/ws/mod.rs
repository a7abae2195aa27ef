/// Real-time broadcast hub over WebSocket
///
/// ## Key Components
/// - `hub`: peer registry, fan-out and inbound message dispatch
/// - `dispatch`: the single task that owns the hub, plus its `HubHandle`
/// - `liveness`: periodic ping/ack sweep that evicts dead peers
/// - `connection`: per-socket task bridging axum and the hub
/// - `transport`: what the hub sends through (`PeerTransport`)
/// - `message`: JSON wire schema
/// - `metrics`: hub counters for `/api/status`
pub mod connection;
pub mod dispatch;
pub mod hub;
pub mod liveness;
pub mod message;
pub mod metrics;
pub mod transport;

pub use dispatch::{spawn_hub, HubCommand, HubHandle, HubSettings, HubStatus};
pub use hub::{BroadcastHub, Dispatched, EvictionPolicy, PeerConnection, PeerRole, PublishReport};
pub use liveness::{LivenessConfig, LivenessMonitor, SweepReport};
pub use message::{DeviceStatusMessage, WireMessage};
pub use metrics::{HubMetrics, HubMetricsSnapshot};
pub use transport::{ChannelTransport, OutboundFrame, PeerId, PeerTransport};
