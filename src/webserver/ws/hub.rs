/// Broadcast hub - peer registry and fan-out
///
/// `BroadcastHub` is plain synchronous state. Exactly one task, the dispatch
/// loop in `dispatch.rs`, owns it and applies every connect, disconnect,
/// inbound message and liveness sweep in order, so the peer set and the
/// device status need no locking.
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    device_status::{DeviceStatus, DeviceStatusTracker},
    errors::{RelayError, RelayResult},
    logger::{self, LogTag},
    vitals::{self, VitalsSample},
};

use super::message::{
    DeviceStatusMessage, WireMessage, TYPE_CONNECTION, TYPE_DEVICE_STATUS, TYPE_SERIAL_DATA,
    TYPE_VITAL_SIGNS,
};
use super::metrics::HubMetrics;
use super::transport::{OutboundFrame, PeerId, PeerTransport};

// ============================================================================
// PEERS
// ============================================================================

/// What a peer is, as far as the hub can tell from its traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// Never sent device traffic (dashboards, viewers)
    Dashboard,
    /// Sent deviceStatus, vitalSigns or serialData
    Device,
}

pub struct PeerConnection {
    pub id: PeerId,
    pub transport: Arc<dyn PeerTransport>,
    pub is_alive: bool,
    pub role: PeerRole,
    pub connected_at: DateTime<Utc>,
}

/// Which liveness evictions mark the device disconnected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Any evicted peer
    #[default]
    AnyPeer,
    /// Only peers tagged `PeerRole::Device`
    DevicePeers,
}

impl FromStr for EvictionPolicy {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any_peer" => Ok(EvictionPolicy::AnyPeer),
            "device_peers" => Ok(EvictionPolicy::DevicePeers),
            other => Err(RelayError::Config(format!(
                "unknown eviction policy '{}'",
                other
            ))),
        }
    }
}

impl EvictionPolicy {
    pub fn disconnects_device(&self, role: PeerRole) -> bool {
        match self {
            EvictionPolicy::AnyPeer => true,
            EvictionPolicy::DevicePeers => role == PeerRole::Device,
        }
    }

    /// A clean close only counts when device links are tracked on their own
    pub fn disconnects_on_close(&self, role: PeerRole) -> bool {
        *self == EvictionPolicy::DevicePeers && role == PeerRole::Device
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Outcome of one `publish` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// What `on_peer_message` did with an inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// deviceStatus that changed the tracker (already published)
    StatusChanged(DeviceStatus),
    /// deviceStatus repeating the current state
    StatusUnchanged,
    /// vitalSigns relayed verbatim
    Relayed,
    /// serialData normalized and published; the caller persists it
    Sample(VitalsSample),
    /// serialData line that did not parse
    FrameRejected,
    /// Unknown or server-only type
    Ignored(String),
}

// ============================================================================
// HUB
// ============================================================================

pub struct BroadcastHub {
    peers: BTreeMap<PeerId, PeerConnection>,
    next_id: PeerId,
    device: DeviceStatusTracker,
    eviction_policy: EvictionPolicy,
    welcome_message: String,
    metrics: Arc<HubMetrics>,
}

impl BroadcastHub {
    pub fn new(
        welcome_message: impl Into<String>,
        eviction_policy: EvictionPolicy,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        Self {
            peers: BTreeMap::new(),
            next_id: 1,
            device: DeviceStatusTracker::new(),
            eviction_policy,
            welcome_message: welcome_message.into(),
            metrics,
        }
    }

    /// Register a peer and send it (only it) the connection confirmation
    pub fn add_peer(&mut self, transport: Arc<dyn PeerTransport>) -> PeerId {
        let id = self.next_id;
        self.next_id += 1;

        let welcome = WireMessage::connection(&self.welcome_message);
        match welcome.to_json() {
            Ok(json) => {
                if let Err(e) = transport.send(id, OutboundFrame::Text(Arc::from(json))) {
                    logger::warning(LogTag::Hub, &format!("Welcome not delivered: {}", e));
                }
            }
            Err(e) => logger::error(LogTag::Hub, &format!("Failed to encode welcome: {}", e)),
        }

        self.peers.insert(
            id,
            PeerConnection {
                id,
                transport,
                is_alive: true,
                role: PeerRole::Dashboard,
                connected_at: Utc::now(),
            },
        );
        self.metrics.connection_opened();

        logger::debug(
            LogTag::Hub,
            &format!("Peer {} registered (active={})", id, self.peers.len()),
        );
        id
    }

    /// Remove a peer; returns false if it was already gone
    pub fn remove_peer(&mut self, id: PeerId) -> bool {
        match self.peers.remove(&id) {
            Some(peer) => {
                self.metrics.connection_closed();
                logger::debug(
                    LogTag::Hub,
                    &format!(
                        "Peer {} removed after {}s (active={})",
                        id,
                        (Utc::now() - peer.connected_at).num_seconds(),
                        self.peers.len()
                    ),
                );
                true
            }
            None => false,
        }
    }

    /// A connection task ended; returns false if the peer was already gone
    pub fn on_peer_closed(&mut self, id: PeerId) -> bool {
        let Some(role) = self.peers.get(&id).map(|peer| peer.role) else {
            return false;
        };
        self.remove_peer(id);
        if self.eviction_policy.disconnects_on_close(role) {
            self.set_device_connected(false);
        }
        true
    }

    /// Serialize once and fan out to every open peer
    pub fn publish(&mut self, message: &WireMessage) -> RelayResult<PublishReport> {
        let json: Arc<str> = Arc::from(message.to_json()?);
        let report = self.publish_text(json);
        logger::verbose(
            LogTag::Hub,
            &format!(
                "Published {} to {} peers",
                message.type_name(),
                report.delivered
            ),
        );
        Ok(report)
    }

    /// Fan out already-serialized text; a failing peer stays registered
    pub fn publish_text(&mut self, text: Arc<str>) -> PublishReport {
        let mut report = PublishReport::default();

        for peer in self.peers.values() {
            if !peer.transport.is_open() {
                report.skipped += 1;
                continue;
            }
            match peer.transport.send(peer.id, OutboundFrame::Text(text.clone())) {
                Ok(()) => {
                    report.delivered += 1;
                    self.metrics.message_sent();
                }
                Err(e) => {
                    report.failed += 1;
                    self.metrics.message_dropped(1);
                    logger::debug(LogTag::Hub, &format!("{}", e));
                }
            }
        }

        if report.failed > 0 {
            logger::warning(
                LogTag::Hub,
                &format!(
                    "Broadcast delivered to {} peers, {} failed",
                    report.delivered, report.failed
                ),
            );
        }
        report
    }

    /// Route one inbound text message from a peer
    pub fn on_peer_message(&mut self, id: PeerId, raw: &str) -> RelayResult<Dispatched> {
        self.metrics.message_received();

        let value: serde_json::Value = serde_json::from_str(raw).map_err(RelayError::malformed)?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| RelayError::malformed("missing 'type' field"))?
            .to_string();

        match kind.as_str() {
            TYPE_DEVICE_STATUS => {
                let body: DeviceStatusMessage =
                    serde_json::from_value(value).map_err(RelayError::malformed)?;
                let connected = body.is_connected().ok_or_else(|| {
                    RelayError::malformed("deviceStatus without 'status' or 'connected'")
                })?;
                self.tag_device(id);
                Ok(match self.set_device_connected(connected) {
                    Some(status) => Dispatched::StatusChanged(status),
                    None => Dispatched::StatusUnchanged,
                })
            }
            TYPE_VITAL_SIGNS => {
                let data = value
                    .get("data")
                    .cloned()
                    .ok_or_else(|| RelayError::malformed("vitalSigns without 'data'"))?;
                VitalsSample::from_json_value(data)
                    .map_err(|e| RelayError::malformed(format!("vitalSigns: {}", e)))?;
                self.tag_device(id);
                self.publish_text(Arc::from(raw));
                Ok(Dispatched::Relayed)
            }
            TYPE_SERIAL_DATA => {
                let line = value
                    .get("data")
                    .and_then(|d| d.as_str())
                    .ok_or_else(|| RelayError::malformed("serialData without string 'data'"))?;
                self.tag_device(id);
                match vitals::process_line(line) {
                    Some(sample) => {
                        self.publish(&WireMessage::vital_signs(sample.clone()))?;
                        Ok(Dispatched::Sample(sample))
                    }
                    None => Ok(Dispatched::FrameRejected),
                }
            }
            TYPE_CONNECTION => Ok(Dispatched::Ignored(kind)),
            _ => {
                logger::debug(
                    LogTag::Hub,
                    &format!("Peer {} sent unknown message type '{}'", id, kind),
                );
                Ok(Dispatched::Ignored(kind))
            }
        }
    }

    /// Ask every connection task to close and forget all peers
    pub fn close_all(&mut self) -> usize {
        let count = self.peers.len();
        for (id, peer) in std::mem::take(&mut self.peers) {
            let _ = peer.transport.send(id, OutboundFrame::Close);
            self.metrics.connection_closed();
        }
        count
    }

    /// Liveness acknowledgment
    pub fn mark_alive(&mut self, id: PeerId) {
        if let Some(peer) = self.peers.get_mut(&id) {
            peer.is_alive = true;
        }
    }

    /// Update the device flag and publish the change, if any
    pub fn set_device_connected(&mut self, connected: bool) -> Option<DeviceStatus> {
        let status = self.device.set_connected(connected)?;
        logger::info(
            LogTag::Hub,
            &format!(
                "Device {}",
                if connected { "connected" } else { "disconnected" }
            ),
        );
        if let Err(e) = self.publish(&WireMessage::hub_device_status(status)) {
            logger::error(LogTag::Hub, &format!("Failed to encode status: {}", e));
        }
        Some(status)
    }

    pub fn device_status(&self) -> DeviceStatus {
        self.device.get()
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.eviction_policy
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn peer(&self, id: PeerId) -> Option<&PeerConnection> {
        self.peers.get(&id)
    }

    pub(crate) fn peers_mut(&mut self) -> impl Iterator<Item = &mut PeerConnection> {
        self.peers.values_mut()
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        self.metrics.clone()
    }

    fn tag_device(&mut self, id: PeerId) {
        if let Some(peer) = self.peers.get_mut(&id) {
            if peer.role != PeerRole::Device {
                peer.role = PeerRole::Device;
                logger::debug(LogTag::Hub, &format!("Peer {} tagged as device", id));
            }
        }
    }
}
