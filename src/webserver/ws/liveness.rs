/// Peer liveness monitoring
///
/// One sweep per period: peers that have not acknowledged the previous probe
/// are evicted, every other peer is marked unacknowledged and probed with a
/// transport-level ping. A missed period is the timeout.
use std::time::Duration;

use crate::logger::{self, LogTag};

use super::hub::BroadcastHub;
use super::transport::{OutboundFrame, PeerId};

#[derive(Debug, Clone)]
pub struct LivenessConfig {
    pub interval: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

impl LivenessConfig {
    pub fn from_config(interval_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }
}

/// Result of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: Vec<PeerId>,
    pub probed: usize,
    pub device_disconnected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LivenessMonitor {
    config: LivenessConfig,
}

impl LivenessMonitor {
    pub fn new(config: LivenessConfig) -> Self {
        Self { config }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn sweep(&self, hub: &mut BroadcastHub) -> SweepReport {
        let mut report = SweepReport::default();
        let policy = hub.eviction_policy();

        let mut dead = Vec::new();
        for peer in hub.peers_mut() {
            if !peer.is_alive || !peer.transport.is_open() {
                dead.push((peer.id, peer.role));
                continue;
            }
            peer.is_alive = false;
            if let Err(e) = peer.transport.send(peer.id, OutboundFrame::Ping) {
                // left unacknowledged; evicted next sweep
                logger::debug(LogTag::Liveness, &format!("Probe failed: {}", e));
            }
            report.probed += 1;
        }

        let metrics = hub.metrics();
        let mut disconnect = false;
        for (id, role) in dead {
            if hub.remove_peer(id) {
                metrics.peer_evicted();
                report.evicted.push(id);
                disconnect |= policy.disconnects_device(role);
                logger::info(
                    LogTag::Liveness,
                    &format!("Peer {} evicted ({:?}, no ping acknowledgment)", id, role),
                );
            }
        }

        if disconnect {
            report.device_disconnected = hub.set_device_connected(false).is_some();
        }

        logger::debug(
            LogTag::Liveness,
            &format!(
                "Sweep: probed={} evicted={} active={}",
                report.probed,
                report.evicted.len(),
                hub.peer_count()
            ),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webserver::ws::hub::{EvictionPolicy, PeerRole};
    use crate::webserver::ws::message::WireMessage;
    use crate::webserver::ws::metrics::HubMetrics;
    use crate::webserver::ws::transport::testing::RecordingTransport;

    fn hub(policy: EvictionPolicy) -> BroadcastHub {
        BroadcastHub::new("welcome", policy, HubMetrics::new())
    }

    #[test]
    fn test_silent_peer_evicted_after_one_period() {
        let mut hub = hub(EvictionPolicy::AnyPeer);
        let monitor = LivenessMonitor::default();
        let responsive = RecordingTransport::new();
        let silent = RecordingTransport::new();
        let ok_id = hub.add_peer(responsive.clone());
        let dead_id = hub.add_peer(silent.clone());

        let first = monitor.sweep(&mut hub);
        assert_eq!(first.probed, 2);
        assert!(first.evicted.is_empty());
        assert_eq!(silent.ping_count(), 1);

        hub.mark_alive(ok_id);
        let second = monitor.sweep(&mut hub);
        assert_eq!(second.evicted, vec![dead_id]);
        assert!(!hub.contains(dead_id));
        assert!(hub.contains(ok_id));
        assert_eq!(hub.metrics().snapshot().peers_evicted, 1);

        hub.publish(&WireMessage::serial_data("later")).unwrap();
        assert_eq!(silent.texts().len(), 1);
        assert_eq!(responsive.texts().len(), 2);
    }

    #[test]
    fn test_any_peer_eviction_disconnects_device() {
        let mut hub = hub(EvictionPolicy::AnyPeer);
        let monitor = LivenessMonitor::default();
        let dashboard = hub.add_peer(RecordingTransport::new());
        hub.set_device_connected(true);

        monitor.sweep(&mut hub);
        let report = monitor.sweep(&mut hub);

        assert_eq!(report.evicted, vec![dashboard]);
        assert!(report.device_disconnected);
        assert!(!hub.device_status().connected);
    }

    #[test]
    fn test_device_peers_policy_ignores_dashboards() {
        let mut hub = hub(EvictionPolicy::DevicePeers);
        let monitor = LivenessMonitor::default();
        let viewer = RecordingTransport::new();
        let dashboard = hub.add_peer(RecordingTransport::new());
        let device = hub.add_peer(RecordingTransport::new());
        let watcher = hub.add_peer(viewer.clone());
        hub.on_peer_message(device, r#"{"type":"deviceStatus","connected":true}"#)
            .unwrap();
        assert_eq!(hub.peer(device).unwrap().role, PeerRole::Device);

        monitor.sweep(&mut hub);
        hub.mark_alive(device);
        hub.mark_alive(watcher);
        let report = monitor.sweep(&mut hub);
        assert_eq!(report.evicted, vec![dashboard]);
        assert!(hub.device_status().connected);

        hub.mark_alive(watcher);
        let report = monitor.sweep(&mut hub);
        assert_eq!(report.evicted, vec![device]);
        assert!(report.device_disconnected);
        assert!(!hub.device_status().connected);

        let last: serde_json::Value =
            serde_json::from_str(viewer.texts().last().unwrap()).unwrap();
        assert_eq!(last["type"], "deviceStatus");
        assert_eq!(last["connected"], false);
    }

    #[test]
    fn test_closed_transport_evicted_immediately() {
        let mut hub = hub(EvictionPolicy::DevicePeers);
        let monitor = LivenessMonitor::default();
        let gone = RecordingTransport::new();
        let id = hub.add_peer(gone.clone());
        gone.closed.store(true, std::sync::atomic::Ordering::SeqCst);

        let report = monitor.sweep(&mut hub);
        assert_eq!(report.evicted, vec![id]);
        assert_eq!(report.probed, 0);
    }
}
