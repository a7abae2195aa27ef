/// Hub dispatch loop
///
/// The only task that touches `BroadcastHub`. Connection tasks, HTTP handlers
/// and the liveness tick talk to it through `HubHandle`, a cloneable sender of
/// `HubCommand`s; replies come back over oneshot channels.
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::{
    config::HubConfig,
    device_status::DeviceStatus,
    errors::{RelayError, RelayResult},
    logger::{self, LogTag},
    store::{persist_in_background, VitalsSink},
};

use super::hub::{BroadcastHub, Dispatched, EvictionPolicy};
use super::liveness::{LivenessConfig, LivenessMonitor};
use super::message::WireMessage;
use super::metrics::{HubMetrics, HubMetricsSnapshot};
use super::transport::{PeerId, PeerTransport};

/// Runtime settings for the hub, resolved from `HubConfig`
#[derive(Debug, Clone)]
pub struct HubSettings {
    pub welcome_message: String,
    pub eviction_policy: EvictionPolicy,
    pub liveness: LivenessConfig,
    pub persist_timeout: Duration,
    pub peer_buffer_size: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self::from_config(&HubConfig::default()).unwrap_or_else(|_| Self {
            welcome_message: String::new(),
            eviction_policy: EvictionPolicy::AnyPeer,
            liveness: LivenessConfig::default(),
            persist_timeout: Duration::from_secs(5),
            peer_buffer_size: 256,
        })
    }
}

impl HubSettings {
    pub fn from_config(cfg: &HubConfig) -> RelayResult<Self> {
        Ok(Self {
            welcome_message: cfg.welcome_message.clone(),
            eviction_policy: cfg.eviction_policy.parse()?,
            liveness: LivenessConfig::from_config(cfg.liveness_interval_secs),
            persist_timeout: Duration::from_secs(cfg.persist_timeout_secs),
            peer_buffer_size: cfg.peer_buffer_size,
        })
    }
}

pub enum HubCommand {
    Connect {
        transport: Arc<dyn PeerTransport>,
        reply: oneshot::Sender<PeerId>,
    },
    Disconnect {
        peer: PeerId,
    },
    Message {
        peer: PeerId,
        text: String,
    },
    Pong {
        peer: PeerId,
    },
    Publish {
        message: WireMessage,
    },
    SetDeviceConnected {
        connected: bool,
    },
    Status {
        reply: oneshot::Sender<HubStatus>,
    },
    Shutdown,
}

/// Point-in-time view of the hub for HTTP handlers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStatus {
    pub peers: usize,
    pub device: DeviceStatus,
    pub metrics: HubMetricsSnapshot,
}

#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubCommand>,
    peer_buffer_size: usize,
}

impl HubHandle {
    fn send(&self, command: HubCommand) -> RelayResult<()> {
        self.tx
            .send(command)
            .map_err(|_| RelayError::HubUnavailable("dispatch loop stopped".to_string()))
    }

    /// Register a transport; resolves once the welcome has been queued
    pub async fn connect(&self, transport: Arc<dyn PeerTransport>) -> RelayResult<PeerId> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Connect { transport, reply })?;
        rx.await
            .map_err(|_| RelayError::HubUnavailable("connect dropped".to_string()))
    }

    pub fn disconnect(&self, peer: PeerId) {
        let _ = self.send(HubCommand::Disconnect { peer });
    }

    pub fn message(&self, peer: PeerId, text: String) {
        let _ = self.send(HubCommand::Message { peer, text });
    }

    pub fn pong(&self, peer: PeerId) {
        let _ = self.send(HubCommand::Pong { peer });
    }

    pub fn publish(&self, message: WireMessage) -> RelayResult<()> {
        self.send(HubCommand::Publish { message })
    }

    pub fn set_device_connected(&self, connected: bool) -> RelayResult<()> {
        self.send(HubCommand::SetDeviceConnected { connected })
    }

    pub async fn status(&self) -> RelayResult<HubStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Status { reply })?;
        rx.await
            .map_err(|_| RelayError::HubUnavailable("status dropped".to_string()))
    }

    /// Close every peer and stop the loop
    pub fn shutdown(&self) {
        let _ = self.send(HubCommand::Shutdown);
    }

    /// Queue capacity for each peer's outbound frames
    pub fn peer_buffer_size(&self) -> usize {
        self.peer_buffer_size
    }
}

/// Start the dispatch loop
///
/// `sink` receives every sample the hub normalizes itself (serialData);
/// relayed vitalSigns are persisted by whoever produced them.
pub fn spawn_hub(
    settings: HubSettings,
    sink: Option<Arc<dyn VitalsSink>>,
) -> (HubHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let hub = BroadcastHub::new(
        settings.welcome_message.clone(),
        settings.eviction_policy,
        HubMetrics::new(),
    );
    let monitor = LivenessMonitor::new(settings.liveness.clone());
    let handle = HubHandle {
        tx,
        peer_buffer_size: settings.peer_buffer_size,
    };
    let task = tokio::spawn(run(hub, monitor, rx, sink, settings.persist_timeout));
    (handle, task)
}

async fn run(
    mut hub: BroadcastHub,
    monitor: LivenessMonitor,
    mut rx: mpsc::UnboundedReceiver<HubCommand>,
    sink: Option<Arc<dyn VitalsSink>>,
    persist_timeout: Duration,
) {
    let period = monitor.interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    logger::info(
        LogTag::Hub,
        &format!(
            "Dispatch loop started (liveness every {}s, policy {:?})",
            period.as_secs(),
            hub.eviction_policy()
        ),
    );

    loop {
        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else { break };
                match command {
                    HubCommand::Connect { transport, reply } => {
                        let id = hub.add_peer(transport);
                        let _ = reply.send(id);
                    }
                    HubCommand::Disconnect { peer } => {
                        hub.on_peer_closed(peer);
                    }
                    HubCommand::Message { peer, text } => {
                        match hub.on_peer_message(peer, &text) {
                            Ok(Dispatched::Sample(sample)) => {
                                if let Some(sink) = &sink {
                                    persist_in_background(sink.clone(), sample, persist_timeout);
                                }
                            }
                            Ok(_) => {}
                            Err(e) if e.is_recoverable() => {
                                logger::warning(
                                    LogTag::Hub,
                                    &format!("Dropped message from peer {}: {}", peer, e),
                                );
                            }
                            Err(e) => {
                                logger::error(
                                    LogTag::Hub,
                                    &format!("Failed to handle message from peer {}: {}", peer, e),
                                );
                            }
                        }
                    }
                    HubCommand::Pong { peer } => hub.mark_alive(peer),
                    HubCommand::Publish { message } => {
                        if let Err(e) = hub.publish(&message) {
                            logger::error(LogTag::Hub, &format!("Publish failed: {}", e));
                        }
                    }
                    HubCommand::SetDeviceConnected { connected } => {
                        hub.set_device_connected(connected);
                    }
                    HubCommand::Status { reply } => {
                        let _ = reply.send(HubStatus {
                            peers: hub.peer_count(),
                            device: hub.device_status(),
                            metrics: hub.metrics().snapshot(),
                        });
                    }
                    HubCommand::Shutdown => {
                        let closed = hub.close_all();
                        logger::info(
                            LogTag::Hub,
                            &format!("Shutting down, closed {} peers", closed),
                        );
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                monitor.sweep(&mut hub);
            }
        }
    }

    logger::info(LogTag::Hub, "Dispatch loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteVitalsStore;
    use crate::webserver::ws::transport::{testing::RecordingTransport, ChannelTransport, OutboundFrame};

    fn settings(interval_secs: u64) -> HubSettings {
        HubSettings {
            liveness: LivenessConfig::from_config(interval_secs),
            ..HubSettings::default()
        }
    }

    #[tokio::test]
    async fn test_connect_publish_and_status() {
        let (hub, _task) = spawn_hub(settings(30), None);
        let (transport, mut rx) = ChannelTransport::new(8);

        let id = hub.connect(Arc::new(transport)).await.unwrap();
        assert!(matches!(rx.recv().await, Some(OutboundFrame::Text(_))));

        hub.publish(WireMessage::serial_data("hello")).unwrap();
        match rx.recv().await {
            Some(OutboundFrame::Text(text)) => assert!(text.contains("hello")),
            other => panic!("unexpected {:?}", other),
        }

        let status = hub.status().await.unwrap();
        assert_eq!(status.peers, 1);
        assert!(!status.device.connected);
        assert_eq!(status.metrics.messages_sent, 1);

        hub.disconnect(id);
        assert_eq!(hub.status().await.unwrap().peers, 0);
    }

    #[tokio::test]
    async fn test_device_status_command() {
        let (hub, _task) = spawn_hub(settings(30), None);
        hub.set_device_connected(true).unwrap();
        assert!(hub.status().await.unwrap().device.connected);
    }

    #[tokio::test]
    async fn test_closed_device_peer_clears_status() {
        let (hub, _task) = spawn_hub(
            HubSettings {
                eviction_policy: EvictionPolicy::DevicePeers,
                ..settings(30)
            },
            None,
        );
        let device = hub.connect(RecordingTransport::new()).await.unwrap();
        hub.message(
            device,
            r#"{"type":"deviceStatus","status":"connected"}"#.to_string(),
        );
        assert!(hub.status().await.unwrap().device.connected);

        hub.disconnect(device);
        let status = hub.status().await.unwrap();
        assert_eq!(status.peers, 0);
        assert!(!status.device.connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness_tick_evicts_silent_peer() {
        let (hub, _task) = spawn_hub(settings(30), None);
        let transport = RecordingTransport::new();
        hub.connect(transport.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(transport.ping_count(), 1);
        assert_eq!(hub.status().await.unwrap().peers, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let status = hub.status().await.unwrap();
        assert_eq!(status.peers, 0);
        assert_eq!(status.metrics.peers_evicted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_keeps_peer() {
        let (hub, _task) = spawn_hub(settings(30), None);
        let id = hub.connect(RecordingTransport::new()).await.unwrap();

        // stay one second behind each sweep
        tokio::time::sleep(Duration::from_secs(1)).await;
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_secs(30)).await;
            hub.pong(id);
        }
        assert_eq!(hub.status().await.unwrap().peers, 1);
    }

    #[tokio::test]
    async fn test_serial_data_is_persisted() {
        let store = Arc::new(SqliteVitalsStore::open_in_memory().unwrap());
        let sink: Arc<dyn VitalsSink> = store.clone();
        let (hub, _task) = spawn_hub(settings(30), Some(sink));
        let id = hub.connect(RecordingTransport::new()).await.unwrap();

        hub.message(
            id,
            r#"{"type":"serialData","data":"Oxygen % = 97%, BPM = 80, Avg BPM = 75"}"#.to_string(),
        );
        hub.message(id, "{broken".to_string());

        let mut stored = Vec::new();
        for _ in 0..50 {
            stored = store.history().await.unwrap();
            if !stored.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sample.oxygen(), 97.0);
        assert_eq!(hub.status().await.unwrap().peers, 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_peers() {
        let (hub, task) = spawn_hub(settings(30), None);
        let (transport, mut rx) = ChannelTransport::new(8);
        hub.connect(Arc::new(transport)).await.unwrap();
        let _welcome = rx.recv().await;

        hub.shutdown();
        task.await.unwrap();
        assert_eq!(rx.recv().await, Some(OutboundFrame::Close));
        assert!(hub.status().await.is_err());
    }
}
