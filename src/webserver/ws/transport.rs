/// Peer transport abstraction
///
/// The hub never touches a socket. Each peer is reached through a
/// `PeerTransport`; the production one feeds a bounded queue drained by the
/// peer's connection task, tests plug in recording or failing transports.
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::errors::{RelayError, RelayResult};

/// Connection ID (unique per WebSocket connection)
pub type PeerId = u64;

/// What the hub can ask a connection task to put on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Serialized once per publish and shared across peers
    Text(Arc<str>),
    /// Liveness probe
    Ping,
    /// Ask the connection task to close the socket
    Close,
}

pub trait PeerTransport: Send + Sync {
    /// False once the connection task has gone away
    fn is_open(&self) -> bool;

    /// Non-blocking send; a full or closed queue is a transport fault
    fn send(&self, peer: PeerId, frame: OutboundFrame) -> RelayResult<()>;
}

/// Transport backed by the bounded queue of an axum connection task
pub struct ChannelTransport {
    tx: mpsc::Sender<OutboundFrame>,
}

impl ChannelTransport {
    /// Create the transport and the receiver the connection task drains
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        (Self { tx }, rx)
    }
}

impl PeerTransport for ChannelTransport {
    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, peer: PeerId, frame: OutboundFrame) -> RelayResult<()> {
        self.tx.try_send(frame).map_err(|e| {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "connection closed",
            };
            RelayError::Transport {
                peer,
                reason: reason.to_string(),
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records every frame; can be switched to fail or to report closed
    #[derive(Default)]
    pub struct RecordingTransport {
        pub frames: Mutex<Vec<OutboundFrame>>,
        pub failing: AtomicBool,
        pub closed: AtomicBool,
    }

    impl RecordingTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn failing() -> Arc<Self> {
            let transport = Self::default();
            transport.failing.store(true, Ordering::SeqCst);
            Arc::new(transport)
        }

        pub fn texts(&self) -> Vec<String> {
            self.frames
                .lock()
                .iter()
                .filter_map(|f| match f {
                    OutboundFrame::Text(text) => Some(text.to_string()),
                    _ => None,
                })
                .collect()
        }

        pub fn ping_count(&self) -> usize {
            self.frames
                .lock()
                .iter()
                .filter(|f| matches!(f, OutboundFrame::Ping))
                .count()
        }
    }

    impl PeerTransport for RecordingTransport {
        fn is_open(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }

        fn send(&self, peer: PeerId, frame: OutboundFrame) -> RelayResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(RelayError::Transport {
                    peer,
                    reason: "simulated failure".to_string(),
                });
            }
            self.frames.lock().push(frame);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_transport_full_queue_is_fault() {
        let (transport, mut rx) = ChannelTransport::new(1);
        assert!(transport.is_open());

        transport.send(1, OutboundFrame::Ping).unwrap();
        let err = transport.send(1, OutboundFrame::Ping).unwrap_err();
        assert!(matches!(err, RelayError::Transport { peer: 1, .. }));

        assert_eq!(rx.recv().await, Some(OutboundFrame::Ping));
    }

    #[test]
    fn test_channel_transport_closed_after_receiver_drop() {
        let (transport, rx) = ChannelTransport::new(4);
        drop(rx);
        assert!(!transport.is_open());
        assert!(transport.send(9, OutboundFrame::Close).is_err());
    }
}
