/// WebSocket connection handler
///
/// One task per socket. It registers a `ChannelTransport` with the hub, then
/// pumps frames both ways until either side closes:
/// - hub queue -> socket (text, ping probes, close)
/// - socket -> hub (text messages, pong acknowledgments)
///
/// On exit it always tells the hub to drop the peer; the hub treats a second
/// removal (e.g. after a liveness eviction) as a no-op.
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::logger::{self, LogTag};

use super::dispatch::HubHandle;
use super::transport::{ChannelTransport, OutboundFrame};

/// Handle a WebSocket connection
pub async fn handle_connection(socket: WebSocket, hub: HubHandle) {
    let (transport, mut hub_rx) = ChannelTransport::new(hub.peer_buffer_size());

    let peer = match hub.connect(Arc::new(transport)).await {
        Ok(peer) => peer,
        Err(e) => {
            logger::warning(LogTag::Webserver, &format!("Rejecting connection: {}", e));
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();

    logger::debug(LogTag::Webserver, &format!("Connection {} started", peer));

    loop {
        tokio::select! {
            biased;

            outbound = hub_rx.recv() => {
                let message = match outbound {
                    Some(OutboundFrame::Text(text)) => Message::Text(text.to_string()),
                    Some(OutboundFrame::Ping) => Message::Ping(Vec::new()),
                    Some(OutboundFrame::Close) | None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                };
                if let Err(e) = ws_tx.send(message).await {
                    logger::debug(
                        LogTag::Webserver,
                        &format!("Connection {}: send failed: {}", peer, e),
                    );
                    break;
                }
            }

            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => hub.message(peer, text),
                    Some(Ok(Message::Pong(_))) => hub.pong(peer),
                    Some(Ok(Message::Binary(_))) => {
                        logger::debug(
                            LogTag::Webserver,
                            &format!("Connection {}: binary frame ignored", peer),
                        );
                    }
                    // axum answers pings itself
                    Some(Ok(Message::Ping(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        logger::debug(
                            LogTag::Webserver,
                            &format!("Connection {}: client closed", peer),
                        );
                        break;
                    }
                    Some(Err(e)) => {
                        logger::debug(
                            LogTag::Webserver,
                            &format!("Connection {}: websocket error: {}", peer, e),
                        );
                        break;
                    }
                }
            }
        }
    }

    hub.disconnect(peer);
    logger::debug(LogTag::Webserver, &format!("Connection {} closed", peer));
}
