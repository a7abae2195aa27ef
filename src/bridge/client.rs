/// Bridge client: serial frames -> hub over WebSocket
///
/// Owns the outbound link and drives `LinkStateMachine`. Serial events are
/// consumed in every state: while connecting, during a session and during
/// the reconnect wait. Frames are always parsed and normalized; they are only
/// sent while the link is Connected, and nothing is buffered for later.
use chrono::Utc;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
};

use crate::{
    config::BridgeConfig,
    errors::{RelayError, RelayResult},
    logger::{self, LogTag},
    store::{persist_in_background, HttpVitalsSink, VitalsSink},
    vitals,
    webserver::ws::WireMessage,
};

use super::link::LinkStateMachine;
use super::serial::SerialEvent;

/// What the bridge sends for each parsed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForwardMode {
    /// Normalized `vitalSigns`
    #[default]
    Vitals,
    /// Raw line as `serialData`; the hub normalizes and persists
    Raw,
}

impl FromStr for ForwardMode {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vitals" => Ok(ForwardMode::Vitals),
            "raw" => Ok(ForwardMode::Raw),
            other => Err(RelayError::Config(format!("unknown forward mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub hub_url: String,
    pub reconnect_delay: Duration,
    /// Upper bound for one connection attempt, handshake included
    pub connect_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub forward_mode: ForwardMode,
    pub persist_url: Option<String>,
    pub persist_timeout: Duration,
}

impl BridgeSettings {
    pub fn from_config(cfg: &BridgeConfig) -> RelayResult<Self> {
        Ok(Self {
            hub_url: cfg.hub_url.clone(),
            reconnect_delay: Duration::from_secs(cfg.reconnect_delay_secs),
            connect_timeout: Duration::from_secs(cfg.reconnect_delay_secs.max(1)),
            heartbeat_interval: Duration::from_secs(cfg.heartbeat_secs.max(1)),
            forward_mode: cfg.forward_mode.parse()?,
            persist_url: cfg.persist_url.clone(),
            persist_timeout: Duration::from_secs(cfg.persist_timeout_secs),
        })
    }
}

/// Counters reported when the bridge stops and at debug level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub frames_received: u64,
    pub frames_rejected: u64,
    pub frames_forwarded: u64,
    pub frames_skipped: u64,
    pub connect_attempts: u64,
    pub sessions: u64,
}

/// How a connected session ended
enum SessionEnd {
    LinkLost(String),
    SerialGone,
}

pub struct BridgeClient {
    settings: BridgeSettings,
    link: LinkStateMachine,
    serial_open: bool,
    sink: Option<Arc<dyn VitalsSink>>,
    stats: BridgeStats,
}

impl BridgeClient {
    /// Build the client; an HTTP sink is created when `persist_url` is set
    pub fn new(settings: BridgeSettings) -> RelayResult<Self> {
        let sink: Option<Arc<dyn VitalsSink>> = match &settings.persist_url {
            Some(url) => {
                let sink = HttpVitalsSink::new(url.clone(), settings.persist_timeout)?;
                logger::info(LogTag::Store, &format!("Persisting samples to {}", sink.url()));
                Some(Arc::new(sink))
            }
            None => None,
        };
        Ok(Self::with_sink(settings, sink))
    }

    pub fn with_sink(settings: BridgeSettings, sink: Option<Arc<dyn VitalsSink>>) -> Self {
        let link = LinkStateMachine::new(settings.reconnect_delay);
        Self {
            settings,
            link,
            serial_open: false,
            sink,
            stats: BridgeStats::default(),
        }
    }

    pub fn link(&self) -> &LinkStateMachine {
        &self.link
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn serial_open(&self) -> bool {
        self.serial_open
    }

    /// Apply one serial event; returns the message to send if the link is up
    pub fn on_serial_event(&mut self, event: SerialEvent) -> Option<WireMessage> {
        match event {
            SerialEvent::Opened => {
                logger::info(LogTag::Bridge, "Device streaming");
                self.set_serial_open(true)
            }
            SerialEvent::Closed(reason) => {
                logger::warning(LogTag::Bridge, &format!("Device lost: {}", reason));
                self.set_serial_open(false)
            }
            SerialEvent::Line(frame) => {
                self.stats.frames_received += 1;
                let Some(sample) = vitals::process_frame(&frame) else {
                    self.stats.frames_rejected += 1;
                    return None;
                };

                if self.settings.forward_mode == ForwardMode::Vitals {
                    if let Some(sink) = &self.sink {
                        persist_in_background(
                            sink.clone(),
                            sample.clone(),
                            self.settings.persist_timeout,
                        );
                    }
                }

                if !self.link.can_forward() {
                    self.stats.frames_skipped += 1;
                    logger::debug(
                        LogTag::Bridge,
                        &format!("Link {}, frame not forwarded", self.link.state()),
                    );
                    return None;
                }

                self.stats.frames_forwarded += 1;
                logger::debug(
                    LogTag::Bridge,
                    &format!(
                        "Forwarding frame {}ms after arrival",
                        (Utc::now() - frame.received_at).num_milliseconds()
                    ),
                );
                Some(match self.settings.forward_mode {
                    ForwardMode::Vitals => WireMessage::vital_signs(sample),
                    ForwardMode::Raw => WireMessage::serial_data(&frame.text),
                })
            }
        }
    }

    fn set_serial_open(&mut self, open: bool) -> Option<WireMessage> {
        self.serial_open = open;
        if self.link.can_forward() {
            Some(WireMessage::device_report(open))
        } else {
            None
        }
    }

    /// Run until the serial channel closes; reconnects to the hub forever
    pub async fn run(mut self, mut serial_rx: mpsc::Receiver<SerialEvent>) -> BridgeStats {
        logger::info(
            LogTag::Bridge,
            &format!(
                "Bridge starting: hub {}, forward mode {:?}, reconnect every {}s",
                self.settings.hub_url,
                self.settings.forward_mode,
                self.settings.reconnect_delay.as_secs()
            ),
        );

        self.link.begin_connect();
        loop {
            logger::debug(
                LogTag::Bridge,
                &format!("Connecting to {} (attempt {})", self.settings.hub_url, self.link.attempts()),
            );

            let connect = tokio::time::timeout(
                self.settings.connect_timeout,
                connect_async(self.settings.hub_url.clone()),
            );
            tokio::pin!(connect);
            let result = loop {
                tokio::select! {
                    result = &mut connect => break result,
                    event = serial_rx.recv() => match event {
                        Some(event) => { self.on_serial_event(event); }
                        None => return self.finish(),
                    }
                }
            };

            match result {
                Ok(Ok((stream, _))) => {
                    self.link.on_open();
                    logger::info(
                        LogTag::Bridge,
                        &format!("Connected to hub {}", self.settings.hub_url),
                    );
                    let (ws_tx, ws_rx) = stream.split();
                    match self.session(ws_tx, ws_rx, &mut serial_rx).await {
                        SessionEnd::SerialGone => return self.finish(),
                        SessionEnd::LinkLost(reason) => {
                            logger::warning(LogTag::Bridge, &format!("Link lost: {}", reason));
                        }
                    }
                }
                Ok(Err(e)) => {
                    logger::warning(
                        LogTag::Bridge,
                        &format!("Cannot reach hub {}: {}", self.settings.hub_url, e),
                    );
                }
                Err(_) => {
                    logger::warning(
                        LogTag::Bridge,
                        &format!(
                            "Hub {} did not answer within {}s",
                            self.settings.hub_url,
                            self.settings.connect_timeout.as_secs()
                        ),
                    );
                }
            }

            if let Some(delay) = self.link.on_lost() {
                logger::info(
                    LogTag::Bridge,
                    &format!("Reconnecting in {}s", delay.as_secs()),
                );
                let sleep = tokio::time::sleep(delay);
                tokio::pin!(sleep);
                loop {
                    tokio::select! {
                        _ = &mut sleep => break,
                        event = serial_rx.recv() => match event {
                            Some(event) => { self.on_serial_event(event); }
                            None => return self.finish(),
                        }
                    }
                }
            }
            self.link.on_reconnect_timer();
        }
    }

    /// One connected session; the heartbeat lives and dies with it
    ///
    /// When the serial side goes away the hub is told the device is gone and
    /// the link is closed.
    async fn session<Tx, Rx>(
        &mut self,
        mut ws_tx: Tx,
        mut ws_rx: Rx,
        serial_rx: &mut mpsc::Receiver<SerialEvent>,
    ) -> SessionEnd
    where
        Tx: Sink<Message> + Unpin,
        RelayError: From<Tx::Error>,
        Rx: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        let report = WireMessage::device_report(self.serial_open);
        if let Err(e) = send(&mut ws_tx, &report).await {
            return SessionEnd::LinkLost(e.to_string());
        }

        let period = self.settings.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let keepalive = WireMessage::device_report(self.serial_open);
                    if let Err(e) = send(&mut ws_tx, &keepalive).await {
                        return SessionEnd::LinkLost(e.to_string());
                    }
                    logger::debug(LogTag::Bridge, "Heartbeat sent");
                }
                event = serial_rx.recv() => {
                    let Some(event) = event else {
                        self.serial_open = false;
                        if let Err(e) = send(&mut ws_tx, &WireMessage::device_report(false)).await {
                            logger::debug(LogTag::Bridge, &format!("Final status not sent: {}", e));
                        }
                        let _ = ws_tx.send(Message::Close(None)).await;
                        return SessionEnd::SerialGone;
                    };
                    if let Some(message) = self.on_serial_event(event) {
                        if let Err(e) = send(&mut ws_tx, &message).await {
                            return SessionEnd::LinkLost(e.to_string());
                        }
                    }
                }
                incoming = ws_rx.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            logger::verbose(LogTag::Bridge, &format!("-> {}", text));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            return SessionEnd::LinkLost(format!("closed by hub ({:?})", frame));
                        }
                        // pings are answered by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return SessionEnd::LinkLost(e.to_string()),
                        None => return SessionEnd::LinkLost("stream ended".to_string()),
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> BridgeStats {
        self.stats.connect_attempts = self.link.attempts();
        self.stats.sessions = self.link.sessions();
        logger::info(
            LogTag::Bridge,
            &format!(
                "Bridge stopped: {} frames, {} rejected, {} forwarded, {} skipped, {} sessions in {} attempts",
                self.stats.frames_received,
                self.stats.frames_rejected,
                self.stats.frames_forwarded,
                self.stats.frames_skipped,
                self.stats.sessions,
                self.stats.connect_attempts
            ),
        );
        self.stats
    }
}

async fn send<S>(sink: &mut S, message: &WireMessage) -> RelayResult<()>
where
    S: Sink<Message> + Unpin,
    RelayError: From<S::Error>,
{
    let json = message.to_json()?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
