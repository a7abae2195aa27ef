/// Serial line source
///
/// Reads the sensor line by line and reports `Opened`, `Line` and `Closed`
/// events over a channel. After a failed open or a lost device it waits and
/// reopens, forever.
///
/// The path picks the source: `-` is stdin, a regular file is replayed as a
/// capture, anything else is opened as a serial port at the configured baud
/// rate (8N1, no flow control).
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};

use crate::config::BridgeConfig;
use crate::logger::{self, LogTag};
use crate::vitals::RawFrame;

/// Path that selects standard input
pub const STDIN_PATH: &str = "-";

#[derive(Debug, Clone, PartialEq)]
pub enum SerialEvent {
    Opened,
    Line(RawFrame),
    Closed(String),
}

#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub path: String,
    pub baud_rate: u32,
    pub reopen_delay: Duration,
}

impl SerialSettings {
    pub fn from_config(cfg: &BridgeConfig) -> Self {
        Self {
            path: cfg.serial_path.clone(),
            baud_rate: cfg.baud_rate,
            reopen_delay: Duration::from_secs(cfg.serial_reopen_delay_secs),
        }
    }
}

/// Where lines come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Stdin,
    Capture,
    Port,
}

impl SourceKind {
    pub async fn for_path(path: &str) -> Self {
        if path == STDIN_PATH {
            return SourceKind::Stdin;
        }
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => SourceKind::Capture,
            _ => SourceKind::Port,
        }
    }
}

type LineSource = Box<dyn AsyncRead + Unpin + Send>;

async fn open_source(settings: &SerialSettings) -> Result<(SourceKind, LineSource), String> {
    let kind = SourceKind::for_path(&settings.path).await;
    let source: LineSource = match kind {
        SourceKind::Stdin => Box::new(tokio::io::stdin()),
        SourceKind::Capture => Box::new(
            tokio::fs::File::open(&settings.path)
                .await
                .map_err(|e| e.to_string())?,
        ),
        SourceKind::Port => Box::new(
            tokio_serial::new(settings.path.as_str(), settings.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .open_native_async()
                .map_err(|e| e.to_string())?,
        ),
    };
    Ok((kind, source))
}

/// Why a read loop ended
#[derive(Debug, PartialEq)]
enum ReadEnd {
    Eof,
    Error(String),
    ReceiverGone,
}

pub fn spawn_serial_reader(
    settings: SerialSettings,
    tx: mpsc::Sender<SerialEvent>,
) -> JoinHandle<()> {
    tokio::spawn(run_reader(settings, tx))
}

async fn run_reader(settings: SerialSettings, tx: mpsc::Sender<SerialEvent>) {
    logger::info(
        LogTag::Serial,
        &format!(
            "Serial source {} ({} baud when it is a port)",
            settings.path, settings.baud_rate
        ),
    );

    let mut failures: u64 = 0;
    loop {
        let (kind, reader) = match open_source(&settings).await {
            Ok(opened) => opened,
            Err(e) => {
                failures += 1;
                // one warning per outage, the rest at debug
                if failures == 1 {
                    logger::warning(
                        LogTag::Serial,
                        &format!("Cannot open {}: {}", settings.path, e),
                    );
                } else {
                    logger::debug(
                        LogTag::Serial,
                        &format!("Open attempt {} failed: {}", failures, e),
                    );
                }
                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(settings.reopen_delay).await;
                continue;
            }
        };

        failures = 0;
        logger::info(
            LogTag::Serial,
            &format!("Opened {} ({:?})", settings.path, kind),
        );
        if tx.send(SerialEvent::Opened).await.is_err() {
            return;
        }

        let reason = match read_lines(reader, &tx).await {
            ReadEnd::ReceiverGone => return,
            ReadEnd::Eof => "end of stream".to_string(),
            ReadEnd::Error(e) => e,
        };

        logger::warning(
            LogTag::Serial,
            &format!("Serial source closed: {}", reason),
        );
        if tx.send(SerialEvent::Closed(reason)).await.is_err() {
            return;
        }

        if kind == SourceKind::Stdin {
            return;
        }
        tokio::time::sleep(settings.reopen_delay).await;
    }
}

/// Forward each non-empty line (CR stripped) until EOF or error
async fn read_lines<R>(reader: R, tx: &mpsc::Sender<SerialEvent>) -> ReadEnd
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end_matches('\r');
                if line.trim().is_empty() {
                    continue;
                }
                logger::verbose(LogTag::Serial, &format!("<- {}", line));
                if tx.send(SerialEvent::Line(RawFrame::new(line))).await.is_err() {
                    return ReadEnd::ReceiverGone;
                }
            }
            Ok(None) => return ReadEnd::Eof,
            Err(e) => return ReadEnd::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn texts(events: &[SerialEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                SerialEvent::Line(frame) => Some(frame.text.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_read_lines_strips_cr_and_blank_lines() {
        let input: &[u8] = b"No finger detected\r\n\r\nOxygen % = 98%, BPM = 70, Avg BPM = 70\r\n";
        let (tx, mut rx) = mpsc::channel(8);

        assert_eq!(read_lines(input, &tx).await, ReadEnd::Eof);
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            texts(&events),
            vec![
                "No finger detected".to_string(),
                "Oxygen % = 98%, BPM = 70, Avg BPM = 70".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_read_lines_stops_when_receiver_dropped() {
        let input: &[u8] = b"a\nb\n";
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert_eq!(read_lines(input, &tx).await, ReadEnd::ReceiverGone);
    }

    #[tokio::test]
    async fn test_reader_reports_open_lines_and_close() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Oxygen % = 97%, BPM = 64, Avg BPM = 63\r").unwrap();
        file.flush().unwrap();

        let settings = SerialSettings {
            path: file.path().to_string_lossy().to_string(),
            baud_rate: 115200,
            reopen_delay: Duration::from_secs(60),
        };
        let (tx, mut rx) = mpsc::channel(8);
        let task = spawn_serial_reader(settings, tx);

        assert_eq!(rx.recv().await, Some(SerialEvent::Opened));
        match rx.recv().await {
            Some(SerialEvent::Line(frame)) => {
                assert_eq!(frame.text, "Oxygen % = 97%, BPM = 64, Avg BPM = 63")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            rx.recv().await,
            Some(SerialEvent::Closed("end of stream".to_string()))
        );
        task.abort();
    }

    #[tokio::test]
    async fn test_missing_device_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttyUSB9");
        let settings = SerialSettings {
            path: path.to_string_lossy().to_string(),
            baud_rate: 115200,
            reopen_delay: Duration::from_millis(50),
        };
        let (tx, mut rx) = mpsc::channel(8);
        let task = spawn_serial_reader(settings, tx);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());

        std::fs::write(&path, "Oxygen % = 99%, BPM = 60, Avg BPM = 60\n").unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(SerialEvent::Opened));
        task.abort();
    }

    #[tokio::test]
    async fn test_source_kind_for_path() {
        let capture = tempfile::NamedTempFile::new().unwrap();
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(SourceKind::for_path("-").await, SourceKind::Stdin);
        assert_eq!(
            SourceKind::for_path(&capture.path().to_string_lossy()).await,
            SourceKind::Capture
        );
        assert_eq!(
            SourceKind::for_path(&dir.path().join("ttyACM0").to_string_lossy()).await,
            SourceKind::Port
        );
    }

    #[tokio::test]
    async fn test_missing_port_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SerialSettings {
            path: dir.path().join("ttyACM0").to_string_lossy().to_string(),
            baud_rate: 115200,
            reopen_delay: Duration::from_secs(5),
        };
        match open_source(&settings).await {
            Err(reason) => assert!(!reason.is_empty()),
            Ok((kind, _)) => panic!("opened {:?}", kind),
        }
    }
}
