use clap::Parser;
use std::time::Duration;
use tokio::sync::mpsc;

use vitalsrelay::{
    arguments,
    bridge::{spawn_serial_reader, BridgeClient, BridgeSettings, SerialSettings},
    config,
    logger::{self, LogTag},
    webserver::shutdown_signal,
};

const FINAL_STATUS_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Parser)]
#[command(name = "vitals_bridge")]
#[command(about = "Forward pulse-oximeter serial frames to a vitals relay hub", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = config::CONFIG_FILE_PATH)]
    config: String,

    /// Serial device path ("-" reads stdin)
    #[arg(short, long)]
    serial: Option<String>,

    /// Hub WebSocket URL
    #[arg(long)]
    hub_url: Option<String>,

    /// Forward mode: vitals or raw
    #[arg(long)]
    mode: Option<String>,

    /// POST each sample to this URL (e.g. http://hub:8080/api/vitals)
    #[arg(long)]
    persist_url: Option<String>,

    /// Logger flags after `--`, e.g. `-- --debug-bridge --debug-serial`
    #[arg(last = true)]
    logger_flags: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut flags = vec!["vitals_bridge".to_string()];
    flags.extend(args.logger_flags.iter().cloned());
    arguments::set_cmd_args(flags);
    logger::init();

    config::load_config_from_path(&args.config)?;
    let mut full = config::get_config_clone();
    if let Some(serial) = args.serial {
        full.bridge.serial_path = serial;
    }
    if let Some(url) = args.hub_url {
        full.bridge.hub_url = url;
    }
    if let Some(mode) = args.mode {
        full.bridge.forward_mode = mode;
    }
    if args.persist_url.is_some() {
        full.bridge.persist_url = args.persist_url;
    }
    config::validate(&full)?;
    let cfg = full.bridge;

    let settings = BridgeSettings::from_config(&cfg)?;
    let client = BridgeClient::new(settings)?;

    let (serial_tx, serial_rx) = mpsc::channel(256);
    let reader = spawn_serial_reader(SerialSettings::from_config(&cfg), serial_tx);

    let run = client.run(serial_rx);
    tokio::pin!(run);

    tokio::select! {
        stats = &mut run => {
            logger::info(LogTag::System, &format!("Bridge finished: {:?}", stats));
        }
        _ = shutdown_signal() => {
            logger::info(LogTag::System, "Bridge interrupted, releasing serial device");
            // dropping the reader closes the serial channel; the client then
            // reports the device gone and closes the link
            reader.abort();
            match tokio::time::timeout(FINAL_STATUS_TIMEOUT, &mut run).await {
                Ok(stats) => {
                    logger::info(LogTag::System, &format!("Bridge finished: {:?}", stats));
                }
                Err(_) => {
                    logger::warning(LogTag::System, "Hub link did not close in time");
                }
            }
        }
    }

    reader.abort();
    logger::flush();
    Ok(())
}
