use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use std::error::Error;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser)]
#[command(name = "debug_ws_listen")]
#[command(about = "Tail a vitals relay hub's WebSocket stream", long_about = None)]
struct Args {
    /// Hub WebSocket URL
    #[arg(short, long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Stop after this many messages (0 = forever)
    #[arg(short, long, default_value = "0")]
    limit: usize,

    /// Send a deviceStatus report with this value after connecting
    #[arg(long)]
    announce: Option<bool>,

    /// Show ping frames
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    println!("Connecting to {}", args.url);
    let (stream, _) = connect_async(args.url.as_str()).await?;
    let (mut tx, mut rx) = stream.split();
    println!("Connected\n{}", "=".repeat(80));

    if let Some(connected) = args.announce {
        let report = serde_json::json!({
            "type": "deviceStatus",
            "status": if connected { "connected" } else { "disconnected" },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        tx.send(Message::Text(report.to_string())).await?;
        println!("-> {}", report);
    }

    let mut seen = 0usize;
    while let Some(frame) = rx.next().await {
        let now = chrono::Utc::now().format("%H:%M:%S%.3f");
        match frame? {
            Message::Text(text) => {
                seen += 1;
                let kind = serde_json::from_str::<serde_json::Value>(&text)
                    .ok()
                    .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(String::from))
                    .unwrap_or_else(|| "?".to_string());
                println!("{} [{}] {}", now, kind, text);
            }
            Message::Ping(_) if args.verbose => println!("{} [ping]", now),
            Message::Close(frame) => {
                println!("{} closed by hub: {:?}", now, frame);
                break;
            }
            _ => {}
        }
        if args.limit > 0 && seen >= args.limit {
            break;
        }
    }

    println!("\n{}", "=".repeat(80));
    println!("Received {} messages", seen);
    Ok(())
}
