use std::sync::Arc;

use vitalsrelay::{
    arguments::{patterns, print_debug_info, print_help},
    config,
    logger::{self, LogTag},
    store::{SqliteVitalsStore, VitalsSink},
    webserver::{self, ws::HubSettings, AppState},
};

/// Hub process entry point
///
/// Loads configuration, opens the store, starts the dispatch loop and serves
/// HTTP + WebSocket until Ctrl-C. Only startup errors end the process.
#[tokio::main]
async fn main() {
    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "vitalsrelay starting up");
    print_debug_info();

    if let Err(e) = run().await {
        logger::error(LogTag::System, &format!("Fatal: {:#}", e));
        logger::flush();
        std::process::exit(1);
    }

    logger::flush();
}

async fn run() -> anyhow::Result<()> {
    let config_path =
        patterns::get_config_path().unwrap_or_else(|| config::CONFIG_FILE_PATH.to_string());
    config::load_config_from_path(&config_path)?;
    let cfg = config::get_config_clone();

    let port = patterns::get_port().unwrap_or(cfg.hub.port);
    let settings = HubSettings::from_config(&cfg.hub)?;

    let store: Option<Arc<dyn VitalsSink>> = if cfg.store.enabled {
        Some(Arc::new(SqliteVitalsStore::open(&cfg.store.path)?))
    } else {
        logger::warning(LogTag::Store, "Persistence disabled, samples are relay-only");
        None
    };

    let listener = webserver::bind(&cfg.hub.host, port).await?;
    let (hub, hub_task) = webserver::ws::spawn_hub(settings, store.clone());
    let state = Arc::new(AppState::new(hub.clone(), store));

    // closing the peers first lets the connection tasks finish
    let closer = hub.clone();
    let shutdown = async move {
        webserver::shutdown_signal().await;
        closer.shutdown();
    };
    webserver::serve(listener, state, shutdown).await?;

    let _ = hub_task.await;
    logger::info(LogTag::System, "vitalsrelay stopped");
    Ok(())
}
