/// Axum server lifecycle: bind, serve, graceful shutdown
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::{
    errors::{RelayError, RelayResult},
    logger::{self, LogTag},
    webserver::{routes, state::AppState},
};

/// Bind the listener, with a readable message for the usual failures
///
/// `host` may be an IP literal or a name such as `localhost`.
pub async fn bind(host: &str, port: u16) -> RelayResult<TcpListener> {
    let addr = format!("{}:{}", host, port);

    TcpListener::bind((host, port)).await.map_err(|e| {
        let message = match e.kind() {
            std::io::ErrorKind::AddrInUse => format!(
                "Failed to bind to {}: Address already in use (another relay running?)",
                addr
            ),
            std::io::ErrorKind::PermissionDenied => format!(
                "Failed to bind to {}: Permission denied, use a port above 1024",
                addr
            ),
            _ => format!("Failed to bind to {}: {}", addr, e),
        };
        RelayError::Config(message)
    })
}

/// Build the Axum application with all routes and middleware
pub fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state).layer(CorsLayer::permissive())
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> RelayResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        logger::info(
            LogTag::Webserver,
            &format!("Listening on http://{} (WebSocket at / and /ws)", addr),
        );
    }

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    logger::info(LogTag::Webserver, "Webserver stopped gracefully");
    Ok(())
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => logger::info(LogTag::System, "Received Ctrl-C, shutting down"),
        Err(e) => {
            logger::error(
                LogTag::System,
                &format!("Failed to listen for Ctrl-C: {}", e),
            );
            std::future::pending::<()>().await;
        }
    }
}
