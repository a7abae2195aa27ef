/// HTTP + WebSocket front of the hub process
///
/// - `ws`: broadcast hub, liveness, per-connection tasks
/// - `routes`: `/`, `/ws` upgrades and the `/api` surface
/// - `server`: bind, serve, graceful shutdown
mod server;

pub mod routes;
pub mod state;
pub mod utils;
pub mod ws;


pub use server::{bind, build_app, serve, shutdown_signal};
pub use state::AppState;
