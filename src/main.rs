//! Shared-store server binary.
//!
//! Configuration comes from the environment:
//! - `TEAMSYNC_PORT`: listen port (default 3001).
//! - `TEAMSYNC_DATA_DIR`: where `data.json` and `server-config.json` live
//!   (default: the platform data dir under `teamsync/server`).

use std::net::SocketAddr;
use std::path::PathBuf;

use teamsync::server::{router, SharedStore};
use teamsync::store::default_data_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let port: u16 = std::env::var("TEAMSYNC_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let data_dir = std::env::var("TEAMSYNC_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_data_dir().join("server"));

    let store = SharedStore::open(&data_dir)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("teamsync server listening on http://{}", addr);
    axum::serve(listener, router(store)).await?;
    Ok(())
}
