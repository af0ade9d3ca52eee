//! Standalone matchmaker.
//!
//! Environment:
//! - `MATCHFORGE_BIND`: listen address (default `127.0.0.1:8080`)
//! - `MATCHFORGE_PATH`: WebSocket path (default `/matchmaker`)
//! - `RUST_LOG`: log filter (default `info`)

use matchforge::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), MatchforgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind = std::env::var("MATCHFORGE_BIND").unwrap_or_else(|_| "127.0.0.1:8080".into());
    let path = std::env::var("MATCHFORGE_PATH").unwrap_or_else(|_| "/matchmaker".into());

    let server = MatchforgeServer::builder()
        .bind(&bind)
        .path(&path)
        .build()
        .await?;

    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, %path, "matchmaker listening");
    }
    server.run().await
}
