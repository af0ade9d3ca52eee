//! `MatchforgeServer` builder and accept loop.
//!
//! This is the entry point for running a matchmaker. It ties together all
//! the layers: transport → protocol → coordinator → matchmaker.

use matchforge_protocol::JsonCodec;
use matchforge_room::RoomConfig;
use matchforge_session::SessionConfig;
use matchforge_transport::{Transport, WebSocketTransport};

use crate::MatchforgeError;
use crate::coordinator::{self, CoordinatorHandle};
use crate::handler::handle_connection;

/// Builder for configuring and starting a Matchforge server.
///
/// # Example
///
/// ```rust,no_run
/// use matchforge::prelude::*;
///
/// # async fn start() -> Result<(), MatchforgeError> {
/// let server = MatchforgeServer::builder()
///     .bind("0.0.0.0:8080")
///     .path("/matchmaker")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct MatchforgeServerBuilder {
    bind_addr: String,
    path: Option<String>,
    room_config: RoomConfig,
    session_config: SessionConfig,
}

impl MatchforgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            path: None,
            room_config: RoomConfig::default(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Only accepts WebSocket upgrades on this URL path.
    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Sets room capacities, id length, and lifecycle delays.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the limits applied to names, relayed messages, and connection
    /// liveness.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Binds the listener and starts the coordinator task.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<MatchforgeServer, MatchforgeError> {
        let mut transport = WebSocketTransport::bind(&self.bind_addr).await?;
        if let Some(path) = self.path {
            transport = transport.with_path(path);
        }

        let session = self.session_config.validated();
        let coordinator = coordinator::spawn(self.room_config.validated(), session.clone());

        Ok(MatchforgeServer {
            transport,
            coordinator,
            codec: JsonCodec,
            session,
        })
    }
}

impl Default for MatchforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Matchforge server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct MatchforgeServer {
    transport: WebSocketTransport,
    coordinator: CoordinatorHandle,
    codec: JsonCodec,
    session: SessionConfig,
}

impl MatchforgeServer {
    /// Creates a new builder.
    pub fn builder() -> MatchforgeServerBuilder {
        MatchforgeServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle for querying the coordinator (e.g. for a health endpoint).
    pub fn handle(&self) -> CoordinatorHandle {
        self.coordinator.clone()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming sockets and spawns a handler task for each. The
    /// WebSocket upgrade runs on that task, never on this loop.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), MatchforgeError> {
        tracing::info!("matchforge server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let coordinator = self.coordinator.clone();
                    let codec = self.codec;
                    let session = self.session.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(pending, coordinator, codec, session).await
                        {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
