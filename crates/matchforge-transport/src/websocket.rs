//! [`Transport`] over WebSockets, on `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::{Connection, ConnectionId, Received, Transport, TransportError, Upgrade};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// Listens for WebSocket clients.
///
/// With a path set, upgrades for any other path get `404` and
/// [`WebSocketUpgrade::upgrade`] reports [`TransportError::UpgradeRejected`].
pub struct WebSocketTransport {
    listener: TcpListener,
    path: Option<String>,
}

impl WebSocketTransport {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "websocket listener bound");
        Ok(Self {
            listener,
            path: None,
        })
    }

    /// Only upgrade requests for `path` (e.g. `/matchmaker`).
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Upgrade = WebSocketUpgrade;
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<WebSocketUpgrade, TransportError> {
        let (tcp, peer) = self.listener.accept().await.map_err(TransportError::Accept)?;
        tracing::trace!(%peer, "tcp accepted");
        Ok(WebSocketUpgrade {
            tcp,
            peer,
            path: self.path.clone(),
        })
    }
}

/// A TCP client that has not sent its upgrade request yet.
pub struct WebSocketUpgrade {
    tcp: TcpStream,
    peer: SocketAddr,
    path: Option<String>,
}

impl Upgrade for WebSocketUpgrade {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let Self { tcp, peer, path } = self;

        let wanted = path.as_deref();
        let route = |req: &Request, resp: Response| match wanted {
            Some(path) if req.uri().path() != path => {
                let body = format!("no endpoint at {}", req.uri().path());
                let mut not_found = ErrorResponse::new(Some(body));
                *not_found.status_mut() = StatusCode::NOT_FOUND;
                Err(not_found)
            }
            _ => Ok(resp),
        };

        let ws = tokio_tungstenite::accept_hdr_async(tcp, route)
            .await
            .map_err(|e| TransportError::UpgradeRejected(format!("{peer}: {e}")))?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(connection_id = %id, %peer, "websocket upgraded");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// An upgraded client socket.
///
/// Read and write halves are locked separately, so a writer task can push
/// frames while the reader is parked in [`Connection::recv`].
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    fn send_error(&self, e: impl std::fmt::Display) -> TransportError {
        TransportError::Send {
            connection_id: self.id,
            reason: e.to_string(),
        }
    }

    async fn write(&self, frame: Message) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(frame)
            .await
            .map_err(|e| self.send_error(e))
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.write(Message::Text(text.to_string().into())).await
    }

    async fn recv(&self) -> Result<Option<Received>, TransportError> {
        let mut stream = self.stream.lock().await;
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    return Ok(Some(Received::Data(text.as_bytes().to_vec())));
                }
                Ok(Message::Binary(data)) => return Ok(Some(Received::Data(data.to_vec()))),
                // tungstenite queues the pong for a ping itself
                Ok(Message::Ping(_) | Message::Pong(_)) => return Ok(Some(Received::Heartbeat)),
                Ok(Message::Close(_)) => return Ok(None),
                Ok(Message::Frame(_)) => {}
                Err(e) => {
                    return Err(TransportError::Receive {
                        connection_id: self.id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(None)
    }

    async fn ping(&self) -> Result<(), TransportError> {
        self.write(Message::Ping(Default::default())).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| self.send_error(e))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
