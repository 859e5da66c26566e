//! The accept loop: one WebSocket connection per task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bunker_protocol::ConnectionId;
use bunker_room::{DEFAULT_MAX_PLAYERS, RoomRegistry};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::ServerError;
use crate::handler::handle_connection;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A running bunker game server.
pub struct BunkerServer {
    listener: TcpListener,
    registry: Arc<RoomRegistry>,
}

impl BunkerServer {
    /// Binds the server to `addr`.
    pub async fn bind(addr: &str) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr, "bunker server listening");
        Ok(Self {
            listener,
            registry: RoomRegistry::new(DEFAULT_MAX_PLAYERS),
        })
    }

    /// The local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let ws = match tokio_tungstenite::accept_async(stream).await {
                        Ok(ws) => ws,
                        Err(e) => {
                            debug!(%peer, error = %e, "websocket handshake failed");
                            continue;
                        }
                    };
                    let conn = ConnectionId::new(
                        NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
                    );
                    debug!(%conn, %peer, "connection accepted");

                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(ws, conn, registry).await {
                            debug!(%conn, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                }
            }
        }
    }
}
