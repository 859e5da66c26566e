//! Error types for the server layer.

/// Errors that can occur while accepting or serving connections.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding or accepting a TCP connection failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The WebSocket transport failed mid-session.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
