//! Error types for the room layer.

use bunker_protocol::RoomCode;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room refused the join; the reason was already delivered to
    /// the client as an error event.
    #[error("join to room {0} rejected")]
    JoinRejected(RoomCode),

    /// The room's command channel is closed or full.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
