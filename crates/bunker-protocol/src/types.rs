//! Identity types shared across the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The stable identity of a player.
///
/// Supplied by the client on join and kept for the lifetime of the room —
/// it survives transport reconnects, unlike [`ConnectionId`]. Newtype over
/// `String` so a client id can't be confused with a nickname or a room
/// code in a signature.
///
/// `#[serde(transparent)]` keeps the wire form a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Alphabet for room codes: uppercase plus digits, with the easily
/// confused characters (I, O, 0, 1) removed.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A short join code identifying one room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Generates a random 4-character code.
    ///
    /// Uniqueness is the registry's job — it regenerates on collision.
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let code: String = (0..4)
            .map(|_| {
                let idx = rng.random_range(0..CODE_ALPHABET.len());
                CODE_ALPHABET[idx] as char
            })
            .collect();
        Self(code)
    }

    /// Borrows the raw code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque identifier for one transport connection.
///
/// A player gets a fresh one every time their socket reconnects; the
/// stable identity is [`ClientId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Specifies who should receive a server event.
///
/// The core returns `(Recipient, ServerEvent)` pairs; the room actor
/// resolves them against its connection table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every connected player in the room.
    All,
    /// One specific player (e.g. a private hand snapshot).
    Player(ClientId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ClientId::from("abc-123")).unwrap();
        assert_eq!(json, "\"abc-123\"");
    }

    #[test]
    fn test_client_id_deserializes_from_plain_string() {
        let cid: ClientId = serde_json::from_str("\"abc-123\"").unwrap();
        assert_eq!(cid, ClientId::from("abc-123"));
    }

    #[test]
    fn test_room_code_generate_shape() {
        let code = RoomCode::generate();
        assert_eq!(code.as_str().len(), 4);
        for c in code.as_str().bytes() {
            assert!(
                CODE_ALPHABET.contains(&c),
                "unexpected character {} in room code",
                c as char
            );
        }
    }

    #[test]
    fn test_room_code_alphabet_skips_ambiguous_chars() {
        for banned in [b'I', b'O', b'0', b'1'] {
            assert!(!CODE_ALPHABET.contains(&banned));
        }
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_client_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ClientId::from("a"), 1);
        map.insert(ClientId::from("b"), 2);
        assert_eq!(map[&ClientId::from("a")], 1);
    }
}
