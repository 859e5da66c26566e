//! Players and their reconnect snapshots.

use std::collections::HashMap;

use bunker_protocol::{AttrKey, ClientId, ConnectionId, Hand};

/// One seated player.
///
/// `client_id` is the stable identity; `conn` changes on every transport
/// reconnect. `kicked` is one-way: once true it never reverts within the
/// room's lifetime.
#[derive(Debug, Clone)]
pub struct Player {
    pub client_id: ClientId,
    pub conn: ConnectionId,
    pub nick: String,
    pub seat: u32,
    /// Dealt at game start; empty before that.
    pub hand: Hand,
    /// The one attribute that can never be forcibly revealed.
    pub hidden_key: Option<AttrKey>,
    pub revealed: HashMap<AttrKey, String>,
    /// Reveal order, for the client's "opened" markers.
    pub revealed_keys: Vec<AttrKey>,
    pub kicked: bool,
}

impl Player {
    /// Creates a fresh player at the given seat (pre-game join).
    pub fn new(client_id: ClientId, conn: ConnectionId, nick: String, seat: u32) -> Self {
        Self {
            client_id,
            conn,
            nick,
            seat,
            hand: Hand::default(),
            hidden_key: None,
            revealed: HashMap::new(),
            revealed_keys: Vec::new(),
            kicked: false,
        }
    }

    /// Returns `true` if this attribute has already been revealed.
    pub fn has_revealed(&self, key: AttrKey) -> bool {
        self.revealed_keys.contains(&key)
    }

    /// Captures everything that must survive a disconnect.
    ///
    /// The field set is explicit so the live and pooled representations
    /// cannot silently drift apart.
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            client_id: self.client_id.clone(),
            nick: self.nick.clone(),
            seat: self.seat,
            hand: self.hand.clone(),
            hidden_key: self.hidden_key,
            revealed: self.revealed.clone(),
            revealed_keys: self.revealed_keys.clone(),
            kicked: self.kicked,
        }
    }
}

/// A disconnected player's state, parked for the reconnect grace window.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub client_id: ClientId,
    pub nick: String,
    pub seat: u32,
    pub hand: Hand,
    pub hidden_key: Option<AttrKey>,
    pub revealed: HashMap<AttrKey, String>,
    pub revealed_keys: Vec<AttrKey>,
    pub kicked: bool,
}

impl PlayerSnapshot {
    /// Rebuilds a live player on a new connection.
    pub fn restore(self, conn: ConnectionId) -> Player {
        Player {
            client_id: self.client_id,
            conn,
            nick: self.nick,
            seat: self.seat,
            hand: self.hand,
            hidden_key: self.hidden_key,
            revealed: self.revealed,
            revealed_keys: self.revealed_keys,
            kicked: self.kicked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_player() -> Player {
        let mut p = Player::new(
            ClientId::from("c1"),
            ConnectionId::new(1),
            "ann".into(),
            3,
        );
        p.hand.0.insert(AttrKey::Profession, "medic".into());
        p.hidden_key = Some(AttrKey::Phobia);
        p.revealed.insert(AttrKey::Profession, "medic".into());
        p.revealed_keys.push(AttrKey::Profession);
        p
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let p = sample_player();
        let restored = p.snapshot().restore(ConnectionId::new(99));

        assert_eq!(restored.client_id, p.client_id);
        assert_eq!(restored.seat, p.seat);
        assert_eq!(restored.hand, p.hand);
        assert_eq!(restored.hidden_key, p.hidden_key);
        assert_eq!(restored.revealed_keys, p.revealed_keys);
        assert_eq!(restored.kicked, p.kicked);
        // Only the connection id is new.
        assert_eq!(restored.conn, ConnectionId::new(99));
    }

    #[test]
    fn test_snapshot_preserves_kicked_flag() {
        let mut p = sample_player();
        p.kicked = true;
        let restored = p.snapshot().restore(ConnectionId::new(2));
        assert!(restored.kicked);
    }
}
