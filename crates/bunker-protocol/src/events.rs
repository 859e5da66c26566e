//! Game events: everything that travels between client and core.
//!
//! Both directions use internally tagged JSON (`{"type": "...", ...}`)
//! with camelCase field names, so the payloads match what a browser
//! client works with natively.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{AttrKey, ClientId, RoomCode};

// ---------------------------------------------------------------------------
// Hand
// ---------------------------------------------------------------------------

/// A player's full dealt hand: ten core attributes plus two abilities.
///
/// Kept as a map keyed by [`AttrKey`] — the key enum serializes to its
/// wire name, so the JSON form is a plain object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hand(pub HashMap<AttrKey, String>);

impl Hand {
    /// Looks up the value of one attribute.
    pub fn get(&self, key: AttrKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Inbound: client → core
// ---------------------------------------------------------------------------

/// Everything a client can ask the core to do.
///
/// Every variant names its room — the server routes on `roomId` and the
/// room actor is the unit of serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join (or rejoin) a room. Idempotent per `clientId`.
    #[serde(rename_all = "camelCase")]
    Join {
        room_id: RoomCode,
        nick: String,
        client_id: ClientId,
    },

    /// Leave the room explicitly (as opposed to a transport drop).
    #[serde(rename_all = "camelCase")]
    Leave { room_id: RoomCode },

    /// Host starts the game: deal hands, generate bunker, first turn.
    #[serde(rename_all = "camelCase")]
    StartGame { room_id: RoomCode },

    /// Reveal the next core attribute in the fixed order.
    #[serde(rename_all = "camelCase")]
    RevealNext { room_id: RoomCode },

    /// Reveal one specific attribute.
    #[serde(rename_all = "camelCase")]
    RevealKey { room_id: RoomCode, key: AttrKey },

    /// Vote for (or retract a vote for) skipping the current turn.
    #[serde(rename_all = "camelCase")]
    VoteSkip { room_id: RoomCode, vote: bool },

    /// Host forces the skip without waiting for the threshold.
    #[serde(rename_all = "camelCase")]
    ForceSkip { room_id: RoomCode },

    /// Hand the turn to the next player.
    #[serde(rename_all = "camelCase")]
    NextTurn { room_id: RoomCode },

    /// Host force-assigns the turn to a specific player.
    #[serde(rename_all = "camelCase")]
    ForceTurn {
        room_id: RoomCode,
        player_id: ClientId,
    },

    /// Host starts the elimination vote manually.
    #[serde(rename_all = "camelCase")]
    StartVote { room_id: RoomCode },

    /// Cast a ballot vote against `targetId`.
    #[serde(rename_all = "camelCase")]
    CastVote {
        room_id: RoomCode,
        target_id: ClientId,
    },

    /// Host closes the ballot before its deadline.
    #[serde(rename_all = "camelCase")]
    ForceCloseVote { room_id: RoomCode },

    /// The current speaker yields the rest of their speech window.
    #[serde(rename_all = "camelCase")]
    FinishSpeech { room_id: RoomCode },

    /// Host toggles the reveal-all preview of every hand.
    #[serde(rename_all = "camelCase")]
    SetRevealAll { room_id: RoomCode, on: bool },

    /// Request a full resync: private hand, game state, vote state.
    #[serde(rename_all = "camelCase")]
    Sync { room_id: RoomCode },
}

impl ClientEvent {
    /// The room this event addresses; the server routes on this.
    pub fn room_id(&self) -> &RoomCode {
        match self {
            ClientEvent::Join { room_id, .. }
            | ClientEvent::Leave { room_id }
            | ClientEvent::StartGame { room_id }
            | ClientEvent::RevealNext { room_id }
            | ClientEvent::RevealKey { room_id, .. }
            | ClientEvent::VoteSkip { room_id, .. }
            | ClientEvent::ForceSkip { room_id }
            | ClientEvent::NextTurn { room_id }
            | ClientEvent::ForceTurn { room_id, .. }
            | ClientEvent::StartVote { room_id }
            | ClientEvent::CastVote { room_id, .. }
            | ClientEvent::ForceCloseVote { room_id }
            | ClientEvent::FinishSpeech { room_id }
            | ClientEvent::SetRevealAll { room_id, .. }
            | ClientEvent::Sync { room_id } => room_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound payload pieces
// ---------------------------------------------------------------------------

/// A player as everyone else sees them: only revealed attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayer {
    pub id: ClientId,
    pub nick: String,
    pub seat: u32,
    pub kicked: bool,
    pub revealed: HashMap<AttrKey, String>,
}

/// Seat-level presence entry (lobby and room-state payloads).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePlayer {
    pub id: ClientId,
    pub nick: String,
    pub seat: u32,
}

/// The scarce resource the game converges on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BunkerInfo {
    /// How many survivors fit. The game ends when active players ≤ this.
    pub places: u32,
    pub description: String,
}

/// Flavor text for the disaster scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CataclysmInfo {
    pub title: String,
    pub description: String,
}

/// Round progress: number, quota, per-player reveal counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundPayload {
    pub number: u32,
    pub quota: u32,
    pub revealed_by: HashMap<ClientId, u32>,
}

/// Skip-vote tally as broadcast to the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipVotePayload {
    pub votes: u32,
    pub total: u32,
    pub needed: u32,
    pub voters: Vec<ClientId>,
}

/// Phase of the elimination vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VotePhase {
    #[default]
    Idle,
    Speeches,
    Ballot,
}

/// Elimination-vote state as broadcast on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    pub room_id: RoomCode,
    pub phase: VotePhase,
    pub ends_at: Option<u64>,
    pub speech_order: Vec<ClientId>,
    /// Index into `speech_order`; -1 outside the speeches phase.
    pub speaking_idx: i64,
    pub votes: HashMap<ClientId, u32>,
    pub voted_by: Vec<ClientId>,
    pub total_voters: Option<u32>,
    pub allowed_targets: Option<Vec<ClientId>>,
}

/// Persisted result of the most recent ballot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastVote {
    /// Unix seconds when the ballot resolved.
    pub at: u64,
    pub totals: HashMap<ClientId, u32>,
    pub voters_by_target: HashMap<ClientId, Vec<ClientId>>,
    pub total_voters: u32,
    pub total_eligible: u32,
}

/// The full game snapshot broadcast after every meaningful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatePayload {
    pub room_id: RoomCode,
    pub players: Vec<PublicPlayer>,
    pub bunker: Option<BunkerInfo>,
    pub cataclysm: Option<CataclysmInfo>,
    pub current_turn_id: Option<ClientId>,
    /// Seconds the current turn has been running, capped at 120 for display.
    pub turn_seconds: u32,
    pub round: RoundPayload,
    pub vote_skip: SkipVotePayload,
    pub game_over: bool,
    pub winners: Vec<ClientId>,
    pub last_vote: Option<LastVote>,
    /// Unix seconds when a finished room will be torn down.
    pub cleanup_at: Option<u64>,
}

/// Room metadata (pre-game lobby view).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatePayload {
    pub room_id: RoomCode,
    pub host_id: Option<ClientId>,
    pub started: bool,
    pub max_players: u32,
    pub players: Vec<PresencePlayer>,
}

/// Why a reveal request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    /// Round 1 requires profession before any other core key.
    #[serde(rename = "need-profession-first")]
    NeedProfessionFirst,
    /// The player already met this round's quota.
    #[serde(rename = "round-quota-reached")]
    RoundQuotaReached,
    /// Core reveals are locked while a vote is running.
    #[serde(rename = "voting-phase")]
    VotingPhase,
}

/// Why a request was rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    NotFound,
    InvalidClient,
    GameStarted,
    Full,
    NotHost,
    NotEnoughPlayers,
}

// ---------------------------------------------------------------------------
// Outbound: core → clients
// ---------------------------------------------------------------------------

/// Everything the core can tell clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// The turn moved to a new player (or to nobody).
    #[serde(rename_all = "camelCase")]
    Turn {
        room_id: RoomCode,
        current_turn_id: Option<ClientId>,
    },

    /// One-second heartbeat of the turn timer, capped at 120.
    #[serde(rename_all = "camelCase")]
    TurnTick { room_id: RoomCode, seconds: u32 },

    /// Full public snapshot.
    GameState(GameStatePayload),

    /// Private hand snapshot, sent only to the owning connection.
    #[serde(rename_all = "camelCase")]
    You {
        hand: Hand,
        hidden_key: Option<AttrKey>,
        revealed_keys: Vec<AttrKey>,
    },

    /// Round number/quota/counters changed.
    #[serde(rename_all = "camelCase")]
    RoundState {
        room_id: RoomCode,
        number: u32,
        quota: u32,
        revealed_by: HashMap<ClientId, u32>,
    },

    /// The skip-turn tally changed.
    #[serde(rename_all = "camelCase")]
    SkipVoteState {
        room_id: RoomCode,
        #[serde(flatten)]
        state: SkipVotePayload,
    },

    /// A stalled turn was skipped; one attribute was force-revealed.
    #[serde(rename_all = "camelCase")]
    SkipSuccess {
        room_id: RoomCode,
        prev_player_id: Option<ClientId>,
        prev_nick: String,
    },

    /// A reveal request was rejected, with the reason for the UI.
    #[serde(rename_all = "camelCase")]
    RevealDenied {
        room_id: RoomCode,
        reason: DenyReason,
    },

    /// A skip-turn vote was rejected (an elimination vote is running).
    #[serde(rename_all = "camelCase")]
    SkipDenied {
        room_id: RoomCode,
        reason: DenyReason,
    },

    /// Elimination-vote state changed.
    VoteState(VotePayload),

    /// A ballot resolved; here is the breakdown.
    #[serde(rename_all = "camelCase")]
    VoteResult {
        room_id: RoomCode,
        last_vote: LastVote,
    },

    /// The game is over.
    #[serde(rename_all = "camelCase")]
    GameOver {
        room_id: RoomCode,
        winners: Vec<ClientId>,
        cleanup_at: Option<u64>,
    },

    /// Who is seated in the room right now.
    #[serde(rename_all = "camelCase")]
    Presence {
        room_id: RoomCode,
        players: Vec<PresencePlayer>,
        max_players: u32,
    },

    /// Room metadata changed (host, started flag, roster).
    RoomState(RoomStatePayload),

    /// The room was torn down.
    #[serde(rename_all = "camelCase")]
    RoomClosed { room_id: RoomCode },

    /// A request was rejected.
    #[serde(rename_all = "camelCase")]
    Error {
        room_id: Option<RoomCode>,
        reason: ErrorReason,
    },
}

#[cfg(test)]
mod tests {
    //! The wire format is the contract with the browser client; these
    //! tests pin the JSON shapes the serde attributes must produce.

    use super::*;

    fn cid(s: &str) -> ClientId {
        ClientId::from(s)
    }

    #[test]
    fn test_client_event_join_json_shape() {
        let ev = ClientEvent::Join {
            room_id: RoomCode::from("ABCD"),
            nick: "ann".into(),
            client_id: cid("c1"),
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "join");
        assert_eq!(json["roomId"], "ABCD");
        assert_eq!(json["nick"], "ann");
        assert_eq!(json["clientId"], "c1");
    }

    #[test]
    fn test_client_event_reveal_key_round_trip() {
        let ev = ClientEvent::RevealKey {
            room_id: RoomCode::from("ABCD"),
            key: AttrKey::Profession,
        };
        let bytes = serde_json::to_vec(&ev).unwrap();
        let back: ClientEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ev, back);
    }

    #[test]
    fn test_client_event_vote_skip_json_shape() {
        let ev = ClientEvent::VoteSkip {
            room_id: RoomCode::from("ABCD"),
            vote: true,
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "voteSkip");
        assert_eq!(json["vote"], true);
    }

    #[test]
    fn test_server_event_turn_json_shape() {
        let ev = ServerEvent::Turn {
            room_id: RoomCode::from("ABCD"),
            current_turn_id: Some(cid("c1")),
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "turn");
        assert_eq!(json["currentTurnId"], "c1");
    }

    #[test]
    fn test_server_event_skip_vote_state_flattens() {
        let ev = ServerEvent::SkipVoteState {
            room_id: RoomCode::from("ABCD"),
            state: SkipVotePayload {
                votes: 2,
                total: 4,
                needed: 2,
                voters: vec![cid("a"), cid("b")],
            },
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "skipVoteState");
        // Flattened: votes/total/needed sit beside roomId, not nested.
        assert_eq!(json["votes"], 2);
        assert_eq!(json["needed"], 2);
        assert_eq!(json["roomId"], "ABCD");
    }

    #[test]
    fn test_deny_reason_kebab_case() {
        let json = serde_json::to_string(&DenyReason::NeedProfessionFirst).unwrap();
        assert_eq!(json, "\"need-profession-first\"");
        let json = serde_json::to_string(&DenyReason::RoundQuotaReached).unwrap();
        assert_eq!(json, "\"round-quota-reached\"");
    }

    #[test]
    fn test_error_reason_snake_case() {
        let json = serde_json::to_string(&ErrorReason::NotHost).unwrap();
        assert_eq!(json, "\"not_host\"");
    }

    #[test]
    fn test_vote_phase_lowercase() {
        assert_eq!(serde_json::to_string(&VotePhase::Idle).unwrap(), "\"idle\"");
        assert_eq!(
            serde_json::to_string(&VotePhase::Speeches).unwrap(),
            "\"speeches\""
        );
        assert_eq!(
            serde_json::to_string(&VotePhase::Ballot).unwrap(),
            "\"ballot\""
        );
    }

    #[test]
    fn test_vote_payload_round_trip() {
        let payload = VotePayload {
            room_id: RoomCode::from("ABCD"),
            phase: VotePhase::Ballot,
            ends_at: Some(1000),
            speech_order: vec![cid("a"), cid("b")],
            speaking_idx: -1,
            votes: HashMap::from([(cid("a"), 2)]),
            voted_by: vec![cid("b")],
            total_voters: Some(2),
            allowed_targets: None,
        };
        let ev = ServerEvent::VoteState(payload);
        let bytes = serde_json::to_vec(&ev).unwrap();
        let back: ServerEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ev, back);
    }

    #[test]
    fn test_you_event_keeps_hand_private_shape() {
        let mut hand = Hand::default();
        hand.0.insert(AttrKey::Profession, "medic".into());
        let ev = ServerEvent::You {
            hand,
            hidden_key: Some(AttrKey::Phobia),
            revealed_keys: vec![AttrKey::Profession],
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "you");
        assert_eq!(json["hand"]["profession"], "medic");
        assert_eq!(json["hiddenKey"], "phobia");
    }

    #[test]
    fn test_game_state_payload_round_trip() {
        let payload = GameStatePayload {
            room_id: RoomCode::from("ABCD"),
            players: vec![PublicPlayer {
                id: cid("a"),
                nick: "ann".into(),
                seat: 1,
                kicked: false,
                revealed: HashMap::new(),
            }],
            bunker: Some(BunkerInfo {
                places: 2,
                description: "deep shelter".into(),
            }),
            cataclysm: None,
            current_turn_id: Some(cid("a")),
            turn_seconds: 17,
            round: RoundPayload {
                number: 1,
                quota: 3,
                revealed_by: HashMap::new(),
            },
            vote_skip: SkipVotePayload {
                votes: 0,
                total: 1,
                needed: 1,
                voters: vec![],
            },
            game_over: false,
            winners: vec![],
            last_vote: None,
            cleanup_at: None,
        };
        let ev = ServerEvent::GameState(payload);
        let bytes = serde_json::to_vec(&ev).unwrap();
        let back: ServerEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ev, back);
    }

    #[test]
    fn test_decode_unknown_event_type_fails() {
        let unknown = r#"{"type": "flyToMoon", "roomId": "ABCD"}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }
}
