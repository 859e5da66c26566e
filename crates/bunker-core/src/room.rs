//! The `Room` aggregate: one isolated game session.
//!
//! Every field is initialized at construction — there is no lazy
//! "create the field if missing" anywhere in the core. The room is the
//! unit of mutual exclusion: the owning actor processes one event at a
//! time, so no operation here needs interior locking.

use std::collections::{HashMap, HashSet};

use bunker_protocol::{
    BunkerInfo, CataclysmInfo, ClientId, GameStatePayload, LastVote, PresencePlayer,
    PublicPlayer, RoomCode, RoomStatePayload, RoundPayload, SkipVotePayload, VotePayload,
    VotePhase,
};

use crate::player::{Player, PlayerSnapshot};
use crate::rounds;

/// Round progress: which round, how many core reveals it demands, and
/// how many each player has made so far this round.
#[derive(Debug, Clone)]
pub struct RoundState {
    pub number: u32,
    pub quota: u32,
    pub revealed_by: HashMap<ClientId, u32>,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            number: 1,
            quota: rounds::quota_for_round(1),
            revealed_by: HashMap::new(),
        }
    }
}

/// Ballot bookkeeping.
///
/// `tally` is deliberately a `Vec` appended in first-vote order: ballot
/// resolution scans it front to back, which makes the tie-break rule
/// (earliest-first-vote wins) explicit and deterministic.
#[derive(Debug, Clone, Default)]
pub struct BallotState {
    /// (target, count), ordered by when the target received their first vote.
    pub tally: Vec<(ClientId, u32)>,
    /// Voters who already cast; one vote per voter, later votes ignored.
    pub voted_by: HashSet<ClientId>,
    /// voter → target, for the result breakdown.
    pub by_voter: Vec<(ClientId, ClientId)>,
    /// Who may vote — snapshot of active players at ballot entry.
    pub active_at_vote: HashSet<ClientId>,
    /// Optional target restriction. Enforced on cast but never populated
    /// by any current code path (reserved for run-off voting).
    pub allowed_targets: Option<Vec<ClientId>>,
}

impl BallotState {
    /// Adds one vote against `target`, keeping first-vote order.
    pub fn add_vote(&mut self, voter: ClientId, target: ClientId) {
        match self.tally.iter_mut().find(|(id, _)| *id == target) {
            Some((_, count)) => *count += 1,
            None => self.tally.push((target.clone(), 1)),
        }
        self.voted_by.insert(voter.clone());
        self.by_voter.push((voter, target));
    }
}

/// The elimination-vote state machine: idle → speeches → ballot → idle.
#[derive(Debug, Clone, Default)]
pub enum VoteState {
    #[default]
    Idle,
    Speeches {
        order: Vec<ClientId>,
        speaking_idx: usize,
        ends_at: u64,
    },
    Ballot {
        ends_at: u64,
        ballot: BallotState,
    },
}

impl VoteState {
    /// The wire-level phase of this state.
    pub fn phase(&self) -> VotePhase {
        match self {
            VoteState::Idle => VotePhase::Idle,
            VoteState::Speeches { .. } => VotePhase::Speeches,
            VoteState::Ballot { .. } => VotePhase::Ballot,
        }
    }

    /// Returns `true` while a vote (speeches or ballot) is running.
    pub fn is_active(&self) -> bool {
        !matches!(self, VoteState::Idle)
    }
}

/// One game session.
#[derive(Debug)]
pub struct Room {
    pub code: RoomCode,
    pub max_players: u32,
    pub host_id: Option<ClientId>,
    pub started: bool,
    /// Monotonic: set once by the game-over detector, never cleared.
    pub game_over: bool,
    /// Host preview mode: public snapshots include full hands.
    pub reveal_all: bool,
    pub next_seat: u32,
    /// Connected players by stable id.
    pub players: HashMap<ClientId, Player>,
    /// Recently disconnected players, parked for the grace window.
    pub reconnect: HashMap<ClientId, PlayerSnapshot>,
    /// Active players in seating order. Never contains a kicked player.
    pub turn_order: Vec<ClientId>,
    pub current_turn_id: Option<ClientId>,
    /// Seconds the current turn has been running (uncapped).
    pub turn_seconds: u32,
    pub round: RoundState,
    pub vote: VoteState,
    /// Who voted to skip the current turn. Cleared on every turn change.
    pub skip_votes: HashSet<ClientId>,
    pub bunker: Option<BunkerInfo>,
    pub cataclysm: Option<CataclysmInfo>,
    pub winners: Vec<ClientId>,
    pub last_vote: Option<LastVote>,
    /// Unix seconds when a finished room gets torn down.
    pub cleanup_at: Option<u64>,
}

impl Room {
    /// Creates an empty, not-yet-started room.
    pub fn new(code: RoomCode, max_players: u32) -> Self {
        Self {
            code,
            max_players,
            host_id: None,
            started: false,
            game_over: false,
            reveal_all: false,
            next_seat: 1,
            players: HashMap::new(),
            reconnect: HashMap::new(),
            turn_order: Vec::new(),
            current_turn_id: None,
            turn_seconds: 0,
            round: RoundState::default(),
            vote: VoteState::Idle,
            skip_votes: HashSet::new(),
            bunker: None,
            cataclysm: None,
            winners: Vec::new(),
            last_vote: None,
            cleanup_at: None,
        }
    }

    /// Looks up a player in the live map or the reconnect pool.
    pub fn is_kicked(&self, id: &ClientId) -> bool {
        self.players
            .get(id)
            .map(|p| p.kicked)
            .or_else(|| self.reconnect.get(id).map(|p| p.kicked))
            .unwrap_or(false)
    }

    /// Returns `true` if the id names a live or parked player.
    pub fn knows(&self, id: &ClientId) -> bool {
        self.players.contains_key(id) || self.reconnect.contains_key(id)
    }

    /// Connected, non-kicked players.
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| !p.kicked)
    }

    /// Number of connected, non-kicked players.
    pub fn active_count(&self) -> u32 {
        self.active_players().count() as u32
    }

    /// Active ids drawn from the turn order (live or parked, non-kicked).
    pub fn active_ids(&self) -> Vec<ClientId> {
        self.turn_order
            .iter()
            .filter(|id| self.knows(id) && !self.is_kicked(id))
            .cloned()
            .collect()
    }

    /// Is this player the host?
    pub fn is_host(&self, id: &ClientId) -> bool {
        self.host_id.as_ref() == Some(id)
    }

    /// Turn seconds capped for display.
    pub fn display_turn_seconds(&self) -> u32 {
        self.turn_seconds.min(crate::skip::SKIP_UNLOCK_SECS)
    }

    // -- payload builders ---------------------------------------------------

    /// Public player list: only revealed attributes (full hands when the
    /// host's reveal-all preview is on). Active players sorted by seat,
    /// kicked players below them, also by seat.
    pub fn public_players(&self) -> Vec<PublicPlayer> {
        let mut list: Vec<PublicPlayer> = self
            .players
            .values()
            .map(|p| PublicPlayer {
                id: p.client_id.clone(),
                nick: p.nick.clone(),
                seat: p.seat,
                kicked: p.kicked,
                revealed: if self.reveal_all {
                    p.hand.0.clone()
                } else {
                    p.revealed.clone()
                },
            })
            .collect();
        list.sort_by(|a, b| (a.kicked, a.seat).cmp(&(b.kicked, b.seat)));
        list
    }

    /// Seat roster for presence broadcasts.
    pub fn presence_players(&self) -> Vec<PresencePlayer> {
        let mut list: Vec<PresencePlayer> = self
            .players
            .values()
            .map(|p| PresencePlayer {
                id: p.client_id.clone(),
                nick: p.nick.clone(),
                seat: p.seat,
            })
            .collect();
        list.sort_by_key(|p| p.seat);
        list
    }

    /// Room metadata payload.
    pub fn room_state_payload(&self) -> RoomStatePayload {
        RoomStatePayload {
            room_id: self.code.clone(),
            host_id: self.host_id.clone(),
            started: self.started,
            max_players: self.max_players,
            players: self.presence_players(),
        }
    }

    /// Round payload.
    pub fn round_payload(&self) -> RoundPayload {
        RoundPayload {
            number: self.round.number,
            quota: self.round.quota,
            revealed_by: self.round.revealed_by.clone(),
        }
    }

    /// Skip-vote tally payload.
    pub fn skip_payload(&self) -> SkipVotePayload {
        let total = self.active_count();
        SkipVotePayload {
            votes: self.skip_votes.len() as u32,
            total,
            needed: total.div_ceil(2),
            voters: self.skip_votes.iter().cloned().collect(),
        }
    }

    /// Elimination-vote payload.
    pub fn vote_payload(&self) -> VotePayload {
        let mut payload = VotePayload {
            room_id: self.code.clone(),
            phase: self.vote.phase(),
            ends_at: None,
            speech_order: Vec::new(),
            speaking_idx: -1,
            votes: HashMap::new(),
            voted_by: Vec::new(),
            total_voters: None,
            allowed_targets: None,
        };
        match &self.vote {
            VoteState::Idle => {}
            VoteState::Speeches {
                order,
                speaking_idx,
                ends_at,
            } => {
                payload.ends_at = Some(*ends_at);
                payload.speech_order = order.clone();
                payload.speaking_idx = *speaking_idx as i64;
            }
            VoteState::Ballot { ends_at, ballot } => {
                payload.ends_at = Some(*ends_at);
                payload.votes = ballot.tally.iter().cloned().collect();
                payload.voted_by = ballot.voted_by.iter().cloned().collect();
                payload.total_voters = Some(ballot.active_at_vote.len() as u32);
                payload.allowed_targets = ballot.allowed_targets.clone();
            }
        }
        payload
    }

    /// Full public snapshot.
    pub fn game_state_payload(&self) -> GameStatePayload {
        GameStatePayload {
            room_id: self.code.clone(),
            players: self.public_players(),
            bunker: self.bunker.clone(),
            cataclysm: self.cataclysm.clone(),
            current_turn_id: self.current_turn_id.clone(),
            turn_seconds: self.display_turn_seconds(),
            round: self.round_payload(),
            vote_skip: self.skip_payload(),
            game_over: self.game_over,
            winners: self.winners.clone(),
            last_vote: self.last_vote.clone(),
            cleanup_at: self.cleanup_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunker_protocol::ConnectionId;

    fn room_with_players(n: u32) -> Room {
        let mut room = Room::new(RoomCode::from("ABCD"), 8);
        for i in 1..=n {
            let cid = ClientId(format!("c{i}"));
            room.players.insert(
                cid.clone(),
                Player::new(cid, ConnectionId::new(i as u64), format!("p{i}"), i),
            );
        }
        room
    }

    #[test]
    fn test_new_room_is_fully_initialized() {
        let room = Room::new(RoomCode::from("ABCD"), 8);
        assert!(!room.started);
        assert!(!room.game_over);
        assert_eq!(room.round.number, 1);
        assert_eq!(room.round.quota, 3);
        assert!(matches!(room.vote, VoteState::Idle));
        assert!(room.skip_votes.is_empty());
    }

    #[test]
    fn test_skip_payload_needed_is_half_rounded_up() {
        let room = room_with_players(5);
        assert_eq!(room.skip_payload().needed, 3);
        let room = room_with_players(4);
        assert_eq!(room.skip_payload().needed, 2);
    }

    #[test]
    fn test_public_players_sorts_kicked_last() {
        let mut room = room_with_players(3);
        room.players.get_mut(&ClientId::from("c1")).unwrap().kicked = true;
        let list = room.public_players();
        assert_eq!(list[0].id, ClientId::from("c2"));
        assert_eq!(list[1].id, ClientId::from("c3"));
        assert_eq!(list[2].id, ClientId::from("c1"));
        assert!(list[2].kicked);
    }

    #[test]
    fn test_ballot_add_vote_keeps_first_vote_order() {
        let mut ballot = BallotState::default();
        ballot.add_vote(ClientId::from("v1"), ClientId::from("b"));
        ballot.add_vote(ClientId::from("v2"), ClientId::from("a"));
        ballot.add_vote(ClientId::from("v3"), ClientId::from("b"));

        let order: Vec<&str> = ballot.tally.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, ["b", "a"]);
        assert_eq!(ballot.tally[0].1, 2);
    }

    #[test]
    fn test_vote_payload_idle_shape() {
        let room = room_with_players(2);
        let payload = room.vote_payload();
        assert_eq!(payload.phase, VotePhase::Idle);
        assert_eq!(payload.speaking_idx, -1);
        assert!(payload.ends_at.is_none());
    }
}
