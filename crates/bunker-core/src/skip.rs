//! Skip-turn consensus: voting out a stalled turn.
//!
//! Once a turn has run for two minutes, the other active players can
//! vote to skip it. At half the active count (rounded up) the skip
//! fires: one random core attribute of the stalled player is revealed
//! for them and the turn moves on.

use bunker_protocol::{ClientId, DenyReason, ErrorReason, Recipient, ServerEvent};
use rand::prelude::*;
use tracing::info;

use crate::effect::Effect;
use crate::room::Room;
use crate::{reveal, turns};

/// Seconds a turn must run before skip votes unlock.
pub const SKIP_UNLOCK_SECS: u32 = 120;

fn skip_threshold(room: &Room) -> u32 {
    room.active_count().div_ceil(2)
}

fn tally_update(room: &Room) -> Effect {
    Effect::Emit(
        Recipient::All,
        ServerEvent::SkipVoteState {
            room_id: room.code.clone(),
            state: room.skip_payload(),
        },
    )
}

/// Executes the skip: force-reveal one attribute of the stalled player,
/// announce it, and move on. If the forced reveal completed the round
/// quota the speeches phase takes over instead of a new turn.
fn perform_skip(room: &mut Room, rng: &mut impl Rng) -> Vec<Effect> {
    let prev = room.current_turn_id.clone();
    let prev_nick = prev
        .as_ref()
        .and_then(|id| room.players.get(id))
        .map(|p| p.nick.clone())
        .unwrap_or_default();
    info!(room = %room.code, player = ?prev, "turn skipped");

    let mut effects = Vec::new();
    if let Some(id) = &prev {
        effects.extend(reveal::force_reveal_random(room, id, rng));
    }
    room.skip_votes.clear();
    effects.push(tally_update(room));
    effects.push(Effect::Emit(
        Recipient::All,
        ServerEvent::SkipSuccess {
            room_id: room.code.clone(),
            prev_player_id: prev,
            prev_nick,
        },
    ));

    // The forced reveal may have finished the round; in that case the
    // scheduled speeches replace the next turn.
    if effects.contains(&Effect::ScheduleSpeechStart) {
        effects.push(Effect::ClearTurnTimer);
        room.current_turn_id = None;
    } else {
        effects.extend(turns::advance_turn(room));
    }
    effects
}

/// Casts (or retracts) a skip vote. Fires the skip at the threshold.
pub fn vote_skip(
    room: &mut Room,
    voter: &ClientId,
    vote: bool,
    rng: &mut impl Rng,
) -> Vec<Effect> {
    if !room.started || room.game_over {
        return Vec::new();
    }
    if room.vote.is_active() {
        return vec![Effect::Emit(
            Recipient::Player(voter.clone()),
            ServerEvent::SkipDenied {
                room_id: room.code.clone(),
                reason: DenyReason::VotingPhase,
            },
        )];
    }
    let eligible = room
        .players
        .get(voter)
        .is_some_and(|p| !p.kicked)
        && room.current_turn_id.as_ref() != Some(voter);
    if !eligible {
        return Vec::new();
    }

    if vote {
        if room.turn_seconds < SKIP_UNLOCK_SECS {
            return Vec::new();
        }
        room.skip_votes.insert(voter.clone());
    } else if !room.skip_votes.remove(voter) {
        return Vec::new();
    }

    let mut effects = vec![tally_update(room)];
    if (room.skip_votes.len() as u32) >= skip_threshold(room) {
        effects.extend(perform_skip(room, rng));
    }
    effects
}

/// Host override: skip the stalled turn without waiting for consensus.
/// Still gated on the two-minute unlock.
pub fn force_skip(room: &mut Room, sender: &ClientId, rng: &mut impl Rng) -> Vec<Effect> {
    if !room.started || room.game_over {
        return Vec::new();
    }
    if !room.is_host(sender) {
        return vec![Effect::Emit(
            Recipient::Player(sender.clone()),
            ServerEvent::Error {
                room_id: Some(room.code.clone()),
                reason: ErrorReason::NotHost,
            },
        )];
    }
    if room.vote.is_active() {
        return vec![Effect::Emit(
            Recipient::Player(sender.clone()),
            ServerEvent::SkipDenied {
                room_id: room.code.clone(),
                reason: DenyReason::VotingPhase,
            },
        )];
    }
    if room.turn_seconds < SKIP_UNLOCK_SECS || room.current_turn_id.is_none() {
        return Vec::new();
    }
    perform_skip(room, rng)
}
