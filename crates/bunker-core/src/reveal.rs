//! Revealing attributes: the gate rules and their effects.
//!
//! Core reveals are the engine of round progress. They are gated three
//! ways: profession must come first in round 1, each round has a quota,
//! and core reveals lock while an elimination vote runs. Ability reveals
//! bypass all three and never count toward the quota.

use bunker_protocol::{AttrKey, ClientId, DenyReason, Recipient, ServerEvent};
use rand::prelude::*;
use tracing::debug;

use crate::effect::Effect;
use crate::room::Room;
use crate::rounds;

/// Outcome of a reveal attempt.
#[derive(Debug, PartialEq)]
enum Gate {
    /// Proceed; `true` if the reveal counts toward the round quota.
    Allow { counted: bool },
    /// Reject with a reason the client shows.
    Deny(DenyReason),
    /// Silently ignore (duplicate, hidden key, unknown value).
    Ignore,
}

fn gate(room: &Room, player_id: &ClientId, key: AttrKey) -> Gate {
    let Some(player) = room.players.get(player_id) else {
        return Gate::Ignore;
    };
    if player.kicked || player.has_revealed(key) || player.hand.get(key).is_none() {
        return Gate::Ignore;
    }
    if player.hidden_key == Some(key) {
        return Gate::Ignore;
    }
    if key.is_ability() {
        return Gate::Allow { counted: false };
    }
    if room.vote.is_active() {
        return Gate::Deny(DenyReason::VotingPhase);
    }
    if room.round.number == 1
        && key != AttrKey::Profession
        && !player.has_revealed(AttrKey::Profession)
        && player.hidden_key != Some(AttrKey::Profession)
    {
        return Gate::Deny(DenyReason::NeedProfessionFirst);
    }
    if rounds::revealed_this_round(room, player_id) >= room.round.quota {
        return Gate::Deny(DenyReason::RoundQuotaReached);
    }
    Gate::Allow { counted: true }
}

/// Writes the reveal into the player and room state. Caller has already
/// passed the gate.
fn commit(room: &mut Room, player_id: &ClientId, key: AttrKey, counted: bool) -> Vec<Effect> {
    let Some(player) = room.players.get_mut(player_id) else {
        return Vec::new();
    };
    let Some(value) = player.hand.get(key).map(str::to_string) else {
        return Vec::new();
    };
    player.revealed.insert(key, value);
    player.revealed_keys.push(key);
    if counted {
        rounds::bump(room, player_id);
    }
    debug!(room = %room.code, player = %player_id, %key, counted, "attribute revealed");

    let player = &room.players[player_id];
    let mut effects = vec![
        Effect::Emit(
            Recipient::Player(player_id.clone()),
            ServerEvent::You {
                hand: player.hand.clone(),
                hidden_key: player.hidden_key,
                revealed_keys: player.revealed_keys.clone(),
            },
        ),
        Effect::Emit(Recipient::All, ServerEvent::GameState(room.game_state_payload())),
        Effect::Emit(
            Recipient::All,
            ServerEvent::RoundState {
                room_id: room.code.clone(),
                number: room.round.number,
                quota: room.round.quota,
                revealed_by: room.round.revealed_by.clone(),
            },
        ),
    ];
    // Quota complete means speeches start after a short settle delay,
    // unless a vote is already running.
    if counted && rounds::all_reached_quota(room) && !room.vote.is_active() {
        effects.push(Effect::ScheduleSpeechStart);
    }
    effects
}

fn denied(room: &Room, player_id: &ClientId, reason: DenyReason) -> Vec<Effect> {
    vec![Effect::Emit(
        Recipient::Player(player_id.clone()),
        ServerEvent::RevealDenied {
            room_id: room.code.clone(),
            reason,
        },
    )]
}

/// Reveals one specific attribute, gates permitting.
pub fn reveal_key(room: &mut Room, player_id: &ClientId, key: AttrKey) -> Vec<Effect> {
    match gate(room, player_id, key) {
        Gate::Allow { counted } => commit(room, player_id, key, counted),
        Gate::Deny(reason) => denied(room, player_id, reason),
        Gate::Ignore => Vec::new(),
    }
}

/// The next core key `player_id` would reveal: profession first in
/// round 1, then the fixed core order, skipping the hidden key and
/// everything already shown.
pub fn next_core_key(room: &Room, player_id: &ClientId) -> Option<AttrKey> {
    let player = room.players.get(player_id)?;
    if room.round.number == 1
        && !player.has_revealed(AttrKey::Profession)
        && player.hidden_key != Some(AttrKey::Profession)
    {
        return Some(AttrKey::Profession);
    }
    AttrKey::CORE
        .into_iter()
        .find(|k| !player.has_revealed(*k) && player.hidden_key != Some(*k))
}

/// Reveals the next core attribute in the fixed order.
pub fn reveal_next(room: &mut Room, player_id: &ClientId) -> Vec<Effect> {
    match next_core_key(room, player_id) {
        Some(key) => reveal_key(room, player_id, key),
        None => Vec::new(),
    }
}

/// Force-reveals one random unrevealed core attribute, bypassing every
/// gate except the hidden key. Used when a stalled turn is skipped;
/// the reveal still counts toward the quota.
pub fn force_reveal_random(
    room: &mut Room,
    player_id: &ClientId,
    rng: &mut impl Rng,
) -> Vec<Effect> {
    let Some(player) = room.players.get(player_id) else {
        return Vec::new();
    };
    let candidates: Vec<AttrKey> = AttrKey::CORE
        .into_iter()
        .filter(|k| !player.has_revealed(*k) && player.hidden_key != Some(*k))
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }
    let key = candidates[rng.random_range(0..candidates.len())];
    commit(room, player_id, key, true)
}
