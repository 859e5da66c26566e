//! Turn order and turn transitions.
//!
//! The turn order is seat-ascending over non-kicked players and is the
//! single source of truth for "who plays". Rebuilding it is incremental:
//! ids keep their relative position, newcomers append, the kicked and
//! the fully departed drop out.

use bunker_protocol::{ClientId, Recipient, ServerEvent};
use tracing::debug;

use crate::effect::Effect;
use crate::room::Room;

/// Seat-ascending order over live and parked non-kicked players.
pub fn compute_turn_order(room: &Room) -> Vec<ClientId> {
    let mut seats: Vec<(u32, ClientId)> = room
        .players
        .values()
        .filter(|p| !p.kicked)
        .map(|p| (p.seat, p.client_id.clone()))
        .chain(
            room.reconnect
                .values()
                .filter(|p| !p.kicked)
                .map(|p| (p.seat, p.client_id.clone())),
        )
        .collect();
    seats.sort_by_key(|(seat, _)| *seat);
    seats.into_iter().map(|(_, id)| id).collect()
}

/// Reconciles `turn_order` with the current roster.
///
/// Keeps surviving ids in their existing relative order, appends
/// newcomers in seat order, and clears `current_turn_id` if its holder
/// dropped out.
pub fn ensure_turn_state(room: &mut Room) {
    let fresh = compute_turn_order(room);
    let mut order: Vec<ClientId> = room
        .turn_order
        .iter()
        .filter(|id| fresh.contains(id))
        .cloned()
        .collect();
    for id in &fresh {
        if !order.contains(id) {
            order.push(id.clone());
        }
    }
    room.turn_order = order;

    if let Some(current) = &room.current_turn_id {
        if !room.turn_order.contains(current) {
            room.current_turn_id = None;
        }
    }
}

/// Picks the player after `current` in circular order.
///
/// With no current holder the first in order gets the turn. Returns
/// `None` when the order is empty.
pub fn next_in_order(room: &Room) -> Option<ClientId> {
    if room.turn_order.is_empty() {
        return None;
    }
    let next_idx = match &room.current_turn_id {
        Some(current) => room
            .turn_order
            .iter()
            .position(|id| id == current)
            .map(|i| (i + 1) % room.turn_order.len())
            .unwrap_or(0),
        None => 0,
    };
    Some(room.turn_order[next_idx].clone())
}

/// Hands the turn to `player`: resets the skip tally and the countdown,
/// then announces the new holder.
pub fn begin_turn(room: &mut Room, player: Option<ClientId>) -> Vec<Effect> {
    if room.game_over {
        return Vec::new();
    }
    debug!(room = %room.code, player = ?player, "turn begins");
    room.current_turn_id = player;
    room.turn_seconds = 0;
    room.skip_votes.clear();

    let mut effects = vec![
        Effect::Emit(
            Recipient::All,
            ServerEvent::Turn {
                room_id: room.code.clone(),
                current_turn_id: room.current_turn_id.clone(),
            },
        ),
        Effect::Emit(
            Recipient::All,
            ServerEvent::SkipVoteState {
                room_id: room.code.clone(),
                state: room.skip_payload(),
            },
        ),
    ];
    if room.current_turn_id.is_some() {
        effects.push(Effect::StartTurnTimer);
    } else {
        effects.push(Effect::ClearTurnTimer);
    }
    effects
}

/// Moves the turn to the next player in circular order.
pub fn advance_turn(room: &mut Room) -> Vec<Effect> {
    ensure_turn_state(room);
    let next = next_in_order(room);
    begin_turn(room, next)
}

/// Moves the turn onward after its holder left the order for good.
///
/// `departed_idx` is the holder's slot before the order was rebuilt;
/// the id now occupying it is the next seat around the circle. Without
/// a known slot the turn falls back to circular advance.
pub fn advance_past(room: &mut Room, departed_idx: Option<usize>) -> Vec<Effect> {
    let next = match departed_idx {
        Some(idx) if !room.turn_order.is_empty() => {
            Some(room.turn_order[idx % room.turn_order.len()].clone())
        }
        _ => next_in_order(room),
    };
    begin_turn(room, next)
}
