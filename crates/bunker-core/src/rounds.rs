//! Round progression and the core-reveal quota.

use bunker_protocol::ClientId;

use crate::room::Room;

/// How many core reveals each player owes in `round`: 3, then 2, then 1
/// for every round after that.
pub fn quota_for_round(round: u32) -> u32 {
    match round {
        0 | 1 => 3,
        2 => 2,
        _ => 1,
    }
}

/// Records one quota-counted reveal for `player` in the current round.
pub fn bump(room: &mut Room, player: &ClientId) {
    *room.round.revealed_by.entry(player.clone()).or_insert(0) += 1;
}

/// Reveals `player` has made this round.
pub fn revealed_this_round(room: &Room, player: &ClientId) -> u32 {
    room.round.revealed_by.get(player).copied().unwrap_or(0)
}

/// Has every active player met the current round's quota?
///
/// Vacuously false with no active players; game-over detection handles
/// that case before anyone asks.
pub fn all_reached_quota(room: &Room) -> bool {
    let active = room.active_ids();
    !active.is_empty()
        && active
            .iter()
            .all(|id| revealed_this_round(room, id) >= room.round.quota)
}

/// Moves to the next round: number up, fresh quota, counters wiped.
pub fn advance_round(room: &mut Room) {
    room.round.number += 1;
    room.round.quota = quota_for_round(room.round.number);
    room.round.revealed_by.clear();
}
