//! Game-over detection and the finished-room cleanup window.

use bunker_protocol::{Recipient, ServerEvent};
use tracing::info;

use crate::effect::Effect;
use crate::room::{Room, VoteState};

/// A finished room lingers this long before teardown, so everyone can
/// read the result screen.
pub const CLEANUP_DELAY_SECS: u64 = 300;

/// Checks whether the survivors now fit the bunker and, if so, ends the
/// game. `game_over` is one-way; a second call is a no-op.
///
/// Players parked in the reconnect pool still count as survivors, so a
/// badly timed disconnect cannot hand out a premature win.
pub fn check(room: &mut Room, now: u64) -> Vec<Effect> {
    if room.game_over || !room.started {
        return Vec::new();
    }
    let places = room.bunker.as_ref().map(|b| b.places).unwrap_or(0);
    let survivors = room.active_ids();
    if places == 0 || survivors.is_empty() || survivors.len() as u32 > places {
        return Vec::new();
    }
    info!(room = %room.code, winners = survivors.len(), "game over");

    room.game_over = true;
    room.winners = survivors;
    room.vote = VoteState::Idle;
    room.skip_votes.clear();
    room.current_turn_id = None;
    if room.cleanup_at.is_none() {
        room.cleanup_at = Some(now + CLEANUP_DELAY_SECS);
    }

    let mut effects = vec![Effect::ClearTurnTimer, Effect::ClearVoteTick];
    if let Some(at) = room.cleanup_at {
        effects.push(Effect::ScheduleCleanup { at });
    }
    effects.push(Effect::Emit(
        Recipient::All,
        ServerEvent::GameOver {
            room_id: room.code.clone(),
            winners: room.winners.clone(),
            cleanup_at: room.cleanup_at,
        },
    ));
    effects.push(Effect::Emit(
        Recipient::All,
        ServerEvent::GameState(room.game_state_payload()),
    ));
    effects
}
