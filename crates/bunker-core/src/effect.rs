//! Effects: what a state transition asks the outside world to do.
//!
//! Core operations never touch sockets or timers directly. They mutate
//! the [`Room`](crate::Room) and return a list of effects; the room
//! actor executes them in order. This keeps every rule in this crate
//! testable without a runtime.

use bunker_protocol::{ClientId, Recipient, ServerEvent};

/// A side effect requested by a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver an event to one player or the whole room.
    Emit(Recipient, ServerEvent),

    /// Restart the per-second turn countdown from zero.
    StartTurnTimer,

    /// Stop the turn countdown.
    ClearTurnTimer,

    /// Arm (or re-arm) the vote deadline timer for `ends_at` (unix sec).
    ScheduleVoteTick { ends_at: u64 },

    /// Cancel any pending vote deadline timer.
    ClearVoteTick,

    /// Start the speeches phase after a short settle delay, if the vote
    /// is still idle when the timer fires.
    ScheduleSpeechStart,

    /// Give a disconnected player a grace window to rejoin.
    /// Replaces any earlier pending grace timer for the same id.
    ArmReconnectGrace(ClientId),

    /// The player came back; drop their pending grace timer.
    CancelReconnectGrace(ClientId),

    /// The room emptied; tear it down unless someone rejoins in time.
    ArmEmptyRoomGrace,

    /// Someone joined an empty room; keep it alive.
    CancelEmptyRoomGrace,

    /// Schedule final teardown of a finished room at `at` (unix sec).
    ScheduleCleanup { at: u64 },

    /// Remove the room from the registry and cancel all its timers.
    DestroyRoom,
}

/// A timer owned by the Timer Service firing back into the core.
///
/// Handlers re-validate state on every firing: the room may have changed
/// phase (or the deadline may have moved) between scheduling and firing.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    /// One second of the current turn elapsed.
    TurnTick,

    /// The speeches/ballot deadline was reached.
    VoteDeadline,

    /// The settle delay before auto-starting speeches elapsed.
    SpeechStart,

    /// A disconnected player's rejoin window closed.
    ReconnectExpired(ClientId),

    /// The empty-room grace window closed.
    EmptyRoomExpired,

    /// A finished room reached its cleanup deadline.
    CleanupDue,
}
