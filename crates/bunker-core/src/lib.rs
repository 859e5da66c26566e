//! Pure session state machine for the bunker game.
//!
//! Everything in this crate is synchronous and side-effect free: the
//! [`engine`] entry points mutate a [`Room`] and return [`Effect`]s
//! describing what should happen outside (messages to deliver, timers
//! to arm or cancel, teardown). The room actor in `bunker-room` owns
//! the runtime half.
//!
//! The rule modules split along the game's seams:
//!
//! - [`deck`] — dealing hands, hidden keys, bunker and cataclysm.
//! - [`rounds`] — the 3/2/1 reveal quota and round advancement.
//! - [`turns`] — turn order, turn transitions.
//! - [`reveal`] — the reveal gates and their broadcasts.
//! - [`skip`] — skip-turn consensus on stalled turns.
//! - [`vote`] — speeches, ballot, kick resolution.
//! - [`gameover`] — survivors-fit-the-bunker detection.

pub mod deck;
pub mod effect;
pub mod engine;
pub mod gameover;
pub mod player;
pub mod reveal;
pub mod room;
pub mod rounds;
pub mod skip;
pub mod turns;
pub mod vote;

pub use effect::{Effect, TimerEvent};
pub use player::{Player, PlayerSnapshot};
pub use room::{BallotState, Room, RoundState, VoteState};
