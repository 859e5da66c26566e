//! Room runtime for the bunker game.
//!
//! One Tokio task per room (the actor), a timer service owning every
//! cancelable timer the room uses, and a registry mapping join codes to
//! live actors. The rules themselves live in `bunker-core`; this crate
//! is the side-effect half.

mod actor;
mod error;
mod registry;
mod timer;

pub use actor::{PlayerSender, RoomHandle};
pub use error::RoomError;
pub use registry::{DEFAULT_MAX_PLAYERS, RoomRegistry};
pub use timer::{EMPTY_ROOM_GRACE_SECS, RECONNECT_GRACE_SECS, now_sec};
