//! Wire protocol for the bunker game server.
//!
//! This crate defines the language clients and the session core speak:
//!
//! - **Identity** ([`ClientId`], [`RoomCode`], [`ConnectionId`]) — stable
//!   player identity vs. per-socket identity vs. room addressing.
//! - **Keys** ([`AttrKey`]) — the attribute slots on a hand.
//! - **Events** ([`ClientEvent`], [`ServerEvent`] and their payloads) —
//!   tagged JSON messages in both directions.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — how events become bytes.
//!
//! The protocol layer knows nothing about rooms, timers, or sockets;
//! it only defines shapes and serialization.

mod codec;
mod error;
mod events;
mod keys;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{
    BunkerInfo, CataclysmInfo, ClientEvent, DenyReason, ErrorReason, GameStatePayload, Hand,
    LastVote, PresencePlayer, PublicPlayer, RoomStatePayload, RoundPayload, ServerEvent,
    SkipVotePayload, VotePayload, VotePhase,
};
pub use keys::AttrKey;
pub use types::{ClientId, ConnectionId, Recipient, RoomCode};
