//! WebSocket front end for the bunker game.
//!
//! `bunker-server` ties the layers together: TCP accept →
//! `tokio-tungstenite` handshake → per-connection handler → room actors
//! in `bunker-room` → rules in `bunker-core`.

mod error;
mod handler;
mod server;

pub use error::ServerError;
pub use server::BunkerServer;
