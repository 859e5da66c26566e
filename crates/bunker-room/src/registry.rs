//! The room registry: creates, finds, and forgets room actors.

use std::collections::HashMap;
use std::sync::Arc;

use bunker_protocol::RoomCode;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::actor::{RoomHandle, spawn_room};

/// Default seat cap per room.
pub const DEFAULT_MAX_PLAYERS: u32 = 8;

/// Command channel size per room actor.
const CHANNEL_SIZE: usize = 64;

/// Tracks every live room by its join code.
///
/// Rooms remove themselves: an actor sends its code on the teardown
/// channel when it stops, and the reaper task drops the handle.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomCode, RoomHandle>>,
    destroyed_tx: mpsc::UnboundedSender<RoomCode>,
    max_players: u32,
}

impl RoomRegistry {
    /// Creates the registry and spawns its reaper task.
    pub fn new(max_players: u32) -> Arc<Self> {
        let (destroyed_tx, mut destroyed_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            destroyed_tx,
            max_players,
        });

        let reaper = Arc::clone(&registry);
        tokio::spawn(async move {
            while let Some(code) = destroyed_rx.recv().await {
                reaper.rooms.lock().await.remove(&code);
                info!(room = %code, "room removed from registry");
            }
        });

        registry
    }

    /// Finds a room by code.
    pub async fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.lock().await.get(code).cloned()
    }

    /// Finds a room, or spawns it if the code is new. Joining a room
    /// creates it, as in a lobby-less flow.
    pub async fn get_or_create(&self, code: &RoomCode) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(code) {
            return handle.clone();
        }
        let handle = spawn_room(
            code.clone(),
            self.max_players,
            CHANNEL_SIZE,
            self.destroyed_tx.clone(),
        );
        rooms.insert(code.clone(), handle.clone());
        info!(room = %code, "room created");
        handle
    }

    /// Spawns a room under a freshly generated code.
    pub async fn create(&self) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        let code = loop {
            let candidate = RoomCode::generate();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
            debug!("room code collision, regenerating");
        };
        let handle = spawn_room(
            code.clone(),
            self.max_players,
            CHANNEL_SIZE,
            self.destroyed_tx.clone(),
        );
        info!(room = %code, "room created");
        rooms.insert(code, handle.clone());
        handle
    }

    /// Number of live rooms.
    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Whether no rooms are live.
    pub async fn is_empty(&self) -> bool {
        self.rooms.lock().await.is_empty()
    }
}
