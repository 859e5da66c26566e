//! Room actor: an isolated Tokio task that owns one game session.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. The actor resolves connections to client
//! ids, drives the pure engine in `bunker-core`, and executes the
//! effects the engine returns: message delivery and timer management.

use std::collections::HashMap;

use bunker_core::{Effect, Room, TimerEvent, VoteState, engine};
use bunker_protocol::{ClientEvent, ClientId, ConnectionId, Recipient, RoomCode, ServerEvent};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::RoomError;
use crate::timer::{TimerService, now_sec};

/// Channel sender delivering outbound events to one connection handler.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    /// Seat (or re-seat) a client on this connection.
    Join {
        conn: ConnectionId,
        client_id: ClientId,
        nick: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// A decoded event from a connection.
    Event {
        conn: ConnectionId,
        event: ClientEvent,
    },

    /// The connection's socket dropped.
    Disconnect { conn: ConnectionId },

    /// A timer owned by this room fired.
    Timer(TimerEvent),

    /// The armed vote deadline elapsed. `gen` identifies the arming;
    /// a fire from a superseded deadline is dropped on receipt.
    VoteDeadline { r#gen: u64 },

    /// Tear the room down immediately.
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The room's join code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Seats a client and waits for the room's verdict.
    pub async fn join(
        &self,
        conn: ConnectionId,
        client_id: ClientId,
        nick: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                conn,
                client_id,
                nick,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Delivers a game event (fire-and-forget).
    pub async fn event(&self, conn: ConnectionId, event: ClientEvent) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Event { conn, event })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Reports a dropped connection.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Disconnect { conn })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    receiver: mpsc::Receiver<RoomCommand>,
    timers: TimerService,
    /// Per-player outbound channels, by stable identity.
    senders: HashMap<ClientId, PlayerSender>,
    /// Which client each live connection belongs to.
    conns: HashMap<ConnectionId, ClientId>,
    /// Tells the registry to drop this room's handle on teardown.
    destroyed_tx: mpsc::UnboundedSender<RoomCode>,
    running: bool,
}

impl RoomActor {
    async fn run(mut self) {
        info!(room = %self.room.code, "room actor started");

        while self.running {
            let Some(cmd) = self.receiver.recv().await else {
                break;
            };
            match cmd {
                RoomCommand::Join {
                    conn,
                    client_id,
                    nick,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(conn, client_id, nick, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Event { conn, event } => self.handle_event(conn, event),
                RoomCommand::Disconnect { conn } => self.handle_disconnect(conn),
                RoomCommand::Timer(event) => self.handle_timer(event),
                RoomCommand::VoteDeadline { r#gen } => self.handle_vote_deadline(r#gen),
                RoomCommand::Shutdown => {
                    info!(room = %self.room.code, "room shutting down");
                    self.running = false;
                }
            }
        }

        self.timers.abort_all();
        let _ = self.destroyed_tx.send(self.room.code.clone());
        info!(room = %self.room.code, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        conn: ConnectionId,
        client_id: ClientId,
        nick: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        // The sender must be reachable before the engine runs so a
        // rejection event still gets delivered.
        self.senders.insert(client_id.clone(), sender);
        self.conns.insert(conn, client_id.clone());

        let effects = engine::handle_join(&mut self.room, conn, &client_id, &nick);
        let accepted = self.room.players.contains_key(&client_id);
        self.execute(effects, now_sec());

        if accepted {
            Ok(())
        } else {
            self.senders.remove(&client_id);
            self.conns.remove(&conn);
            Err(RoomError::JoinRejected(self.room.code.clone()))
        }
    }

    fn handle_event(&mut self, conn: ConnectionId, event: ClientEvent) {
        let Some(client_id) = self.conns.get(&conn).cloned() else {
            warn!(room = %self.room.code, %conn, "event from unseated connection, ignoring");
            return;
        };
        let now = now_sec();
        let mut rng = rand::rng();
        let effects = engine::handle_event(&mut self.room, &client_id, event, now, &mut rng);
        self.execute(effects, now);
        self.reconcile();
    }

    fn handle_disconnect(&mut self, conn: ConnectionId) {
        let Some(client_id) = self.conns.remove(&conn) else {
            return;
        };
        // A stale socket for a client who already reconnected on a new
        // connection must not park them.
        let is_current = self
            .room
            .players
            .get(&client_id)
            .is_some_and(|p| p.conn == conn);
        if !is_current {
            return;
        }
        self.senders.remove(&client_id);
        let now = now_sec();
        let effects = engine::handle_disconnect(&mut self.room, &client_id, now);
        self.execute(effects, now);
        self.reconcile();
    }

    fn handle_timer(&mut self, event: TimerEvent) {
        let now = now_sec();
        let effects = engine::handle_timer(&mut self.room, event, now);
        self.execute(effects, now);
    }

    fn handle_vote_deadline(&mut self, r#gen: u64) {
        // The phase may have moved on (speech finished, ballot closed)
        // and armed a newer deadline while this fire sat in the
        // mailbox. Only the current arming counts.
        if r#gen != self.timers.vote_deadline_gen() {
            return;
        }
        // The current arming genuinely elapsed; the stored deadline is
        // the one it was armed for, so treat it as reached even if the
        // wall clock lags by a fraction of a second.
        let now = match &self.room.vote {
            VoteState::Speeches { ends_at, .. } | VoteState::Ballot { ends_at, .. } => {
                now_sec().max(*ends_at)
            }
            VoteState::Idle => now_sec(),
        };
        let effects = engine::handle_timer(&mut self.room, TimerEvent::VoteDeadline, now);
        self.execute(effects, now);
    }

    /// Executes the effects a state transition returned, in order.
    /// `now` is the clock value the transition ran against, so relative
    /// delays line up with the deadlines it computed.
    fn execute(&mut self, effects: Vec<Effect>, now: u64) {
        for effect in effects {
            match effect {
                Effect::Emit(recipient, event) => self.deliver(recipient, event),
                Effect::StartTurnTimer => self.timers.start_turn_tick(),
                Effect::ClearTurnTimer => self.timers.clear_turn_tick(),
                Effect::ScheduleVoteTick { ends_at } => {
                    self.timers.schedule_vote_deadline(ends_at, now)
                }
                Effect::ClearVoteTick => self.timers.clear_vote_deadline(),
                Effect::ScheduleSpeechStart => self.timers.schedule_speech_start(),
                Effect::ArmReconnectGrace(client_id) => self.timers.arm_reconnect(client_id),
                Effect::CancelReconnectGrace(client_id) => {
                    self.timers.cancel_reconnect(&client_id)
                }
                Effect::ArmEmptyRoomGrace => self.timers.arm_empty_room(),
                Effect::CancelEmptyRoomGrace => self.timers.cancel_empty_room(),
                Effect::ScheduleCleanup { at } => self.timers.schedule_cleanup(at, now),
                Effect::DestroyRoom => self.running = false,
            }
        }
    }

    fn deliver(&self, recipient: Recipient, event: ServerEvent) {
        match recipient {
            Recipient::All => {
                for (client_id, sender) in &self.senders {
                    if self.room.players.contains_key(client_id) {
                        let _ = sender.send(event.clone());
                    }
                }
            }
            Recipient::Player(client_id) => {
                if let Some(sender) = self.senders.get(&client_id) {
                    let _ = sender.send(event);
                }
            }
        }
    }

    /// Drops channels for clients the room no longer tracks.
    fn reconcile(&mut self) {
        self.senders
            .retain(|client_id, _| self.room.players.contains_key(client_id));
        self.conns
            .retain(|_, client_id| self.room.players.contains_key(client_id));
    }
}


/// Spawns a room actor task and returns a handle to it.
pub(crate) fn spawn_room(
    code: RoomCode,
    max_players: u32,
    channel_size: usize,
    destroyed_tx: mpsc::UnboundedSender<RoomCode>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        room: Room::new(code.clone(), max_players),
        receiver: rx,
        timers: TimerService::new(tx.clone()),
        senders: HashMap::new(),
        conns: HashMap::new(),
        destroyed_tx,
        running: true,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
