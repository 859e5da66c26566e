//! The timer service: every cancelable timer a room owns.
//!
//! Each timer is a spawned task that sleeps on the Tokio clock and then
//! sends a command back into the room actor's channel. Arming a timer
//! aborts any earlier task of the same kind, so at most one instance of
//! each kind is ever pending; teardown aborts them all. Aborting cannot
//! recall a fire already queued in the mailbox, so the vote deadline
//! additionally tags each arming with a generation the actor checks.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bunker_core::TimerEvent;
use bunker_protocol::ClientId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::actor::RoomCommand;

/// Seconds a disconnected player may rejoin before their seat drops.
pub const RECONNECT_GRACE_SECS: u64 = 30;
/// Seconds an empty room survives before teardown.
pub const EMPTY_ROOM_GRACE_SECS: u64 = 15;
/// Settle delay before speeches auto-start after the quota completes.
pub const SPEECH_START_DELAY_SECS: u64 = 1;

/// Current unix time in whole seconds.
pub fn now_sec() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Owns every pending timer task for one room.
pub(crate) struct TimerService {
    tx: mpsc::Sender<RoomCommand>,
    turn_tick: Option<JoinHandle<()>>,
    vote_deadline: Option<JoinHandle<()>>,
    /// Tags the armed vote deadline. A fired task carrying an older tag
    /// was superseded after firing and must not be acted on.
    vote_deadline_gen: u64,
    speech_start: Option<JoinHandle<()>>,
    reconnect: HashMap<ClientId, JoinHandle<()>>,
    empty_room: Option<JoinHandle<()>>,
    cleanup: Option<JoinHandle<()>>,
}

fn abort(slot: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = slot.take() {
        handle.abort();
    }
}

impl TimerService {
    pub(crate) fn new(tx: mpsc::Sender<RoomCommand>) -> Self {
        Self {
            tx,
            turn_tick: None,
            vote_deadline: None,
            vote_deadline_gen: 0,
            speech_start: None,
            reconnect: HashMap::new(),
            empty_room: None,
            cleanup: None,
        }
    }

    fn fire_after(&self, delay: Duration, event: TimerEvent) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(RoomCommand::Timer(event)).await;
        })
    }

    /// Restarts the one-second turn heartbeat.
    pub(crate) fn start_turn_tick(&mut self) {
        abort(&mut self.turn_tick);
        let tx = self.tx.clone();
        self.turn_tick = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick of a Tokio interval is immediate; skip it.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(RoomCommand::Timer(TimerEvent::TurnTick)).await.is_err() {
                    break;
                }
            }
        }));
    }

    pub(crate) fn clear_turn_tick(&mut self) {
        abort(&mut self.turn_tick);
    }

    /// Arms the speeches/ballot deadline for `ends_at`, measured from
    /// the same clock value the deadline was computed against.
    pub(crate) fn schedule_vote_deadline(&mut self, ends_at: u64, now: u64) {
        abort(&mut self.vote_deadline);
        self.vote_deadline_gen += 1;
        let r#gen = self.vote_deadline_gen;
        let tx = self.tx.clone();
        let delay = Duration::from_secs(ends_at.saturating_sub(now));
        self.vote_deadline = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(RoomCommand::VoteDeadline { r#gen }).await;
        }));
    }

    pub(crate) fn clear_vote_deadline(&mut self) {
        abort(&mut self.vote_deadline);
        // A fire already in the mailbox carries the old tag.
        self.vote_deadline_gen += 1;
    }

    pub(crate) fn vote_deadline_gen(&self) -> u64 {
        self.vote_deadline_gen
    }

    pub(crate) fn schedule_speech_start(&mut self) {
        abort(&mut self.speech_start);
        self.speech_start = Some(self.fire_after(
            Duration::from_secs(SPEECH_START_DELAY_SECS),
            TimerEvent::SpeechStart,
        ));
    }

    /// Arms (or re-arms) the rejoin window for one player.
    pub(crate) fn arm_reconnect(&mut self, client_id: ClientId) {
        let handle = self.fire_after(
            Duration::from_secs(RECONNECT_GRACE_SECS),
            TimerEvent::ReconnectExpired(client_id.clone()),
        );
        if let Some(old) = self.reconnect.insert(client_id, handle) {
            old.abort();
        }
    }

    pub(crate) fn cancel_reconnect(&mut self, client_id: &ClientId) {
        if let Some(handle) = self.reconnect.remove(client_id) {
            handle.abort();
        }
    }

    pub(crate) fn arm_empty_room(&mut self) {
        abort(&mut self.empty_room);
        self.empty_room = Some(self.fire_after(
            Duration::from_secs(EMPTY_ROOM_GRACE_SECS),
            TimerEvent::EmptyRoomExpired,
        ));
    }

    pub(crate) fn cancel_empty_room(&mut self) {
        abort(&mut self.empty_room);
    }

    /// Arms final teardown at `at`, measured from the same clock value
    /// the deadline was computed against.
    pub(crate) fn schedule_cleanup(&mut self, at: u64, now: u64) {
        abort(&mut self.cleanup);
        let delay = Duration::from_secs(at.saturating_sub(now));
        self.cleanup = Some(self.fire_after(delay, TimerEvent::CleanupDue));
    }

    pub(crate) fn abort_all(&mut self) {
        abort(&mut self.turn_tick);
        abort(&mut self.vote_deadline);
        abort(&mut self.speech_start);
        abort(&mut self.empty_room);
        abort(&mut self.cleanup);
        for (_, handle) in self.reconnect.drain() {
            handle.abort();
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.abort_all();
    }
}
