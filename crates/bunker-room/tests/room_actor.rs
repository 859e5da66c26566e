//! Room actor integration tests on the paused Tokio clock.

use std::time::Duration;

use bunker_protocol::{ClientEvent, ClientId, ConnectionId, RoomCode, ServerEvent, VotePhase};
use bunker_room::{RoomHandle, RoomRegistry};
use tokio::sync::mpsc;
use tokio::time;

type Outbox = mpsc::UnboundedReceiver<ServerEvent>;

fn cid(s: &str) -> ClientId {
    ClientId::from(s)
}

fn code() -> RoomCode {
    RoomCode::from("TEST")
}

/// Lets the actor and any due timers run. The paused clock auto-advances
/// through the sleep when every task is idle.
async fn settle() {
    time::sleep(Duration::from_millis(50)).await;
}

async fn join(handle: &RoomHandle, n: u64) -> Outbox {
    let (tx, rx) = mpsc::unbounded_channel();
    handle
        .join(
            ConnectionId::new(n),
            ClientId(format!("c{n}")),
            format!("p{n}"),
            tx,
        )
        .await
        .expect("join accepted");
    rx
}

fn drain(rx: &mut Outbox) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

async fn send(handle: &RoomHandle, n: u64, event: ClientEvent) {
    handle
        .event(ConnectionId::new(n), event)
        .await
        .expect("room alive");
    settle().await;
}

async fn started_room(registry: &RoomRegistry, players: u64) -> (RoomHandle, Vec<Outbox>) {
    let handle = registry.get_or_create(&code()).await;
    let mut outboxes = Vec::new();
    for n in 1..=players {
        outboxes.push(join(&handle, n).await);
    }
    send(&handle, 1, ClientEvent::StartGame { room_id: code() }).await;
    (handle, outboxes)
}

#[tokio::test(start_paused = true)]
async fn test_join_broadcasts_roster_and_private_hand() {
    let registry = RoomRegistry::new(8);
    let handle = registry.get_or_create(&code()).await;

    let mut rx1 = join(&handle, 1).await;
    let mut rx2 = join(&handle, 2).await;
    settle().await;

    // The first player saw both joins.
    let events = drain(&mut rx1);
    let presences = events
        .iter()
        .filter(|ev| matches!(ev, ServerEvent::Presence { .. }))
        .count();
    assert!(presences >= 2);

    // The second player got their own sync.
    let events = drain(&mut rx2);
    assert!(events.iter().any(|ev| matches!(ev, ServerEvent::You { .. })));
    assert!(events.iter().any(|ev| matches!(
        ev,
        ServerEvent::RoomState(state) if state.host_id == Some(cid("c1"))
    )));
}

#[tokio::test(start_paused = true)]
async fn test_full_room_rejects_with_error_event() {
    let registry = RoomRegistry::new(2);
    let handle = registry.get_or_create(&code()).await;
    let _rx1 = join(&handle, 1).await;
    let _rx2 = join(&handle, 2).await;

    let (tx, mut rx3) = mpsc::unbounded_channel();
    let result = handle
        .join(ConnectionId::new(3), cid("c3"), "p3".into(), tx)
        .await;
    assert!(result.is_err());
    settle().await;
    assert!(drain(&mut rx3)
        .iter()
        .any(|ev| matches!(ev, ServerEvent::Error { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_turn_tick_heartbeat_counts_seconds() {
    let registry = RoomRegistry::new(8);
    let (_handle, mut outboxes) = started_room(&registry, 2).await;
    drain(&mut outboxes[0]);

    time::sleep(Duration::from_secs(3)).await;
    settle().await;

    let seconds: Vec<u32> = drain(&mut outboxes[0])
        .into_iter()
        .filter_map(|ev| match ev {
            ServerEvent::TurnTick { seconds, .. } => Some(seconds),
            _ => None,
        })
        .collect();
    assert!(seconds.len() >= 3);
    assert_eq!(&seconds[..3], &[1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_speech_deadline_walks_to_ballot() {
    let registry = RoomRegistry::new(8);
    let (handle, mut outboxes) = started_room(&registry, 2).await;

    send(&handle, 1, ClientEvent::StartVote { room_id: code() }).await;
    drain(&mut outboxes[1]);

    // Two speakers, one minute each; the deadline drives both.
    time::sleep(Duration::from_secs(61)).await;
    settle().await;
    time::sleep(Duration::from_secs(61)).await;
    settle().await;

    let phases: Vec<VotePhase> = drain(&mut outboxes[1])
        .into_iter()
        .filter_map(|ev| match ev {
            ServerEvent::VoteState(payload) => Some(payload.phase),
            _ => None,
        })
        .collect();
    assert!(phases.contains(&VotePhase::Ballot));
}

#[tokio::test(start_paused = true)]
async fn test_ballot_deadline_resolves_with_result() {
    let registry = RoomRegistry::new(8);
    let (handle, mut outboxes) = started_room(&registry, 3).await;

    send(&handle, 1, ClientEvent::StartVote { room_id: code() }).await;
    for n in 1..=3 {
        send(&handle, n, ClientEvent::FinishSpeech { room_id: code() }).await;
    }
    send(
        &handle,
        1,
        ClientEvent::CastVote {
            room_id: code(),
            target_id: cid("c3"),
        },
    )
    .await;
    drain(&mut outboxes[0]);

    // The other voters never vote; the 90s deadline closes the ballot.
    time::sleep(Duration::from_secs(91)).await;
    settle().await;

    let events = drain(&mut outboxes[0]);
    assert!(events.iter().any(|ev| matches!(
        ev,
        ServerEvent::VoteResult { last_vote, .. } if last_vote.total_voters == 1
    )));
    // One vote is a strict maximum: c3 is out.
    assert!(events.iter().any(|ev| matches!(
        ev,
        ServerEvent::GameState(state)
            if state.players.iter().any(|p| p.id == cid("c3") && p.kicked)
    )));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_before_grace_keeps_the_seat() {
    let registry = RoomRegistry::new(8);
    let (handle, mut outboxes) = started_room(&registry, 3).await;

    handle.disconnect(ConnectionId::new(2)).await.unwrap();
    time::sleep(Duration::from_secs(10)).await;

    // Back on a fresh connection inside the 30s window.
    let (tx, mut rx) = mpsc::unbounded_channel();
    handle
        .join(ConnectionId::new(22), cid("c2"), "p2".into(), tx)
        .await
        .expect("rejoin accepted");
    settle().await;

    let events = drain(&mut rx);
    assert!(events.iter().any(|ev| matches!(ev, ServerEvent::You { .. })));
    assert!(events
        .iter()
        .any(|ev| matches!(ev, ServerEvent::GameState(_))));

    // The old grace timer must not fire later and evict the player.
    time::sleep(Duration::from_secs(40)).await;
    settle().await;
    let events = drain(&mut outboxes[0]);
    assert!(!events.iter().any(|ev| matches!(
        ev,
        ServerEvent::Presence { players, .. } if !players.iter().any(|p| p.id == cid("c2"))
    )));
}

#[tokio::test(start_paused = true)]
async fn test_grace_expiry_drops_the_seat() {
    let registry = RoomRegistry::new(8);
    let (handle, mut outboxes) = started_room(&registry, 3).await;

    handle.disconnect(ConnectionId::new(3)).await.unwrap();
    time::sleep(Duration::from_secs(31)).await;
    settle().await;

    let events = drain(&mut outboxes[0]);
    assert!(events.iter().any(|ev| matches!(
        ev,
        ServerEvent::Presence { players, .. } if !players.iter().any(|p| p.id == cid("c3"))
    )));
}

#[tokio::test(start_paused = true)]
async fn test_empty_room_tears_down_after_grace() {
    let registry = RoomRegistry::new(8);
    let handle = registry.get_or_create(&code()).await;
    let _rx = join(&handle, 1).await;
    assert_eq!(registry.len().await, 1);

    handle.disconnect(ConnectionId::new(1)).await.unwrap();
    time::sleep(Duration::from_secs(16)).await;
    settle().await;

    assert!(registry.is_empty().await);
    // The handle now points at a stopped actor.
    assert!(handle.event(ConnectionId::new(1), ClientEvent::Sync { room_id: code() })
        .await
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn test_create_spawns_rooms_under_fresh_codes() {
    let registry = RoomRegistry::new(8);
    let a = registry.create().await;
    let b = registry.create().await;
    assert_ne!(a.code(), b.code());
    assert_eq!(registry.len().await, 2);

    // A created room is joinable by its code like any other.
    let found = registry.get(a.code()).await.expect("room registered");
    let mut rx = join(&found, 1).await;
    settle().await;
    assert!(drain(&mut rx)
        .iter()
        .any(|ev| matches!(ev, ServerEvent::RoomState(_))));
}

#[tokio::test(start_paused = true)]
async fn test_same_code_returns_same_room() {
    let registry = RoomRegistry::new(8);
    let a = registry.get_or_create(&code()).await;
    let b = registry.get_or_create(&code()).await;
    assert_eq!(a.code(), b.code());
    assert_eq!(registry.len().await, 1);
}
