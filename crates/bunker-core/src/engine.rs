//! The engine façade: every way the outside world can poke a room.
//!
//! The room actor resolves connections to client ids, then calls one of
//! the four entry points here with the current wall-clock time. All
//! game rules live behind these functions; the actor only executes the
//! returned effects.

use bunker_protocol::{
    ClientEvent, ClientId, ConnectionId, ErrorReason, Recipient, ServerEvent,
};
use rand::prelude::*;
use tracing::{debug, info};

use crate::effect::{Effect, TimerEvent};
use crate::player::Player;
use crate::room::Room;
use crate::{deck, gameover, reveal, rounds, skip, turns, vote};

/// Minimum players to start a game.
pub const MIN_PLAYERS: u32 = 2;

fn error_to(room: &Room, who: &ClientId, reason: ErrorReason) -> Vec<Effect> {
    vec![Effect::Emit(
        Recipient::Player(who.clone()),
        ServerEvent::Error {
            room_id: Some(room.code.clone()),
            reason,
        },
    )]
}

fn you_event(player: &Player) -> ServerEvent {
    ServerEvent::You {
        hand: player.hand.clone(),
        hidden_key: player.hidden_key,
        revealed_keys: player.revealed_keys.clone(),
    }
}

fn roster_update(room: &Room) -> Vec<Effect> {
    vec![
        Effect::Emit(
            Recipient::All,
            ServerEvent::Presence {
                room_id: room.code.clone(),
                players: room.presence_players(),
                max_players: room.max_players,
            },
        ),
        Effect::Emit(Recipient::All, ServerEvent::RoomState(room.room_state_payload())),
    ]
}

/// Everything a (re)joining client needs to render the room.
fn sync_to(room: &Room, who: &ClientId) -> Vec<Effect> {
    let mut effects = Vec::new();
    if let Some(player) = room.players.get(who) {
        effects.push(Effect::Emit(Recipient::Player(who.clone()), you_event(player)));
    }
    effects.push(Effect::Emit(
        Recipient::Player(who.clone()),
        ServerEvent::RoomState(room.room_state_payload()),
    ));
    if room.started {
        effects.push(Effect::Emit(
            Recipient::Player(who.clone()),
            ServerEvent::GameState(room.game_state_payload()),
        ));
        effects.push(Effect::Emit(
            Recipient::Player(who.clone()),
            ServerEvent::VoteState(room.vote_payload()),
        ));
    }
    effects
}

/// Handles a join: a brand-new player, a rejoin from the reconnect
/// pool, or a fresh socket for someone already seated.
pub fn handle_join(
    room: &mut Room,
    conn: ConnectionId,
    client_id: &ClientId,
    nick: &str,
) -> Vec<Effect> {
    let mut effects = vec![Effect::CancelEmptyRoomGrace];

    if let Some(snapshot) = room.reconnect.remove(client_id) {
        // Back inside the grace window: full state comes back.
        info!(room = %room.code, client = %client_id, "player reconnected");
        let player = snapshot.restore(conn);
        room.players.insert(client_id.clone(), player);
        effects.push(Effect::CancelReconnectGrace(client_id.clone()));
    } else if let Some(player) = room.players.get_mut(client_id) {
        // Same identity on a new socket (page refresh).
        debug!(room = %room.code, client = %client_id, "connection replaced");
        player.conn = conn;
    } else {
        if room.started {
            return error_to(room, client_id, ErrorReason::GameStarted);
        }
        if room.active_count() >= room.max_players {
            return error_to(room, client_id, ErrorReason::Full);
        }
        let seat = room.next_seat;
        room.next_seat += 1;
        info!(room = %room.code, client = %client_id, seat, "player joined");
        room.players.insert(
            client_id.clone(),
            Player::new(client_id.clone(), conn, nick.to_string(), seat),
        );
        if room.host_id.is_none() {
            room.host_id = Some(client_id.clone());
        }
    }

    effects.extend(roster_update(room));
    effects.extend(sync_to(room, client_id));

    if room.started && !room.game_over {
        turns::ensure_turn_state(room);
        if room.current_turn_id.is_none() && !room.vote.is_active() {
            effects.extend(turns::advance_turn(room));
        }
    }
    effects
}

/// Removes a player for good: no reconnect pool, seat abandoned.
fn remove_player(room: &mut Room, client_id: &ClientId, now: u64) -> Vec<Effect> {
    room.players.remove(client_id);
    room.reconnect.remove(client_id);
    room.skip_votes.remove(client_id);
    let mut effects = vec![Effect::CancelReconnectGrace(client_id.clone())];

    // Host migration: lowest seat still present takes over.
    if room.host_id.as_ref() == Some(client_id) {
        room.host_id = room
            .players
            .values()
            .min_by_key(|p| p.seat)
            .map(|p| p.client_id.clone());
        info!(room = %room.code, new_host = ?room.host_id, "host migrated");
    }

    effects.extend(roster_update(room));

    if room.started && !room.game_over {
        let held_turn = room.current_turn_id.as_ref() == Some(client_id);
        let held_idx = room.turn_order.iter().position(|id| id == client_id);
        turns::ensure_turn_state(room);
        effects.extend(gameover::check(room, now));
        if !room.game_over && held_turn && !room.vote.is_active() {
            effects.extend(turns::advance_past(room, held_idx));
        }
    }
    if room.players.is_empty() {
        effects.push(Effect::ArmEmptyRoomGrace);
    }
    effects
}

fn start_game(room: &mut Room, sender: &ClientId, rng: &mut impl Rng) -> Vec<Effect> {
    if !room.is_host(sender) {
        return error_to(room, sender, ErrorReason::NotHost);
    }
    if room.started {
        return error_to(room, sender, ErrorReason::GameStarted);
    }
    if room.active_count() < MIN_PLAYERS {
        return error_to(room, sender, ErrorReason::NotEnoughPlayers);
    }

    room.started = true;
    let player_count = room.active_count();
    room.bunker = Some(deck::generate_bunker(rng, player_count));
    room.cataclysm = Some(deck::generate_cataclysm(rng));
    info!(room = %room.code, players = player_count, "game started");

    let mut effects = Vec::new();
    for player in room.players.values_mut() {
        player.hand = deck::generate_hand(rng);
        player.hidden_key = Some(deck::pick_hidden_key(rng));
    }
    for player in room.players.values() {
        effects.push(Effect::Emit(
            Recipient::Player(player.client_id.clone()),
            you_event(player),
        ));
    }

    effects.extend(roster_update(room));
    effects.push(Effect::Emit(
        Recipient::All,
        ServerEvent::GameState(room.game_state_payload()),
    ));
    effects.push(Effect::Emit(
        Recipient::All,
        ServerEvent::RoundState {
            room_id: room.code.clone(),
            number: room.round.number,
            quota: room.round.quota,
            revealed_by: room.round.revealed_by.clone(),
        },
    ));
    effects.extend(turns::advance_turn(room));
    effects
}

/// Dispatches one client event. `sender` is the resolved identity of
/// the connection that sent it.
pub fn handle_event(
    room: &mut Room,
    sender: &ClientId,
    event: ClientEvent,
    now: u64,
    rng: &mut impl Rng,
) -> Vec<Effect> {
    if !room.players.contains_key(sender) {
        return error_to(room, sender, ErrorReason::InvalidClient);
    }

    // After game over only the result screen matters: gameplay events
    // get the final state re-sent instead of an error.
    if room.game_over && gameplay_event(&event) {
        return vec![Effect::Emit(
            Recipient::Player(sender.clone()),
            ServerEvent::GameOver {
                room_id: room.code.clone(),
                winners: room.winners.clone(),
                cleanup_at: room.cleanup_at,
            },
        )];
    }

    match event {
        ClientEvent::Join { .. } => Vec::new(), // routed through handle_join
        ClientEvent::Leave { .. } => remove_player(room, sender, now),
        ClientEvent::StartGame { .. } => start_game(room, sender, rng),
        ClientEvent::RevealNext { .. } if room.started => reveal::reveal_next(room, sender),
        ClientEvent::RevealKey { key, .. } if room.started => {
            reveal::reveal_key(room, sender, key)
        }
        ClientEvent::VoteSkip { vote, .. } => skip::vote_skip(room, sender, vote, rng),
        ClientEvent::ForceSkip { .. } => skip::force_skip(room, sender, rng),
        ClientEvent::NextTurn { .. } if room.started => {
            let may_pass =
                room.current_turn_id.as_ref() == Some(sender) || room.is_host(sender);
            if may_pass && !room.vote.is_active() {
                turns::advance_turn(room)
            } else {
                Vec::new()
            }
        }
        ClientEvent::ForceTurn { player_id, .. } if room.started => {
            if !room.is_host(sender) {
                error_to(room, sender, ErrorReason::NotHost)
            } else if room.vote.is_active() || !room.turn_order.contains(&player_id) {
                Vec::new()
            } else {
                turns::begin_turn(room, Some(player_id))
            }
        }
        ClientEvent::StartVote { .. } if room.started => vote::start_vote(room, sender, now),
        ClientEvent::CastVote { target_id, .. } => vote::cast_vote(room, sender, &target_id, now),
        ClientEvent::ForceCloseVote { .. } => vote::force_close_vote(room, sender, now),
        ClientEvent::FinishSpeech { .. } => vote::finish_speech(room, sender, now),
        ClientEvent::SetRevealAll { on, .. } => {
            if !room.is_host(sender) {
                return error_to(room, sender, ErrorReason::NotHost);
            }
            room.reveal_all = on;
            vec![Effect::Emit(
                Recipient::All,
                ServerEvent::GameState(room.game_state_payload()),
            )]
        }
        ClientEvent::Sync { .. } => sync_to(room, sender),
        // Gameplay events before the game starts fall through here.
        _ => Vec::new(),
    }
}

fn gameplay_event(event: &ClientEvent) -> bool {
    !matches!(
        event,
        ClientEvent::Join { .. } | ClientEvent::Leave { .. } | ClientEvent::Sync { .. }
    )
}

/// A transport connection dropped without a `leave`.
///
/// Mid-game the player parks in the reconnect pool with a grace window;
/// pre-game they simply leave.
pub fn handle_disconnect(room: &mut Room, client_id: &ClientId, now: u64) -> Vec<Effect> {
    if !room.players.contains_key(client_id) {
        return Vec::new();
    }
    if !room.started || room.game_over {
        return remove_player(room, client_id, now);
    }

    let Some(player) = room.players.remove(client_id) else {
        return Vec::new();
    };
    info!(room = %room.code, client = %client_id, "player disconnected, grace armed");
    room.reconnect.insert(client_id.clone(), player.snapshot());
    room.skip_votes.remove(client_id);

    let mut effects = vec![Effect::ArmReconnectGrace(client_id.clone())];
    effects.extend(roster_update(room));
    if room.players.is_empty() {
        effects.push(Effect::ArmEmptyRoomGrace);
    }
    effects
}

/// A timer fired. Every arm re-validates current state: the room may
/// have moved on since the timer was scheduled.
pub fn handle_timer(room: &mut Room, event: TimerEvent, now: u64) -> Vec<Effect> {
    match event {
        TimerEvent::TurnTick => {
            if !room.started || room.game_over || room.current_turn_id.is_none() {
                return vec![Effect::ClearTurnTimer];
            }
            room.turn_seconds += 1;
            vec![Effect::Emit(
                Recipient::All,
                ServerEvent::TurnTick {
                    room_id: room.code.clone(),
                    seconds: room.display_turn_seconds(),
                },
            )]
        }
        TimerEvent::VoteDeadline => vote::on_deadline(room, now),
        TimerEvent::SpeechStart => {
            // Only if the quota still holds and nothing else started.
            if rounds::all_reached_quota(room) && !room.vote.is_active() {
                vote::begin_speeches(room, now)
            } else {
                Vec::new()
            }
        }
        TimerEvent::ReconnectExpired(client_id) => {
            if room.reconnect.remove(&client_id).is_none() {
                return Vec::new();
            }
            info!(room = %room.code, client = %client_id, "reconnect window expired");
            let held_turn = room.current_turn_id.as_ref() == Some(&client_id);
            let held_idx = room.turn_order.iter().position(|id| id == &client_id);
            room.skip_votes.remove(&client_id);
            turns::ensure_turn_state(room);

            let mut effects = roster_update(room);
            if room.started && !room.game_over {
                effects.extend(gameover::check(room, now));
                if !room.game_over && held_turn && !room.vote.is_active() {
                    effects.extend(turns::advance_past(room, held_idx));
                }
            }
            effects
        }
        TimerEvent::EmptyRoomExpired => {
            if room.players.is_empty() {
                vec![Effect::DestroyRoom]
            } else {
                Vec::new()
            }
        }
        TimerEvent::CleanupDue => {
            vec![
                Effect::Emit(
                    Recipient::All,
                    ServerEvent::RoomClosed {
                        room_id: room.code.clone(),
                    },
                ),
                Effect::DestroyRoom,
            ]
        }
    }
}
