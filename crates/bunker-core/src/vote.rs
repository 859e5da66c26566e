//! The elimination vote: speeches, then a ballot, then at most one kick.
//!
//! The phase lives in [`VoteState`]; this module owns the transitions.
//! Deadlines are wall-clock unix seconds carried in the state, so a
//! firing timer can tell a stale deadline from a live one.

use std::collections::HashMap;

use bunker_protocol::{ClientId, ErrorReason, LastVote, Recipient, ServerEvent};
use tracing::info;

use crate::effect::Effect;
use crate::room::{BallotState, Room, VoteState};
use crate::{gameover, rounds, turns};

/// Each speaker gets one minute.
pub const SPEECH_SECS: u64 = 60;
/// The ballot stays open for ninety seconds.
pub const BALLOT_SECS: u64 = 90;

fn vote_broadcast(room: &Room) -> Effect {
    Effect::Emit(Recipient::All, ServerEvent::VoteState(room.vote_payload()))
}

fn not_host(room: &Room, sender: &ClientId) -> Vec<Effect> {
    vec![Effect::Emit(
        Recipient::Player(sender.clone()),
        ServerEvent::Error {
            room_id: Some(room.code.clone()),
            reason: ErrorReason::NotHost,
        },
    )]
}

/// Opens the speeches phase: the turn pauses, every active player gets
/// a speech window in turn order.
pub fn begin_speeches(room: &mut Room, now: u64) -> Vec<Effect> {
    if !room.started || room.game_over || room.vote.is_active() {
        return Vec::new();
    }
    turns::ensure_turn_state(room);
    let order = room.active_ids();
    if order.len() < 2 {
        return Vec::new();
    }
    info!(room = %room.code, speakers = order.len(), "speeches begin");

    room.current_turn_id = None;
    room.skip_votes.clear();
    let ends_at = now + SPEECH_SECS;
    room.vote = VoteState::Speeches {
        order,
        speaking_idx: 0,
        ends_at,
    };

    vec![
        Effect::ClearTurnTimer,
        Effect::Emit(
            Recipient::All,
            ServerEvent::Turn {
                room_id: room.code.clone(),
                current_turn_id: None,
            },
        ),
        vote_broadcast(room),
        Effect::ScheduleVoteTick { ends_at },
    ]
}

/// Host manually opens the vote.
pub fn start_vote(room: &mut Room, sender: &ClientId, now: u64) -> Vec<Effect> {
    if !room.is_host(sender) {
        return not_host(room, sender);
    }
    if room.active_ids().len() < 2 {
        return vec![Effect::Emit(
            Recipient::Player(sender.clone()),
            ServerEvent::Error {
                room_id: Some(room.code.clone()),
                reason: ErrorReason::NotEnoughPlayers,
            },
        )];
    }
    begin_speeches(room, now)
}

/// Opens the ballot: eligibility is frozen to the players active right
/// now, so a mid-ballot disconnect cannot shrink the electorate.
fn enter_ballot(room: &mut Room, now: u64) -> Vec<Effect> {
    let ends_at = now + BALLOT_SECS;
    let ballot = BallotState {
        active_at_vote: room.active_ids().into_iter().collect(),
        ..Default::default()
    };
    info!(room = %room.code, voters = ballot.active_at_vote.len(), "ballot opens");
    room.vote = VoteState::Ballot { ends_at, ballot };
    vec![vote_broadcast(room), Effect::ScheduleVoteTick { ends_at }]
}

/// Moves to the next speaker, or to the ballot after the last one.
fn next_speech_or_ballot(room: &mut Room, now: u64) -> Vec<Effect> {
    let VoteState::Speeches {
        order,
        speaking_idx,
        ..
    } = &room.vote
    else {
        return Vec::new();
    };
    let next_idx = speaking_idx + 1;
    if next_idx >= order.len() {
        return enter_ballot(room, now);
    }
    let ends_at = now + SPEECH_SECS;
    let order = order.clone();
    room.vote = VoteState::Speeches {
        order,
        speaking_idx: next_idx,
        ends_at,
    };
    vec![vote_broadcast(room), Effect::ScheduleVoteTick { ends_at }]
}

/// The current speaker yields the rest of their window.
pub fn finish_speech(room: &mut Room, sender: &ClientId, now: u64) -> Vec<Effect> {
    let VoteState::Speeches {
        order, speaking_idx, ..
    } = &room.vote
    else {
        return Vec::new();
    };
    if order.get(*speaking_idx) != Some(sender) {
        return Vec::new();
    }
    next_speech_or_ballot(room, now)
}

/// Casts one ballot vote. Rejections are silent; the client's own
/// vote-state copy already reflects what it may do.
pub fn cast_vote(
    room: &mut Room,
    voter: &ClientId,
    target: &ClientId,
    now: u64,
) -> Vec<Effect> {
    let VoteState::Ballot { ballot, .. } = &mut room.vote else {
        return Vec::new();
    };
    if !ballot.active_at_vote.contains(voter)
        || ballot.voted_by.contains(voter)
        || voter == target
        || !ballot.active_at_vote.contains(target)
    {
        return Vec::new();
    }
    if let Some(allowed) = &ballot.allowed_targets {
        if !allowed.contains(target) {
            return Vec::new();
        }
    }
    ballot.add_vote(voter.clone(), target.clone());

    let everyone_voted = ballot.voted_by.len() == ballot.active_at_vote.len();
    let mut effects = vec![vote_broadcast(room)];
    if everyone_voted {
        effects.extend(finish_ballot(room, now));
    }
    effects
}

/// Host closes the phase early: speeches jump to the ballot, an open
/// ballot resolves with the votes cast so far.
pub fn force_close_vote(room: &mut Room, sender: &ClientId, now: u64) -> Vec<Effect> {
    if !room.is_host(sender) {
        return not_host(room, sender);
    }
    match &room.vote {
        VoteState::Speeches { .. } => enter_ballot(room, now),
        VoteState::Ballot { .. } => finish_ballot(room, now),
        VoteState::Idle => Vec::new(),
    }
}

/// The vote deadline fired. Stale deadlines (the phase moved on and a
/// newer timer exists) are ignored by comparing against the stored one.
pub fn on_deadline(room: &mut Room, now: u64) -> Vec<Effect> {
    match &room.vote {
        VoteState::Speeches { ends_at, .. } => {
            let ends_at = *ends_at;
            if now < ends_at {
                return vec![Effect::ScheduleVoteTick { ends_at }];
            }
            next_speech_or_ballot(room, now)
        }
        VoteState::Ballot { ends_at, .. } => {
            let ends_at = *ends_at;
            if now < ends_at {
                return vec![Effect::ScheduleVoteTick { ends_at }];
            }
            finish_ballot(room, now)
        }
        VoteState::Idle => Vec::new(),
    }
}

/// Resolves the ballot: at most one player is kicked.
///
/// The tally is scanned in first-vote order, so a tied top count kicks
/// whoever reached it first. Zero votes kicks nobody.
fn finish_ballot(room: &mut Room, now: u64) -> Vec<Effect> {
    let VoteState::Ballot { ballot, .. } = std::mem::take(&mut room.vote) else {
        return Vec::new();
    };

    // First strictly-greater wins; a later tie never displaces an
    // earlier target.
    let mut top: Option<(&ClientId, u32)> = None;
    for (id, count) in &ballot.tally {
        if top.is_none_or(|(_, best)| *count > best) {
            top = Some((id, *count));
        }
    }
    let kicked = top.map(|(id, _)| id.clone());

    let mut voters_by_target: HashMap<ClientId, Vec<ClientId>> = HashMap::new();
    for (voter, target) in &ballot.by_voter {
        voters_by_target
            .entry(target.clone())
            .or_default()
            .push(voter.clone());
    }
    let last_vote = LastVote {
        at: now,
        totals: ballot.tally.iter().cloned().collect(),
        voters_by_target,
        total_voters: ballot.voted_by.len() as u32,
        total_eligible: ballot.active_at_vote.len() as u32,
    };
    info!(room = %room.code, kicked = ?kicked, voters = last_vote.total_voters, "ballot resolved");

    if let Some(id) = &kicked {
        if let Some(p) = room.players.get_mut(id) {
            p.kicked = true;
        } else if let Some(p) = room.reconnect.get_mut(id) {
            p.kicked = true;
        }
        room.turn_order.retain(|t| t != id);
        room.skip_votes.remove(id);
        if room.current_turn_id.as_ref() == Some(id) {
            room.current_turn_id = None;
        }
    }
    room.last_vote = Some(last_vote.clone());

    let mut effects = vec![
        Effect::ClearVoteTick,
        Effect::Emit(
            Recipient::All,
            ServerEvent::VoteResult {
                room_id: room.code.clone(),
                last_vote,
            },
        ),
        vote_broadcast(room),
    ];

    effects.extend(gameover::check(room, now));
    if !room.game_over {
        rounds::advance_round(room);
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
    }
    effects.push(Effect::Emit(
        Recipient::All,
        ServerEvent::GameState(room.game_state_payload()),
    ));
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunker_protocol::{AttrKey, ConnectionId, RoomCode};

    use crate::deck;
    use crate::player::Player;

    fn started_room(n: u32) -> Room {
        let mut rng = rand::rng();
        let mut room = Room::new(RoomCode::from("ABCD"), 8);
        room.started = true;
        room.host_id = Some(ClientId::from("c1"));
        room.bunker = Some(deck::generate_bunker(&mut rng, n));
        for i in 1..=n {
            let cid = ClientId(format!("c{i}"));
            let mut p = Player::new(cid.clone(), ConnectionId::new(i as u64), format!("p{i}"), i);
            p.hand = deck::generate_hand(&mut rng);
            p.hidden_key = Some(AttrKey::Phobia);
            room.players.insert(cid.clone(), p);
            room.turn_order.push(cid);
        }
        room
    }

    fn cid(s: &str) -> ClientId {
        ClientId::from(s)
    }

    fn into_ballot(room: &mut Room, now: u64) {
        begin_speeches(room, now);
        loop {
            match &room.vote {
                VoteState::Speeches { .. } => {
                    next_speech_or_ballot(room, now);
                }
                VoteState::Ballot { .. } => break,
                VoteState::Idle => panic!("vote fell back to idle"),
            }
        }
    }

    #[test]
    fn test_speeches_walk_turn_order_then_open_ballot() {
        let mut room = started_room(3);
        begin_speeches(&mut room, 100);
        assert!(matches!(
            &room.vote,
            VoteState::Speeches { speaking_idx: 0, ends_at, .. } if *ends_at == 100 + SPEECH_SECS
        ));
        assert_eq!(room.current_turn_id, None);

        next_speech_or_ballot(&mut room, 160);
        assert!(matches!(&room.vote, VoteState::Speeches { speaking_idx: 1, .. }));
        next_speech_or_ballot(&mut room, 220);
        assert!(matches!(&room.vote, VoteState::Speeches { speaking_idx: 2, .. }));
        next_speech_or_ballot(&mut room, 280);
        assert!(matches!(
            &room.vote,
            VoteState::Ballot { ends_at, .. } if *ends_at == 280 + BALLOT_SECS
        ));
    }

    #[test]
    fn test_begin_speeches_requires_two_active() {
        let mut room = started_room(2);
        room.players.get_mut(&cid("c2")).unwrap().kicked = true;
        assert!(begin_speeches(&mut room, 100).is_empty());
        assert!(matches!(room.vote, VoteState::Idle));
    }

    #[test]
    fn test_only_current_speaker_can_finish_early() {
        let mut room = started_room(3);
        begin_speeches(&mut room, 100);
        assert!(finish_speech(&mut room, &cid("c2"), 110).is_empty());
        let effects = finish_speech(&mut room, &cid("c1"), 110);
        assert!(!effects.is_empty());
        assert!(matches!(&room.vote, VoteState::Speeches { speaking_idx: 1, .. }));
    }

    #[test]
    fn test_ballot_rejects_self_votes_and_double_votes() {
        let mut room = started_room(4);
        into_ballot(&mut room, 100);

        assert!(cast_vote(&mut room, &cid("c1"), &cid("c1"), 110).is_empty());
        assert!(!cast_vote(&mut room, &cid("c1"), &cid("c2"), 110).is_empty());
        assert!(cast_vote(&mut room, &cid("c1"), &cid("c3"), 111).is_empty());
    }

    #[test]
    fn test_ballot_resolves_when_everyone_voted() {
        let mut room = started_room(4);
        into_ballot(&mut room, 100);

        cast_vote(&mut room, &cid("c1"), &cid("c4"), 110);
        cast_vote(&mut room, &cid("c2"), &cid("c4"), 111);
        cast_vote(&mut room, &cid("c3"), &cid("c4"), 112);
        let effects = cast_vote(&mut room, &cid("c4"), &cid("c1"), 113);

        assert!(room.players[&cid("c4")].kicked);
        assert!(!room.turn_order.contains(&cid("c4")));
        assert!(matches!(room.vote, VoteState::Idle));
        let last = room.last_vote.as_ref().unwrap();
        assert_eq!(last.totals[&cid("c4")], 3);
        assert_eq!(last.total_voters, 4);
        assert_eq!(last.total_eligible, 4);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Emit(_, ServerEvent::VoteResult { .. }))));
    }

    #[test]
    fn test_tied_top_count_kicks_the_earlier_target() {
        let mut room = started_room(4);
        into_ballot(&mut room, 100);

        // c2 reaches its votes before c1 does.
        cast_vote(&mut room, &cid("c1"), &cid("c2"), 110);
        cast_vote(&mut room, &cid("c3"), &cid("c1"), 111);
        cast_vote(&mut room, &cid("c4"), &cid("c2"), 112);
        cast_vote(&mut room, &cid("c2"), &cid("c1"), 113);

        assert!(room.players[&cid("c2")].kicked);
        assert!(!room.players[&cid("c1")].kicked);
    }

    #[test]
    fn test_empty_ballot_kicks_nobody() {
        let mut room = started_room(3);
        into_ballot(&mut room, 100);

        // Deadline passes with no votes cast.
        let effects = on_deadline(&mut room, 100 + BALLOT_SECS);
        assert!(room.players.values().all(|p| !p.kicked));
        assert!(matches!(room.vote, VoteState::Idle));
        // The round still advances.
        assert_eq!(room.round.number, 2);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Emit(_, ServerEvent::VoteResult { .. }))));
    }

    #[test]
    fn test_stale_deadline_reschedules() {
        let mut room = started_room(3);
        begin_speeches(&mut room, 100);
        // Fires early relative to the stored deadline.
        let effects = on_deadline(&mut room, 120);
        assert_eq!(
            effects,
            vec![Effect::ScheduleVoteTick { ends_at: 100 + SPEECH_SECS }]
        );
        assert!(matches!(&room.vote, VoteState::Speeches { speaking_idx: 0, .. }));
    }

    #[test]
    fn test_round_advances_after_ballot() {
        let mut room = started_room(4);
        room.round.revealed_by.insert(cid("c1"), 3);
        into_ballot(&mut room, 100);
        on_deadline(&mut room, 100 + BALLOT_SECS);
        assert_eq!(room.round.number, 2);
        assert_eq!(room.round.quota, 2);
        assert!(room.round.revealed_by.is_empty());
        // Play resumed with a fresh turn.
        assert!(room.current_turn_id.is_some());
    }

    #[test]
    fn test_force_close_vote_is_host_only() {
        let mut room = started_room(3);
        into_ballot(&mut room, 100);
        let effects = force_close_vote(&mut room, &cid("c2"), 110);
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Emit(_, ServerEvent::Error { reason, .. })
                if *reason == ErrorReason::NotHost
        )));
        assert!(matches!(&room.vote, VoteState::Ballot { .. }));

        force_close_vote(&mut room, &cid("c1"), 110);
        assert!(matches!(room.vote, VoteState::Idle));
    }

    #[test]
    fn test_mid_ballot_disconnect_keeps_electorate_frozen() {
        let mut room = started_room(4);
        into_ballot(&mut room, 100);

        // c4 disconnects into the reconnect pool mid-ballot.
        let snap = room.players.remove(&cid("c4")).unwrap().snapshot();
        room.reconnect.insert(snap.client_id.clone(), snap);

        cast_vote(&mut room, &cid("c1"), &cid("c2"), 110);
        cast_vote(&mut room, &cid("c2"), &cid("c3"), 111);
        cast_vote(&mut room, &cid("c3"), &cid("c2"), 112);
        // Three of four eligible voted; the ballot stays open for c4.
        assert!(matches!(&room.vote, VoteState::Ballot { .. }));
    }
}
