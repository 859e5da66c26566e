//! Dealing: hands, hidden keys, bunker and cataclysm generation.
//!
//! The pools are intentionally small and flavorless compared to a real
//! card set; the rules only care that every core key gets a value.

use bunker_protocol::{AttrKey, BunkerInfo, CataclysmInfo, Hand};
use rand::prelude::*;

const GENDERS: &[&str] = &["male", "female"];
const BODIES: &[&str] = &["slim", "average", "athletic", "heavy"];
const TRAITS: &[&str] = &[
    "optimist", "pessimist", "hot-tempered", "calm", "paranoid", "charismatic",
];
const PROFESSIONS: &[&str] = &[
    "medic", "engineer", "farmer", "soldier", "teacher", "chemist", "cook", "electrician",
    "psychologist", "builder",
];
const HEALTHS: &[&str] = &[
    "healthy", "asthma", "nearsighted", "allergic", "chronic fatigue", "perfect health",
];
const HOBBIES: &[&str] = &[
    "chess", "hunting", "gardening", "ham radio", "first aid courses", "carpentry",
];
const PHOBIAS: &[&str] = &[
    "claustrophobia", "darkness", "heights", "insects", "loneliness", "blood",
];
const BIG_ITEMS: &[&str] = &[
    "generator", "water filter", "toolbox", "rifle", "seed bank", "medical kit",
];
const BACKPACKS: &[&str] = &[
    "canned food", "rope", "flashlight", "antibiotics", "map of the area", "batteries",
];
const EXTRAS: &[&str] = &[
    "knows morse code", "former scout", "speaks three languages", "insomniac",
    "distant relative of the host", "keeps a diary",
];
const ABILITIES: &[&str] = &[
    "swap professions with another player",
    "peek at one hidden attribute",
    "cancel one vote against you",
    "force a player to reveal health",
    "reroll your own health",
    "trade backpacks with a neighbor",
];

const BUNKER_DESCRIPTIONS: &[&str] = &[
    "an old missile silo with working ventilation",
    "a converted wine cellar under a monastery",
    "a research station buried in permafrost",
    "a subway depot sealed behind blast doors",
];

const CATACLYSMS: &[(&str, &str)] = &[
    ("Nuclear winter", "Fallout has made the surface lethal for a decade."),
    ("Pandemic", "An airborne pathogen with no known cure is spreading."),
    ("Impact event", "An asteroid strike has filled the sky with ash."),
    ("Supervolcano", "Eruptions have collapsed agriculture worldwide."),
];

fn pick(rng: &mut impl Rng, pool: &[&str]) -> String {
    pool[rng.random_range(0..pool.len())].to_string()
}

/// Deals a full hand: every core attribute plus two distinct abilities.
pub fn generate_hand(rng: &mut impl Rng) -> Hand {
    let mut hand = Hand::default();
    hand.0.insert(AttrKey::Gender, pick(rng, GENDERS));
    hand.0.insert(AttrKey::Body, pick(rng, BODIES));
    hand.0.insert(AttrKey::Trait, pick(rng, TRAITS));
    hand.0.insert(AttrKey::Profession, pick(rng, PROFESSIONS));
    hand.0.insert(AttrKey::Health, pick(rng, HEALTHS));
    hand.0.insert(AttrKey::Hobby, pick(rng, HOBBIES));
    hand.0.insert(AttrKey::Phobia, pick(rng, PHOBIAS));
    hand.0.insert(AttrKey::BigItem, pick(rng, BIG_ITEMS));
    hand.0.insert(AttrKey::Backpack, pick(rng, BACKPACKS));
    hand.0.insert(AttrKey::Extra, pick(rng, EXTRAS));

    let mut abilities: Vec<&str> = ABILITIES.to_vec();
    abilities.shuffle(rng);
    hand.0.insert(AttrKey::Ability1, abilities[0].to_string());
    hand.0.insert(AttrKey::Ability2, abilities[1].to_string());
    hand
}

/// Picks the one core attribute this player can never be forced to show.
///
/// Profession is excluded: round 1 requires revealing it, so hiding it
/// would deadlock the player.
pub fn pick_hidden_key(rng: &mut impl Rng) -> AttrKey {
    let candidates: Vec<AttrKey> = AttrKey::CORE
        .iter()
        .copied()
        .filter(|k| *k != AttrKey::Profession)
        .collect();
    candidates[rng.random_range(0..candidates.len())]
}

/// Bunker capacity for `n` starting players: half rounded down, at
/// least one, but a flat two for the small 3-5 player games.
pub fn bunker_places(n: u32) -> u32 {
    if (3..=5).contains(&n) {
        2
    } else {
        (n / 2).max(1)
    }
}

pub fn generate_bunker(rng: &mut impl Rng, player_count: u32) -> BunkerInfo {
    BunkerInfo {
        places: bunker_places(player_count),
        description: pick(rng, BUNKER_DESCRIPTIONS),
    }
}

pub fn generate_cataclysm(rng: &mut impl Rng) -> CataclysmInfo {
    let (title, description) = CATACLYSMS[rng.random_range(0..CATACLYSMS.len())];
    CataclysmInfo {
        title: title.to_string(),
        description: description.to_string(),
    }
}
