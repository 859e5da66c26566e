//! Attribute keys on a player's hand.
//!
//! A hand is ten **core** attributes plus two **ability** attributes.
//! Core keys are subject to the round quota and the reveal-ordering rules;
//! ability keys are revealable once each at any time, including mid-vote,
//! and never count toward the quota.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One attribute slot on a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttrKey {
    Gender,
    Body,
    Trait,
    Profession,
    Health,
    Hobby,
    Phobia,
    BigItem,
    Backpack,
    Extra,
    Ability1,
    Ability2,
}

impl AttrKey {
    /// The ten core keys, in the fixed "reveal next" order.
    ///
    /// `reveal_next` walks this list; profession sits where the original
    /// deck places it, but round 1 forces it first regardless.
    pub const CORE: [AttrKey; 10] = [
        AttrKey::Gender,
        AttrKey::Body,
        AttrKey::Trait,
        AttrKey::Profession,
        AttrKey::Health,
        AttrKey::Hobby,
        AttrKey::Phobia,
        AttrKey::BigItem,
        AttrKey::Backpack,
        AttrKey::Extra,
    ];

    /// The two ability keys.
    pub const ABILITIES: [AttrKey; 2] = [AttrKey::Ability1, AttrKey::Ability2];

    /// Returns `true` for `ability1`/`ability2`.
    pub fn is_ability(self) -> bool {
        matches!(self, AttrKey::Ability1 | AttrKey::Ability2)
    }

    /// The wire name of this key (camelCase, matching the JSON form).
    pub fn as_str(self) -> &'static str {
        match self {
            AttrKey::Gender => "gender",
            AttrKey::Body => "body",
            AttrKey::Trait => "trait",
            AttrKey::Profession => "profession",
            AttrKey::Health => "health",
            AttrKey::Hobby => "hobby",
            AttrKey::Phobia => "phobia",
            AttrKey::BigItem => "bigItem",
            AttrKey::Backpack => "backpack",
            AttrKey::Extra => "extra",
            AttrKey::Ability1 => "ability1",
            AttrKey::Ability2 => "ability2",
        }
    }
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
