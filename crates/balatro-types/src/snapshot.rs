//! The peer-reported game state and the items it contains.
//!
//! A [`Snapshot`] is replaced wholesale every time a new state envelope is
//! accepted; nothing in the bridge mutates one in place.

use serde::{Deserialize, Serialize};

use crate::enums::{BlindType, CardEdition, CardEnhancement, CardSeal, Phase};

/// Free-form extra attributes attached to cards, jokers and shop items.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A playing card in hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Peer-assigned card identifier.
    pub id: String,
    /// Rank label (`"A"`, `"10"`, `"K"`, ...).
    pub rank: String,
    /// Suit label.
    pub suit: String,
    /// Enhancement, `none` if absent.
    #[serde(default)]
    pub enhancement: CardEnhancement,
    /// Edition, `none` if absent.
    #[serde(default)]
    pub edition: CardEdition,
    /// Seal, `none` if absent.
    #[serde(default)]
    pub seal: CardSeal,
}

/// A persistent modifier held by the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joker {
    /// Peer-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Stable position index in the joker row.
    pub position: usize,
    /// Extra attributes.
    #[serde(default)]
    pub properties: Properties,
}

/// A single-use item (tarot, planet, spectral).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumable {
    /// Peer-assigned identifier, referenced by `use_consumable`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Kind of consumable (`"tarot"`, `"planet"`, ...).
    pub card_type: String,
    /// Extra attributes.
    #[serde(default)]
    pub properties: Properties,
}

/// The blind currently being played or offered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blind {
    /// Display name.
    pub name: String,
    /// Small, big or boss.
    pub blind_type: BlindType,
    /// Chips required to beat the blind.
    pub requirement: u64,
    /// Money awarded on success.
    pub reward: i64,
    /// Extra attributes.
    #[serde(default)]
    pub properties: Properties,
}

/// An offering in the shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopItem {
    /// Slot index in the shop.
    pub index: usize,
    /// `"joker"`, `"consumable"` or `"pack"`.
    pub item_type: String,
    /// Display name.
    pub name: String,
    /// Purchase price.
    pub cost: i64,
    /// Extra attributes.
    #[serde(default)]
    pub properties: Properties,
}

/// Complete peer-reported state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Opaque session identifier, fixed for the lifetime of a run.
    pub session_id: String,
    /// Current phase of the turn cycle.
    pub current_phase: Phase,
    /// Progression counter, never decreases within a session.
    pub ante: i64,
    /// Money held. May be negative with certain modifiers.
    pub money: i64,
    /// Hands left this round.
    pub hands_remaining: i64,
    /// Discards left this round.
    pub discards_remaining: i64,
    /// Cards in hand, in display order.
    pub hand_cards: Vec<Card>,
    /// Jokers in row order.
    pub jokers: Vec<Joker>,
    /// Consumables held.
    pub consumables: Vec<Consumable>,
    /// Blind in play, if any.
    #[serde(default)]
    pub current_blind: Option<Blind>,
    /// Shop offerings, empty outside the shop.
    #[serde(default)]
    pub shop_contents: Vec<ShopItem>,
    /// Wire names of the actions the peer will currently accept.
    pub available_actions: Vec<String>,
    /// Set during the short window after a hand when jokers may be reordered.
    #[serde(default)]
    pub post_hand_joker_reorder_available: bool,
}

impl Snapshot {
    /// Whether `action` (a wire name) is in the legal-action set.
    pub fn allows(&self, action: &str) -> bool {
        self.available_actions.iter().any(|a| a == action)
    }
}
