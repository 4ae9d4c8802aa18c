//! Command and result payloads exchanged with the peer.
//!
//! [`ActionRequest`] is the closed set of commands the bridge can issue. On
//! the wire it is an object tagged by `action_type`; each variant carries
//! only the parameters it needs. [`ActionType`] is the field-less mirror used
//! for legal-action checks and logging.

use serde::{Deserialize, Serialize};

use crate::enums::BlindType;
use crate::snapshot::Snapshot;

/// Identifier of an action, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// See [`ActionRequest::PlayHand`].
    PlayHand,
    /// See [`ActionRequest::DiscardCards`].
    DiscardCards,
    /// See [`ActionRequest::GoToShop`].
    GoToShop,
    /// See [`ActionRequest::BuyItem`].
    BuyItem,
    /// See [`ActionRequest::SellJoker`].
    SellJoker,
    /// See [`ActionRequest::SellConsumable`].
    SellConsumable,
    /// See [`ActionRequest::ReorderJokers`].
    ReorderJokers,
    /// See [`ActionRequest::SelectBlind`].
    SelectBlind,
    /// See [`ActionRequest::SelectPackOffer`].
    SelectPackOffer,
    /// See [`ActionRequest::RerollBoss`].
    RerollBoss,
    /// See [`ActionRequest::RerollShop`].
    RerollShop,
    /// See [`ActionRequest::SortHandByRank`].
    SortHandByRank,
    /// See [`ActionRequest::SortHandBySuit`].
    SortHandBySuit,
    /// See [`ActionRequest::UseConsumable`].
    UseConsumable,
}

impl ActionType {
    /// Every action type, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::PlayHand,
        Self::DiscardCards,
        Self::GoToShop,
        Self::BuyItem,
        Self::SellJoker,
        Self::SellConsumable,
        Self::ReorderJokers,
        Self::SelectBlind,
        Self::SelectPackOffer,
        Self::RerollBoss,
        Self::RerollShop,
        Self::SortHandByRank,
        Self::SortHandBySuit,
        Self::UseConsumable,
    ];

    /// The wire name, as it appears in `action_type` and `available_actions`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlayHand => "play_hand",
            Self::DiscardCards => "discard_cards",
            Self::GoToShop => "go_to_shop",
            Self::BuyItem => "buy_item",
            Self::SellJoker => "sell_joker",
            Self::SellConsumable => "sell_consumable",
            Self::ReorderJokers => "reorder_jokers",
            Self::SelectBlind => "select_blind",
            Self::SelectPackOffer => "select_pack_offer",
            Self::RerollBoss => "reroll_boss",
            Self::RerollShop => "reroll_shop",
            Self::SortHandByRank => "sort_hand_by_rank",
            Self::SortHandBySuit => "sort_hand_by_suit",
            Self::UseConsumable => "use_consumable",
        }
    }

    /// Look up an action type by wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl core::fmt::Display for ActionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command for the peer to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum ActionRequest {
    /// Play the selected cards from hand.
    PlayHand {
        /// Hand positions of the cards to play.
        card_indices: Vec<usize>,
    },
    /// Discard the selected cards from hand.
    DiscardCards {
        /// Hand positions of the cards to discard.
        card_indices: Vec<usize>,
    },
    /// Leave the round for the shop.
    GoToShop,
    /// Buy a shop offering.
    BuyItem {
        /// Shop slot to buy.
        shop_index: usize,
    },
    /// Sell a joker.
    SellJoker {
        /// Joker row position.
        joker_index: usize,
    },
    /// Sell a consumable.
    SellConsumable {
        /// Consumable slot.
        consumable_index: usize,
    },
    /// Rearrange the joker row.
    ReorderJokers {
        /// `new_order[i]` is the current position of the joker that should
        /// end up at position `i`.
        new_order: Vec<usize>,
    },
    /// Choose the next blind.
    SelectBlind {
        /// Which blind to take.
        blind_type: BlindType,
    },
    /// Pick a card from an opened booster pack.
    SelectPackOffer {
        /// Offer slot in the pack.
        pack_index: usize,
    },
    /// Reroll the boss blind.
    RerollBoss,
    /// Reroll shop offerings.
    RerollShop,
    /// Sort the hand by rank.
    SortHandByRank,
    /// Sort the hand by suit.
    SortHandBySuit,
    /// Use a held consumable.
    UseConsumable {
        /// Identifier of the consumable.
        item_id: String,
    },
}

impl ActionRequest {
    /// The parameter-less identifier of this request.
    pub const fn action_type(&self) -> ActionType {
        match self {
            Self::PlayHand { .. } => ActionType::PlayHand,
            Self::DiscardCards { .. } => ActionType::DiscardCards,
            Self::GoToShop => ActionType::GoToShop,
            Self::BuyItem { .. } => ActionType::BuyItem,
            Self::SellJoker { .. } => ActionType::SellJoker,
            Self::SellConsumable { .. } => ActionType::SellConsumable,
            Self::ReorderJokers { .. } => ActionType::ReorderJokers,
            Self::SelectBlind { .. } => ActionType::SelectBlind,
            Self::SelectPackOffer { .. } => ActionType::SelectPackOffer,
            Self::RerollBoss => ActionType::RerollBoss,
            Self::RerollShop => ActionType::RerollShop,
            Self::SortHandByRank => ActionType::SortHandByRank,
            Self::SortHandBySuit => ActionType::SortHandBySuit,
            Self::UseConsumable { .. } => ActionType::UseConsumable,
        }
    }
}

/// Outcome of a command, as reported by the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the peer executed the command.
    pub success: bool,
    /// Peer-supplied explanation when `success` is false.
    #[serde(default)]
    pub error_message: Option<String>,
    /// State after execution, when the peer includes one.
    #[serde(default, alias = "new_state")]
    pub updated_snapshot: Option<Snapshot>,
}

impl ActionResult {
    /// A failed result carrying only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            updated_snapshot: None,
        }
    }
}
