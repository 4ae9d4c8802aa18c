//! Admission control for commands.
//!
//! [`validate_action`] decides, from the last observed snapshot alone,
//! whether a command may be sent to the peer. It runs two stages:
//! 1. Legality -- the action's wire name must be in the snapshot's
//!    `available_actions`.
//! 2. Rules -- the per-action precondition (phase, counters, index ranges,
//!    money, permutation shape).
//!
//! Each stage returns `Ok(())` on success or a [`RejectionReason`] on failure.

use std::collections::BTreeSet;

use balatro_types::{ActionRequest, ActionType, Phase, Snapshot};
use serde::Serialize;

/// Why a command was refused before reaching the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The peer does not currently list this action as legal.
    #[error("{action} is not currently available")]
    NotAvailable {
        /// The refused action.
        action: ActionType,
    },

    /// The action needs a different phase.
    #[error("{action} requires the {required} phase, current phase is {actual}")]
    WrongPhase {
        /// The refused action.
        action: ActionType,
        /// Phase the action needs.
        required: Phase,
        /// Phase the snapshot is in.
        actual: Phase,
    },

    /// No hands left this round.
    #[error("no hands remaining")]
    NoHandsRemaining,

    /// No discards left this round.
    #[error("no discards remaining")]
    NoDiscardsRemaining,

    /// A card selection was empty.
    #[error("no cards selected")]
    EmptySelection,

    /// A selected card position is past the end of the hand.
    #[error("card index {index} is out of range for a hand of {hand_size}")]
    CardIndexOutOfRange {
        /// The offending position.
        index: usize,
        /// Cards in hand.
        hand_size: usize,
    },

    /// The shop slot does not exist.
    #[error("shop index {index} is out of range for {shop_size} offerings")]
    ShopIndexOutOfRange {
        /// The offending slot.
        index: usize,
        /// Offerings in the shop.
        shop_size: usize,
    },

    /// The item costs more than the player holds.
    #[error("item costs {cost} but only {money} is available")]
    InsufficientMoney {
        /// Price of the item.
        cost: i64,
        /// Money held.
        money: i64,
    },

    /// The joker position does not exist.
    #[error("joker index {index} is out of range for {count} jokers")]
    JokerIndexOutOfRange {
        /// The offending position.
        index: usize,
        /// Jokers held.
        count: usize,
    },

    /// The consumable slot does not exist.
    #[error("consumable index {index} is out of range for {count} consumables")]
    ConsumableIndexOutOfRange {
        /// The offending slot.
        index: usize,
        /// Consumables held.
        count: usize,
    },

    /// Jokers can only be reordered right after a hand is played.
    #[error("joker reorder window is closed")]
    ReorderWindowClosed,

    /// The new order does not cover every joker exactly once.
    #[error("new order {new_order:?} is not a permutation of 0..{count}")]
    NotAPermutation {
        /// The requested order.
        new_order: Vec<usize>,
        /// Jokers held.
        count: usize,
    },

    /// No held consumable has the given id.
    #[error("no consumable with id {item_id:?}")]
    UnknownConsumable {
        /// The requested id.
        item_id: String,
    },
}

/// Decide whether `action` may be sent given `snapshot`.
///
/// # Errors
///
/// Returns the first [`RejectionReason`] found.
pub fn validate_action(action: &ActionRequest, snapshot: &Snapshot) -> Result<(), RejectionReason> {
    // Stage 1: Legality
    validate_available(action.action_type(), snapshot)?;

    // Stage 2: Per-action rules
    match action {
        ActionRequest::PlayHand { card_indices } => {
            require_phase(ActionType::PlayHand, Phase::HandSelection, snapshot)?;
            if snapshot.hands_remaining <= 0 {
                return Err(RejectionReason::NoHandsRemaining);
            }
            validate_card_selection(card_indices, snapshot)
        }
        ActionRequest::DiscardCards { card_indices } => {
            require_phase(ActionType::DiscardCards, Phase::HandSelection, snapshot)?;
            if snapshot.discards_remaining <= 0 {
                return Err(RejectionReason::NoDiscardsRemaining);
            }
            validate_card_selection(card_indices, snapshot)
        }
        ActionRequest::GoToShop => require_phase(ActionType::GoToShop, Phase::HandSelection, snapshot),
        ActionRequest::BuyItem { shop_index } => {
            require_phase(ActionType::BuyItem, Phase::Shop, snapshot)?;
            let item = snapshot.shop_contents.get(*shop_index).ok_or(
                RejectionReason::ShopIndexOutOfRange {
                    index: *shop_index,
                    shop_size: snapshot.shop_contents.len(),
                },
            )?;
            if snapshot.money < item.cost {
                return Err(RejectionReason::InsufficientMoney {
                    cost: item.cost,
                    money: snapshot.money,
                });
            }
            Ok(())
        }
        ActionRequest::SellJoker { joker_index } => {
            require_phase(ActionType::SellJoker, Phase::Shop, snapshot)?;
            if *joker_index >= snapshot.jokers.len() {
                return Err(RejectionReason::JokerIndexOutOfRange {
                    index: *joker_index,
                    count: snapshot.jokers.len(),
                });
            }
            Ok(())
        }
        ActionRequest::SellConsumable { consumable_index } => {
            require_phase(ActionType::SellConsumable, Phase::Shop, snapshot)?;
            if *consumable_index >= snapshot.consumables.len() {
                return Err(RejectionReason::ConsumableIndexOutOfRange {
                    index: *consumable_index,
                    count: snapshot.consumables.len(),
                });
            }
            Ok(())
        }
        ActionRequest::ReorderJokers { new_order } => validate_reorder(new_order, snapshot),
        ActionRequest::SelectBlind { .. } => {
            require_phase(ActionType::SelectBlind, Phase::BlindSelection, snapshot)
        }
        ActionRequest::RerollBoss => {
            require_phase(ActionType::RerollBoss, Phase::BlindSelection, snapshot)
        }
        ActionRequest::RerollShop => require_phase(ActionType::RerollShop, Phase::Shop, snapshot),
        ActionRequest::SortHandByRank => {
            require_phase(ActionType::SortHandByRank, Phase::HandSelection, snapshot)
        }
        ActionRequest::SortHandBySuit => {
            require_phase(ActionType::SortHandBySuit, Phase::HandSelection, snapshot)
        }
        ActionRequest::UseConsumable { item_id } => {
            if snapshot.consumables.iter().any(|c| &c.id == item_id) {
                Ok(())
            } else {
                Err(RejectionReason::UnknownConsumable {
                    item_id: item_id.clone(),
                })
            }
        }
        // Nothing in the snapshot describes open packs.
        ActionRequest::SelectPackOffer { .. } => Ok(()),
    }
}

/// The wire names of the actions the peer currently accepts.
pub fn available_actions(snapshot: &Snapshot) -> Vec<String> {
    snapshot.available_actions.clone()
}

/// Stage 1: the action must be listed by the peer.
fn validate_available(action: ActionType, snapshot: &Snapshot) -> Result<(), RejectionReason> {
    if snapshot.allows(action.as_str()) {
        Ok(())
    } else {
        Err(RejectionReason::NotAvailable { action })
    }
}

fn require_phase(
    action: ActionType,
    required: Phase,
    snapshot: &Snapshot,
) -> Result<(), RejectionReason> {
    if snapshot.current_phase == required {
        Ok(())
    } else {
        Err(RejectionReason::WrongPhase {
            action,
            required,
            actual: snapshot.current_phase,
        })
    }
}

/// Every index must address a card in hand, and at least one must be given.
fn validate_card_selection(indices: &[usize], snapshot: &Snapshot) -> Result<(), RejectionReason> {
    let hand_size = snapshot.hand_cards.len();
    if let Some(&index) = indices.iter().find(|&&i| i >= hand_size) {
        return Err(RejectionReason::CardIndexOutOfRange { index, hand_size });
    }
    if indices.is_empty() {
        return Err(RejectionReason::EmptySelection);
    }
    Ok(())
}

fn validate_reorder(new_order: &[usize], snapshot: &Snapshot) -> Result<(), RejectionReason> {
    if !snapshot.post_hand_joker_reorder_available {
        return Err(RejectionReason::ReorderWindowClosed);
    }

    let count = snapshot.jokers.len();
    let distinct: BTreeSet<usize> = new_order.iter().copied().collect();
    let is_permutation = new_order.len() == count
        && distinct.len() == count
        && distinct.iter().all(|&i| i < count);

    if is_permutation {
        Ok(())
    } else {
        Err(RejectionReason::NotAPermutation {
            new_order: new_order.to_vec(),
            count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use balatro_types::{BlindType, Consumable, Joker, Properties, ShopItem};

    use super::*;

    fn snapshot(phase: Phase) -> Snapshot {
        Snapshot {
            session_id: "run-1".to_owned(),
            current_phase: phase,
            ante: 1,
            money: 10,
            hands_remaining: 4,
            discards_remaining: 3,
            hand_cards: Vec::new(),
            jokers: (0..3).map(joker).collect(),
            consumables: vec![Consumable {
                id: "tarot-1".to_owned(),
                name: "The Fool".to_owned(),
                card_type: "tarot".to_owned(),
                properties: Properties::new(),
            }],
            current_blind: None,
            shop_contents: vec![ShopItem {
                index: 0,
                item_type: "joker".to_owned(),
                name: "Blueprint".to_owned(),
                cost: 10,
                properties: Properties::new(),
            }],
            available_actions: ActionType::ALL.iter().map(|a| a.as_str().to_owned()).collect(),
            post_hand_joker_reorder_available: true,
        }
    }

    fn joker(position: usize) -> Joker {
        Joker {
            id: format!("j{position}"),
            name: format!("Joker {position}"),
            position,
            properties: Properties::new(),
        }
    }

    fn with_hand(mut snapshot: Snapshot, size: usize) -> Snapshot {
        snapshot.hand_cards = (0..size)
            .map(|i| balatro_types::Card {
                id: format!("c{i}"),
                rank: "A".to_owned(),
                suit: "Spades".to_owned(),
                enhancement: balatro_types::CardEnhancement::None,
                edition: balatro_types::CardEdition::None,
                seal: balatro_types::CardSeal::None,
            })
            .collect();
        snapshot
    }

    #[test]
    fn unlisted_action_is_rejected_first() {
        let mut state = snapshot(Phase::Shop);
        state.available_actions = vec!["reroll_shop".to_owned()];

        assert!(validate_action(&ActionRequest::RerollShop, &state).is_ok());
        assert_eq!(
            validate_action(&ActionRequest::BuyItem { shop_index: 0 }, &state),
            Err(RejectionReason::NotAvailable {
                action: ActionType::BuyItem
            })
        );
    }

    #[test]
    fn buy_item_depends_on_phase_and_money() {
        let buy = ActionRequest::BuyItem { shop_index: 0 };

        let result = validate_action(&buy, &snapshot(Phase::HandSelection));
        assert!(matches!(result, Err(RejectionReason::WrongPhase { .. })));

        let mut shop = snapshot(Phase::Shop);
        assert!(validate_action(&buy, &shop).is_ok());

        shop.money = 9;
        assert_eq!(
            validate_action(&buy, &shop),
            Err(RejectionReason::InsufficientMoney { cost: 10, money: 9 })
        );
    }

    #[test]
    fn buy_item_out_of_range() {
        let result = validate_action(&ActionRequest::BuyItem { shop_index: 1 }, &snapshot(Phase::Shop));
        assert_eq!(
            result,
            Err(RejectionReason::ShopIndexOutOfRange {
                index: 1,
                shop_size: 1
            })
        );
    }

    #[test]
    fn reorder_requires_permutation() {
        let state = snapshot(Phase::Scoring);

        let duplicate = ActionRequest::ReorderJokers {
            new_order: vec![0, 0, 1],
        };
        assert!(matches!(
            validate_action(&duplicate, &state),
            Err(RejectionReason::NotAPermutation { .. })
        ));

        let rotated = ActionRequest::ReorderJokers {
            new_order: vec![2, 0, 1],
        };
        assert!(validate_action(&rotated, &state).is_ok());

        let short = ActionRequest::ReorderJokers {
            new_order: vec![1, 0],
        };
        assert!(validate_action(&short, &state).is_err());

        let out_of_range = ActionRequest::ReorderJokers {
            new_order: vec![0, 1, 3],
        };
        assert!(validate_action(&out_of_range, &state).is_err());
    }

    #[test]
    fn reorder_requires_open_window() {
        let mut state = snapshot(Phase::Scoring);
        state.post_hand_joker_reorder_available = false;
        let reorder = ActionRequest::ReorderJokers {
            new_order: vec![0, 1, 2],
        };
        assert_eq!(
            validate_action(&reorder, &state),
            Err(RejectionReason::ReorderWindowClosed)
        );
    }

    #[test]
    fn play_hand_checks_counters_and_selection() {
        let state = with_hand(snapshot(Phase::HandSelection), 5);
        let play = |card_indices: Vec<usize>| ActionRequest::PlayHand { card_indices };

        assert!(validate_action(&play(vec![0, 4]), &state).is_ok());
        assert_eq!(
            validate_action(&play(vec![]), &state),
            Err(RejectionReason::EmptySelection)
        );
        assert_eq!(
            validate_action(&play(vec![1, 5]), &state),
            Err(RejectionReason::CardIndexOutOfRange {
                index: 5,
                hand_size: 5
            })
        );

        let mut exhausted = state;
        exhausted.hands_remaining = 0;
        assert_eq!(
            validate_action(&play(vec![0]), &exhausted),
            Err(RejectionReason::NoHandsRemaining)
        );
    }

    #[test]
    fn discard_needs_discards_left() {
        let mut state = with_hand(snapshot(Phase::HandSelection), 3);
        let discard = ActionRequest::DiscardCards {
            card_indices: vec![2],
        };
        assert!(validate_action(&discard, &state).is_ok());

        state.discards_remaining = 0;
        assert_eq!(
            validate_action(&discard, &state),
            Err(RejectionReason::NoDiscardsRemaining)
        );
    }

    #[test]
    fn negative_counters_count_as_exhausted() {
        let mut state = with_hand(snapshot(Phase::HandSelection), 3);
        state.hands_remaining = -1;
        state.discards_remaining = -2;
        assert_eq!(
            validate_action(&ActionRequest::PlayHand { card_indices: vec![0] }, &state),
            Err(RejectionReason::NoHandsRemaining)
        );
        assert_eq!(
            validate_action(&ActionRequest::DiscardCards { card_indices: vec![0] }, &state),
            Err(RejectionReason::NoDiscardsRemaining)
        );
    }

    #[test]
    fn sell_indices_are_range_checked() {
        let state = snapshot(Phase::Shop);
        assert!(validate_action(&ActionRequest::SellJoker { joker_index: 2 }, &state).is_ok());
        assert!(validate_action(&ActionRequest::SellJoker { joker_index: 3 }, &state).is_err());
        assert!(
            validate_action(&ActionRequest::SellConsumable { consumable_index: 0 }, &state).is_ok()
        );
        assert!(
            validate_action(&ActionRequest::SellConsumable { consumable_index: 1 }, &state)
                .is_err()
        );
    }

    #[test]
    fn phase_only_actions() {
        let blind = snapshot(Phase::BlindSelection);
        let shop = snapshot(Phase::Shop);
        let hand = snapshot(Phase::HandSelection);

        let select = ActionRequest::SelectBlind {
            blind_type: BlindType::Big,
        };
        assert!(validate_action(&select, &blind).is_ok());
        assert!(validate_action(&select, &shop).is_err());
        assert!(validate_action(&ActionRequest::RerollBoss, &blind).is_ok());
        assert!(validate_action(&ActionRequest::RerollBoss, &hand).is_err());
        assert!(validate_action(&ActionRequest::RerollShop, &shop).is_ok());
        assert!(validate_action(&ActionRequest::GoToShop, &hand).is_ok());
        assert!(validate_action(&ActionRequest::GoToShop, &shop).is_err());
        assert!(validate_action(&ActionRequest::SortHandByRank, &hand).is_ok());
        assert!(validate_action(&ActionRequest::SortHandBySuit, &blind).is_err());
    }

    #[test]
    fn use_consumable_needs_known_id() {
        let state = snapshot(Phase::Shop);
        let known = ActionRequest::UseConsumable {
            item_id: "tarot-1".to_owned(),
        };
        let unknown = ActionRequest::UseConsumable {
            item_id: "planet-9".to_owned(),
        };
        assert!(validate_action(&known, &state).is_ok());
        assert!(matches!(
            validate_action(&unknown, &state),
            Err(RejectionReason::UnknownConsumable { .. })
        ));
    }

    #[test]
    fn pack_offer_is_admitted_when_listed() {
        let mut state = snapshot(Phase::Shop);
        let pick = ActionRequest::SelectPackOffer { pack_index: 7 };
        assert!(validate_action(&pick, &state).is_ok());

        state.available_actions.clear();
        assert!(validate_action(&pick, &state).is_err());
    }

    #[test]
    fn rejection_reads_as_a_sentence() {
        let reason = RejectionReason::WrongPhase {
            action: ActionType::BuyItem,
            required: Phase::Shop,
            actual: Phase::HandSelection,
        };
        assert_eq!(
            reason.to_string(),
            "buy_item requires the shop phase, current phase is hand_selection"
        );

        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["reason"], "wrong_phase");
    }

    #[test]
    fn available_actions_copies_legal_set() {
        let state = snapshot(Phase::Shop);
        assert_eq!(available_actions(&state).len(), 14);
    }
}
