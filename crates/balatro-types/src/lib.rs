//! Shared type definitions for the Balatro file bridge.
//!
//! This crate is the single source of truth for everything that crosses the
//! shared directory: the envelope header, the state snapshot, the command
//! set and the command result. It performs no I/O.
//!
//! # Modules
//!
//! - [`actions`] -- [`ActionRequest`], [`ActionType`] and [`ActionResult`]
//! - [`enums`] -- Phase, message kind, blind and card modifier enums
//! - [`envelope`] -- The sequence-numbered [`Envelope`] wrapper
//! - [`snapshot`] -- [`Snapshot`] and the cards, jokers and items it holds

pub mod actions;
pub mod enums;
pub mod envelope;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use actions::{ActionRequest, ActionResult, ActionType};
pub use enums::{BlindType, CardEdition, CardEnhancement, CardSeal, MessageKind, Phase};
pub use envelope::Envelope;
pub use snapshot::{Blind, Card, Consumable, Joker, Properties, ShopItem, Snapshot};
