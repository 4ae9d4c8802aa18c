//! Enumeration types shared by the peer and the bridge.
//!
//! Every enum serialises as a lowercase `snake_case` string so the JSON
//! produced here matches what the game-side mod writes.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Game phase
// ---------------------------------------------------------------------------

/// The stage of the turn cycle the peer reports it is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Cards are in hand and may be played, discarded or sorted.
    HandSelection,
    /// The shop is open between rounds.
    Shop,
    /// The next blind is being chosen.
    BlindSelection,
    /// A played hand is being scored.
    Scoring,
}

impl Phase {
    /// The wire name of this phase.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HandSelection => "hand_selection",
            Self::Shop => "shop",
            Self::BlindSelection => "blind_selection",
            Self::Scoring => "scoring",
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Envelope kind
// ---------------------------------------------------------------------------

/// Which of the three message streams an envelope belongs to.
///
/// The legacy long names written by older mod builds are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Peer-reported state snapshot.
    #[serde(alias = "game_state")]
    State,
    /// Command written by the bridge for the peer to execute.
    #[serde(alias = "action_command")]
    Command,
    /// Outcome of a command, written by the peer.
    #[serde(alias = "action_result")]
    Result,
}

impl MessageKind {
    /// The wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Command => "command",
            Self::Result => "result",
        }
    }
}

impl core::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Blinds
// ---------------------------------------------------------------------------

/// The three blinds offered each ante.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlindType {
    /// First blind of the ante.
    Small,
    /// Second blind of the ante.
    Big,
    /// Final blind of the ante, carries a debuff.
    Boss,
}

// ---------------------------------------------------------------------------
// Card modifiers
// ---------------------------------------------------------------------------

/// Enhancement applied to a playing card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardEnhancement {
    /// No enhancement.
    #[default]
    None,
    /// Gold card.
    Gold,
    /// Steel card.
    Steel,
    /// Glass card.
    Glass,
    /// Wild card.
    Wild,
    /// Bonus card.
    Bonus,
    /// Mult card.
    Mult,
    /// Stone card.
    Stone,
}

/// Edition applied to a playing card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardEdition {
    /// No edition.
    #[default]
    None,
    /// Foil edition.
    Foil,
    /// Holographic edition.
    Holographic,
    /// Polychrome edition.
    Polychrome,
    /// Negative edition.
    Negative,
}

/// Seal applied to a playing card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardSeal {
    /// No seal.
    #[default]
    None,
    /// Red seal.
    Red,
    /// Blue seal.
    Blue,
    /// Gold seal.
    Gold,
    /// Purple seal.
    Purple,
}
