//! Enumeration types for the Bermudia game economy.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A kind of scarce quantity held in a player's resource vector.
///
/// The declaration order is the canonical order used when costs are
/// diffed or listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum ResourceKind {
    /// Ship fuel, spent on travel and bounded by the tank capacity.
    Fuel,
    /// The general currency.
    Coin,
    /// Lowest-tier treasure key.
    BlueKey,
    /// Middle-tier treasure key.
    RedKey,
    /// Highest-tier treasure key.
    GoldenKey,
    /// Key that is never traded.
    MasterKey,
}

impl ResourceKind {
    /// Every kind, in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Fuel,
        Self::Coin,
        Self::BlueKey,
        Self::RedKey,
        Self::GoldenKey,
        Self::MasterKey,
    ];

    /// Kinds that may appear in a trade offer, in listing order.
    pub const TRADABLE: [Self; 4] = [Self::Coin, Self::BlueKey, Self::RedKey, Self::GoldenKey];

    /// Whether this kind may be offered or requested on the market.
    pub const fn is_tradable(self) -> bool {
        matches!(
            self,
            Self::Coin | Self::BlueKey | Self::RedKey | Self::GoldenKey
        )
    }

    /// Wire name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fuel => "fuel",
            Self::Coin => "coin",
            Self::BlueKey => "blueKey",
            Self::RedKey => "redKey",
            Self::GoldenKey => "goldenKey",
            Self::MasterKey => "masterKey",
        }
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a cost line names a kind that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResourceKind(pub String);

impl core::fmt::Display for UnknownResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown resource kind {:?}", self.0)
    }
}

impl std::error::Error for UnknownResourceKind {}

impl core::str::FromStr for ResourceKind {
    type Err = UnknownResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownResourceKind(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Answers and corrections
// ---------------------------------------------------------------------------

/// Grading state of a player's answer to one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum AnswerStatus {
    /// Nothing submitted yet.
    Empty,
    /// Submitted and waiting for a grader.
    Pending,
    /// Graded as fully correct.
    Correct,
    /// Graded as wrong.
    Wrong,
    /// Graded as partially correct.
    HalfCorrect,
}

impl AnswerStatus {
    /// Statuses a correction may move an answer to.
    pub const VERDICTS: [Self; 3] = [Self::Correct, Self::Wrong, Self::HalfCorrect];

    /// Whether a correction may target this status.
    pub const fn is_verdict(self) -> bool {
        matches!(self, Self::Correct | Self::Wrong | Self::HalfCorrect)
    }

    /// Storage name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Pending => "pending",
            Self::Correct => "correct",
            Self::Wrong => "wrong",
            Self::HalfCorrect => "half_correct",
        }
    }

    /// Parse a storage name produced by [`AnswerStatus::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::Empty,
            Self::Pending,
            Self::Correct,
            Self::Wrong,
            Self::HalfCorrect,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
    }
}

impl core::fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a grading decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum CorrectionStatus {
    /// Being edited by a grader.
    Draft,
    /// Finalized and waiting to be applied to the answer.
    Pending,
    /// Applied to the answer.
    Applied,
    /// Could not be applied (the answer moved on); needs a new decision.
    Rejected,
}

impl CorrectionStatus {
    /// Storage name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a storage name produced by [`CorrectionStatus::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        [Self::Draft, Self::Pending, Self::Applied, Self::Rejected]
            .into_iter()
            .find(|status| status.as_str() == s)
    }
}

impl core::fmt::Display for CorrectionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entities and events
// ---------------------------------------------------------------------------

/// Kind of record an error or lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum Entity {
    /// A player row.
    Player,
    /// A trade offer.
    TradeOffer,
    /// A treasure definition.
    Treasure,
    /// A per-user treasure state row.
    UserTreasure,
    /// A question definition.
    Question,
    /// A per-user answer row.
    Answer,
    /// A grading decision.
    Correction,
    /// An investment session.
    InvestmentSession,
    /// A per-user investment stake.
    UserInvestment,
    /// A territory definition.
    Territory,
    /// An island definition.
    Island,
    /// A persisted inbox message.
    InboxMessage,
}

impl core::fmt::Display for Entity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Player => "player",
            Self::TradeOffer => "trade offer",
            Self::Treasure => "treasure",
            Self::UserTreasure => "user treasure",
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Correction => "correction",
            Self::InvestmentSession => "investment session",
            Self::UserInvestment => "user investment",
            Self::Territory => "territory",
            Self::Island => "island",
            Self::InboxMessage => "inbox message",
        };
        f.write_str(name)
    }
}

/// Why a player snapshot was pushed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum PlayerUpdateReason {
    /// First snapshot after onboarding.
    Initial,
    /// Moved to another island.
    Travel,
    /// Bought fuel.
    Refuel,
    /// A grading decision paid out a reward.
    Correction,
    /// Anchored at the current island.
    Anchor,
    /// Opened a treasure.
    UnlockTreasure,
    /// Posted a trade offer (resources went into escrow).
    MakeOffer,
    /// Accepted someone else's offer.
    AcceptOffer,
    /// Someone accepted this player's offer.
    OwnOfferAccepted,
    /// Withdrew an own offer (escrow refunded).
    OwnOfferDeleted,
    /// Staked coins in the active investment session.
    Invest,
    /// Received the payout of a resolved investment session.
    InvestReward,
    /// Moved to another territory.
    Migration,
}

/// Which offers a market listing should include, relative to the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum OfferScope {
    /// Only the viewer's own offers.
    Mine,
    /// Only offers made by other players.
    Others,
    /// Every open offer.
    #[default]
    All,
}
