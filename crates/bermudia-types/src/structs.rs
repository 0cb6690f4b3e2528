//! Core entity structs for the Bermudia game economy.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AnswerStatus, CorrectionStatus, ResourceKind};
use crate::ids::{
    CorrectionId, InboxMessageId, InvestmentSessionId, IslandId, QuestionId, TerritoryId,
    TradeOfferId, TreasureId, UserId,
};

/// Current time at the precision the store keeps (microseconds).
///
/// Version markers are compared for equality after a round trip through
/// `PostgreSQL`, so they must never carry sub-microsecond digits.
pub fn store_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// ---------------------------------------------------------------------------
// Costs and resource vectors
// ---------------------------------------------------------------------------

/// One line of a cost: a kind and a signed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CostItem {
    /// Which resource the line refers to.
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Signed quantity.
    pub amount: i32,
}

impl CostItem {
    /// Build a cost line.
    pub const fn new(kind: ResourceKind, amount: i32) -> Self {
        Self { kind, amount }
    }
}

/// A sparse list of resource quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Cost {
    /// The cost lines, in the order they were written.
    #[serde(default)]
    pub items: Vec<CostItem>,
}

impl Cost {
    /// An empty cost.
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// A cost with a single line.
    pub fn of(kind: ResourceKind, amount: i32) -> Self {
        Self {
            items: vec![CostItem::new(kind, amount)],
        }
    }

    /// Build a cost from `(kind, amount)` pairs.
    pub fn from_pairs(pairs: &[(ResourceKind, i32)]) -> Self {
        Self {
            items: pairs
                .iter()
                .map(|&(kind, amount)| CostItem::new(kind, amount))
                .collect(),
        }
    }

    /// Whether the cost has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the cost lines.
    pub fn iter(&self) -> impl Iterator<Item = &CostItem> {
        self.items.iter()
    }

    /// The same cost with every amount negated.
    ///
    /// Returns `None` if an amount is `i32::MIN`.
    pub fn negated(&self) -> Option<Self> {
        let items = self
            .items
            .iter()
            .map(|item| item.amount.checked_neg().map(|amount| CostItem::new(item.kind, amount)))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { items })
    }
}

/// The scarce quantities a player holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ResourceVector {
    /// Fuel in the tank.
    pub fuel: i32,
    /// Tank capacity; fuel is never inducted past it.
    pub fuel_cap: i32,
    /// Coins.
    pub coin: i32,
    /// Blue keys.
    pub blue_key: i32,
    /// Red keys.
    pub red_key: i32,
    /// Golden keys.
    pub golden_key: i32,
    /// Master keys.
    pub master_key: i32,
}

impl ResourceVector {
    /// Quantity held of `kind`.
    pub const fn amount(&self, kind: ResourceKind) -> i32 {
        match kind {
            ResourceKind::Fuel => self.fuel,
            ResourceKind::Coin => self.coin,
            ResourceKind::BlueKey => self.blue_key,
            ResourceKind::RedKey => self.red_key,
            ResourceKind::GoldenKey => self.golden_key,
            ResourceKind::MasterKey => self.master_key,
        }
    }

    /// Mutable slot for `kind`.
    pub const fn slot_mut(&mut self, kind: ResourceKind) -> &mut i32 {
        match kind {
            ResourceKind::Fuel => &mut self.fuel,
            ResourceKind::Coin => &mut self.coin,
            ResourceKind::BlueKey => &mut self.blue_key,
            ResourceKind::RedKey => &mut self.red_key,
            ResourceKind::GoldenKey => &mut self.golden_key,
            ResourceKind::MasterKey => &mut self.master_key,
        }
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A player's position and holdings.
///
/// The full field set, including `updated_at`, is the compare basis for
/// optimistic writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Player {
    /// Immutable identity.
    pub user_id: UserId,
    /// Territory the player is in.
    pub territory: TerritoryId,
    /// Island the player is at.
    pub island: IslandId,
    /// Whether the player has landed on the island.
    pub anchored: bool,
    /// Territories entered so far, in order. The last entry is the current
    /// territory.
    #[serde(default)]
    pub visited_territories: Vec<TerritoryId>,
    /// Holdings.
    #[serde(flatten)]
    pub resources: ResourceVector,
    /// Time of the last committed write.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Static content
// ---------------------------------------------------------------------------

/// A directed connection between two islands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Edge {
    /// Departure island.
    pub from: IslandId,
    /// Arrival island.
    pub to: IslandId,
}

/// An island definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Island {
    /// Island key.
    pub id: IslandId,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// A territory: islands plus the travel graph between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Territory {
    /// Territory key.
    pub id: TerritoryId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Island new players start at.
    pub start_island: IslandId,
    /// Islands of the territory.
    #[serde(default)]
    pub islands: Vec<Island>,
    /// Directed travel edges.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Islands where fuel can be bought.
    #[serde(default)]
    pub refuel_islands: Vec<IslandId>,
    /// Islands a player must stand on to migrate out of the territory.
    #[serde(default)]
    pub terminal_islands: Vec<IslandId>,
}

impl Territory {
    /// Whether a directed edge `from -> to` exists.
    pub fn has_edge(&self, from: &IslandId, to: &IslandId) -> bool {
        self.edges.iter().any(|edge| &edge.from == from && &edge.to == to)
    }

    /// Whether fuel can be bought at `island`.
    pub fn is_refuel_island(&self, island: &IslandId) -> bool {
        self.refuel_islands.contains(island)
    }

    /// Whether `island` belongs to this territory.
    pub fn contains_island(&self, island: &IslandId) -> bool {
        self.islands.iter().any(|i| &i.id == island)
    }

    /// Whether migration may start from `island`.
    pub fn is_terminal_island(&self, island: &IslandId) -> bool {
        self.terminal_islands.contains(island)
    }
}

/// A question definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Question {
    /// Question key.
    pub id: QuestionId,
    /// Territory whose knowledge bar the question counts toward.
    #[serde(default)]
    pub territory: Option<TerritoryId>,
    /// Knowledge gained by answering correctly.
    #[serde(default)]
    pub knowledge_amount: i32,
    /// Whether a wrong answer may be submitted again.
    #[serde(default)]
    pub resubmittable: bool,
    /// Coin worth paid out (as keys) for a correct answer. Zero for none.
    #[serde(default)]
    pub reward_worth: i32,
}

/// A treasure definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Treasure {
    /// Treasure key.
    pub id: TreasureId,
    /// Island the treasure is buried on.
    pub island: IslandId,
}

// ---------------------------------------------------------------------------
// Mutable per-user records
// ---------------------------------------------------------------------------

/// A player's lock state for one treasure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct UserTreasure {
    /// Owner.
    pub user_id: UserId,
    /// Treasure.
    pub treasure_id: TreasureId,
    /// Whether the treasure has been opened. Never reverts.
    pub unlocked: bool,
    /// Keys needed to open it; a pure function of user and treasure.
    pub cost: Cost,
    /// What opening it paid out, once opened.
    pub reward: Option<Cost>,
    /// Time of the last committed write (the compare basis).
    pub updated_at: DateTime<Utc>,
}

/// A posted exchange of resources between players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TradeOffer {
    /// Offer id.
    pub id: TradeOfferId,
    /// Player who posted the offer; the offered resources are in escrow.
    pub offerer: UserId,
    /// What the offerer gives.
    pub offered: Cost,
    /// What the offerer wants back.
    pub requested: Cost,
    /// Posting time.
    pub created_at: DateTime<Utc>,
    /// Tombstone set on acceptance or withdrawal.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TradeOffer {
    /// Whether the offer is still on the market.
    pub const fn is_open(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// A time-boxed period in which players may stake coins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct InvestmentSession {
    /// Session id.
    pub id: InvestmentSessionId,
    /// Prompt shown to players.
    pub text: String,
    /// Deadline for stakes.
    pub end_at: DateTime<Utc>,
    /// Whether payouts have been made.
    pub resolved: bool,
}

/// One player's stake in one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct UserInvestment {
    /// Session staked in.
    pub session_id: InvestmentSessionId,
    /// Staking player.
    pub user_id: UserId,
    /// Coins staked.
    pub coin: i32,
}

/// A player's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Answer {
    /// Answering player.
    pub user_id: UserId,
    /// Question answered.
    pub question_id: QuestionId,
    /// Grading state.
    pub status: AnswerStatus,
    /// Submitted text, if any.
    pub text_content: Option<String>,
    /// Name of the submitted file, if any.
    pub filename: Option<String>,
    /// Grader feedback from the last applied correction.
    pub feedback: Option<String>,
    /// Time of the last submission.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Time of the last committed write (the compare basis and the fence).
    pub updated_at: DateTime<Utc>,
}

impl Answer {
    /// A fresh answer row with nothing submitted.
    pub const fn empty(user_id: UserId, question_id: QuestionId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            question_id,
            status: AnswerStatus::Empty,
            text_content: None,
            filename: None,
            feedback: None,
            submitted_at: None,
            updated_at: now,
        }
    }
}

/// A grading decision against one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Correction {
    /// Correction id.
    pub id: CorrectionId,
    /// Graded player.
    pub user_id: UserId,
    /// Graded question.
    pub question_id: QuestionId,
    /// Status the answer should move to.
    pub new_status: AnswerStatus,
    /// Feedback shown to the player.
    pub feedback: Option<String>,
    /// Lifecycle state.
    pub status: CorrectionStatus,
    /// Time of the last write. Once `Pending`, this is the fence.
    pub updated_at: DateTime<Utc>,
}

/// A persisted message in a player's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct InboxMessage {
    /// Message id; time-ordered.
    pub id: InboxMessageId,
    /// Recipient.
    pub user_id: UserId,
    /// What happened.
    pub content: InboxContent,
    /// Delivery time.
    pub created_at: DateTime<Utc>,
}

/// Body of an [`InboxMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum InboxContent {
    /// A grade was applied to one of the player's answers.
    #[serde(rename_all = "camelCase")]
    NewCorrection {
        /// The graded question.
        question_id: QuestionId,
        /// The answer's new status.
        status: AnswerStatus,
        /// Grader feedback.
        feedback: Option<String>,
        /// Reward paid, if any.
        reward: Option<Cost>,
    },
    /// Someone accepted one of the player's offers.
    #[serde(rename_all = "camelCase")]
    OwnOfferAccepted {
        /// The offer as it was accepted.
        offer: TradeOffer,
        /// Who accepted it.
        accepted_by: UserId,
    },
}
