//! Messages pushed to connected clients after a committed mutation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AnswerStatus, PlayerUpdateReason};
use crate::ids::{QuestionId, TradeOfferId, UserId};
use crate::structs::{Cost, Player};

/// A fresh player snapshot and the reason it changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerUpdateEvent {
    /// What caused the change.
    pub reason: PlayerUpdateReason,
    /// The committed player state.
    pub player: Player,
}

impl PlayerUpdateEvent {
    /// Pair a committed player with the reason it changed.
    pub const fn new(reason: PlayerUpdateReason, player: Player) -> Self {
        Self { reason, player }
    }
}

/// Everything the notification hub can deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum Notification {
    /// The player's own state changed.
    PlayerUpdate(PlayerUpdateEvent),
    /// A grader's decision reached one of the player's answers.
    #[serde(rename_all = "camelCase")]
    CorrectionApplied {
        /// The graded question.
        question_id: QuestionId,
        /// The answer's new status.
        status: AnswerStatus,
        /// Grader feedback.
        feedback: Option<String>,
        /// Reward paid for the answer, if any.
        reward: Option<Cost>,
    },
    /// One of the player's offers was taken.
    #[serde(rename_all = "camelCase")]
    OwnOfferAccepted {
        /// The accepted offer.
        offer_id: TradeOfferId,
        /// Who accepted it.
        accepted_by: UserId,
    },
    /// A message for every connected player.
    Broadcast {
        /// Message text.
        text: String,
    },
}
