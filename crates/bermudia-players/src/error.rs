//! Error types for the bermudia-players crate.
//!
//! Engines never touch storage, so they can only fail in two ways: a
//! business rule rejected the action, or a referenced entity was missing.
//! Conflicts and timeouts belong to the store and cannot be expressed here.

use serde::Serialize;

use bermudia_ledger::LedgerError;
use bermudia_types::{AnswerStatus, CorrectionStatus, Entity, IslandId, ResourceKind};

/// Errors returned by every engine operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// A business precondition failed. Never retried automatically.
    #[error("rule violation: {0}")]
    RuleViolation(#[from] Violation),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of the missing entity.
        entity: Entity,
        /// Identifier that was looked up.
        id: String,
    },
}

impl GameError {
    /// Shorthand for [`GameError::NotFound`].
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// The violation, if this is a rule violation.
    pub const fn violation(&self) -> Option<&Violation> {
        match self {
            Self::RuleViolation(v) => Some(v),
            Self::NotFound { .. } => None,
        }
    }
}

impl From<LedgerError> for GameError {
    fn from(err: LedgerError) -> Self {
        Self::RuleViolation(Violation::from(err))
    }
}

/// Why a business rule rejected an action.
///
/// Serialized with a `code` tag so clients can branch on the kind without
/// parsing the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Violation {
    // -- resources ---------------------------------------------------------
    /// Not enough of a resource.
    #[error("insufficient {kind}: need {required}, have {available}")]
    InsufficientResources {
        /// The resource that ran short.
        kind: ResourceKind,
        /// Amount needed.
        required: i32,
        /// Amount held.
        available: i32,
    },
    /// A quantity would leave the representable range.
    #[error("{kind} quantity out of range")]
    ResourceOverflow {
        /// The resource being computed.
        kind: ResourceKind,
    },
    /// A cost named a resource kind that does not exist.
    #[error("unknown resource kind {name:?}")]
    UnknownResource {
        /// The unparsed name.
        name: String,
    },

    // -- travel, refuel, anchor ---------------------------------------------
    /// The player is not where the request says they are.
    #[error("you are at {actual}, not at {expected}")]
    LocationMismatch {
        /// Island named in the request.
        expected: IslandId,
        /// Island the player is actually at.
        actual: IslandId,
    },
    /// No directed edge between the two islands.
    #[error("no route from {from} to {to}")]
    NoRoute {
        /// Departure island.
        from: IslandId,
        /// Arrival island.
        to: IslandId,
    },
    /// Fuel is not sold at the player's island.
    #[error("fuel is not sold on this island")]
    NotRefuelIsland,
    /// The tank is already full.
    #[error("the fuel tank is full")]
    TankFull,
    /// A quantity in the request must be positive.
    #[error("amount must be positive, got {amount}")]
    InvalidAmount {
        /// The offending amount.
        amount: i32,
    },
    /// More fuel was requested than fits or can be paid for.
    #[error("can refuel at most {max}, requested {requested}")]
    RefuelExceedsLimit {
        /// Units requested.
        requested: i32,
        /// Units allowed.
        max: i32,
    },
    /// The player is already anchored at the island.
    #[error("already anchored")]
    AlreadyAnchored,
    /// The player is not at the island named in the request.
    #[error("you are not at island {island}")]
    NotAtIsland {
        /// Island named in the request.
        island: IslandId,
    },

    // -- migration -----------------------------------------------------------
    /// The destination is the territory the player is already in.
    #[error("you are already in this territory")]
    AlreadyInTerritory,
    /// Migration only starts from a terminal island.
    #[error("you are not on a terminal island")]
    NotAtTerminalIsland,
    /// Neither the knowledge requirement nor the coin cost can be met.
    #[error("not enough knowledge or coins to migrate")]
    CannotAffordMigration,

    // -- trade ---------------------------------------------------------------
    /// The player already has the maximum number of open offers.
    #[error("at most {cap} open offers are allowed")]
    OfferLimitReached {
        /// The configured cap.
        cap: u32,
    },
    /// A trade line carried a negative amount.
    #[error("invalid amount {amount} for {kind}")]
    InvalidOfferAmount {
        /// Resource of the offending line.
        kind: ResourceKind,
        /// The offending amount.
        amount: i32,
    },
    /// A trade line named a kind that cannot be traded.
    #[error("{kind} cannot be traded")]
    UntradableResource {
        /// The offending kind.
        kind: ResourceKind,
    },
    /// One side of an offer was empty.
    #[error("both sides of an offer must contain something")]
    EmptyOffer,
    /// The acceptor posted the offer.
    #[error("you cannot accept your own offer")]
    SelfTrade,
    /// Only the offerer may withdraw an offer.
    #[error("only the offerer can delete this offer")]
    NotOfferOwner,
    /// The offer was already accepted or withdrawn.
    #[error("offer is no longer available")]
    OfferAlreadyDeleted,
    /// A trade would create or destroy resources.
    #[error("trade does not balance: {message}")]
    Unbalanced {
        /// Anomaly description.
        message: String,
    },

    // -- treasures ----------------------------------------------------------
    /// The treasure was opened before.
    #[error("treasure is already unlocked")]
    AlreadyUnlocked,
    /// The treasure is buried on another island.
    #[error("you must be on the treasure's island to open it")]
    TreasureNotHere,

    // -- investment ---------------------------------------------------------
    /// No session is accepting stakes.
    #[error("the exchange is closed")]
    NoActiveSession,
    /// The session deadline has passed.
    #[error("the investment deadline has passed")]
    SessionClosed,
    /// The player already staked in this session.
    #[error("you have already invested in this session")]
    AlreadyInvested,
    /// The player has no coins to stake.
    #[error("you have no coins to invest")]
    NoCoins,
    /// Payouts for the session were already made.
    #[error("session is already resolved")]
    SessionAlreadyResolved,
    /// The session deadline has not passed yet.
    #[error("session is still open")]
    SessionStillOpen,
    /// Rewards cannot be negative.
    #[error("coefficient must not be negative")]
    NegativeCoefficient,

    // -- answers and corrections --------------------------------------------
    /// The answer is already graded as (half) correct.
    #[error("you have already answered this question")]
    AlreadyAnsweredCorrectly,
    /// A previous submission has not been graded yet.
    #[error("an ungraded answer is already waiting")]
    AwaitingGrading,
    /// The question does not accept a new answer after a wrong one.
    #[error("this question does not accept another answer")]
    ResubmissionNotAllowed,
    /// Neither text nor a file was submitted.
    #[error("submission is empty")]
    EmptySubmission,
    /// A correction must target a verdict status.
    #[error("{status} is not a valid verdict")]
    InvalidCorrectionStatus {
        /// The rejected target status.
        status: AnswerStatus,
    },
    /// The correction is no longer a draft.
    #[error("correction is {status}, only drafts can change")]
    CorrectionNotDraft {
        /// Current lifecycle state.
        status: CorrectionStatus,
    },
    /// Finalizing needs feedback for the player.
    #[error("feedback is required before finalizing")]
    MissingFeedback,
    /// The answer is not waiting for a grade.
    #[error("answer is {status}, not pending")]
    AnswerNotPending {
        /// Current answer status.
        status: AnswerStatus,
    },
    /// The correction is not waiting to be applied.
    #[error("correction is {status}, not pending")]
    CorrectionNotPending {
        /// Current lifecycle state.
        status: CorrectionStatus,
    },
}

impl From<LedgerError> for Violation {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Insufficient {
                kind,
                required,
                available,
            } => Self::InsufficientResources {
                kind,
                required,
                available,
            },
            LedgerError::Overflow { kind } => Self::ResourceOverflow { kind },
            LedgerError::NegativeAmount { kind, amount } => {
                Self::InvalidOfferAmount { kind, amount }
            }
            LedgerError::Untradable { kind } => Self::UntradableResource { kind },
            LedgerError::EmptyCost => Self::EmptyOffer,
            LedgerError::UnknownKind(unknown) => Self::UnknownResource { name: unknown.0 },
        }
    }
}
