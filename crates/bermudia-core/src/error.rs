//! The error every service action reports.
//!
//! [`ActionError`] unifies engine rejections ([`GameError`]) and store
//! failures ([`StoreError`]) into one taxonomy. Callers branch on
//! [`ActionError::kind`]; [`ActionError::is_retryable`] says whether a
//! fresh read and a second attempt may succeed.

use std::time::Duration;

use serde::Serialize;

use bermudia_db::StoreError;
use bermudia_players::{GameError, Violation};
use bermudia_types::Entity;

/// Errors returned by service actions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// A business rule rejected the action.
    #[error("rule violation: {0}")]
    RuleViolation(Violation),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of the missing entity.
        entity: Entity,
        /// Identifier that was looked up.
        id: String,
    },

    /// Another writer changed a record between read and commit.
    #[error("{entity} {key} was modified concurrently")]
    Conflict {
        /// Kind of record that moved on.
        entity: Entity,
        /// Its key.
        key: String,
    },

    /// The answer was resubmitted after the correction was finalized. The
    /// correction has been rejected.
    #[error("answer changed after the correction was finalized")]
    FenceRejected,

    /// The game is paused and player actions are refused.
    #[error("the game is paused")]
    Paused,

    /// A store call exceeded its deadline. The action may or may not have
    /// committed.
    #[error("store call timed out after {after:?}")]
    Timeout {
        /// The deadline that elapsed.
        after: Duration,
    },

    /// The task running the action was torn down before it finished.
    #[error("action cancelled: {reason}")]
    Cancelled {
        /// What stopped it.
        reason: String,
    },

    /// The store failed for a reason other than a conflict or timeout.
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

/// Coarse classification of an [`ActionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// See [`ActionError::RuleViolation`].
    RuleViolation,
    /// See [`ActionError::NotFound`].
    NotFound,
    /// See [`ActionError::Conflict`].
    Conflict,
    /// See [`ActionError::FenceRejected`].
    FenceRejected,
    /// See [`ActionError::Paused`].
    Paused,
    /// See [`ActionError::Timeout`].
    Timeout,
    /// See [`ActionError::Cancelled`].
    Cancelled,
    /// See [`ActionError::Storage`].
    Storage,
}

impl ErrorKind {
    /// Wire name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RuleViolation => "ruleViolation",
            Self::NotFound => "notFound",
            Self::Conflict => "conflict",
            Self::FenceRejected => "fenceRejected",
            Self::Paused => "paused",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Storage => "storage",
        }
    }
}

impl ActionError {
    /// Shorthand for [`ActionError::NotFound`].
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classify the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RuleViolation(_) => ErrorKind::RuleViolation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::FenceRejected => ErrorKind::FenceRejected,
            Self::Paused => ErrorKind::Paused,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether reloading and retrying may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::Timeout { .. } | Self::Cancelled { .. }
        )
    }

    /// The violation, if this is a rule violation.
    pub const fn violation(&self) -> Option<&Violation> {
        match self {
            Self::RuleViolation(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Violation> for ActionError {
    fn from(v: Violation) -> Self {
        Self::RuleViolation(v)
    }
}

impl From<GameError> for ActionError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::RuleViolation(v) => Self::RuleViolation(v),
            GameError::NotFound { entity, id } => Self::NotFound { entity, id },
        }
    }
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => Self::NotFound { entity, id: key },
            StoreError::Conflict { entity, key } => Self::Conflict { entity, key },
            StoreError::Fenced => Self::FenceRejected,
            StoreError::NotPending { status } => {
                Self::RuleViolation(Violation::AnswerNotPending { status })
            }
            StoreError::Timeout { after } => Self::Timeout { after },
            other => Self::Storage(other),
        }
    }
}

impl From<tokio::task::JoinError> for ActionError {
    fn from(err: tokio::task::JoinError) -> Self {
        let reason = if err.is_cancelled() {
            String::from("task aborted")
        } else {
            String::from("task panicked")
        };
        Self::Cancelled { reason }
    }
}
