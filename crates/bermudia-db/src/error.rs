//! Error types for the data layer.
//!
//! All errors are propagated via [`StoreError`]. Conflicts, fence
//! rejections and timeouts are first-class variants so callers can branch
//! on them without inspecting driver errors.

use std::time::Duration;

use bermudia_types::{AnswerStatus, Entity};

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record.
        entity: Entity,
        /// Record key.
        key: String,
    },

    /// A compare-and-swap found the record changed since it was read, or an
    /// insert found the key taken. Nothing was written.
    #[error("{entity} {key} was modified concurrently")]
    Conflict {
        /// Kind of record.
        entity: Entity,
        /// Record key.
        key: String,
    },

    /// The answer was written after the correction was finalized.
    #[error("answer was resubmitted after the correction was finalized")]
    Fenced,

    /// The answer is no longer waiting for a grade.
    #[error("answer is {status}, not pending")]
    NotPending {
        /// Current answer status.
        status: AnswerStatus,
    },

    /// The operation did not finish within its deadline.
    #[error("store operation timed out after {after:?}")]
    Timeout {
        /// The deadline that elapsed.
        after: Duration,
    },

    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stored value could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Shorthand for [`StoreError::NotFound`].
    pub fn not_found(entity: Entity, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Shorthand for [`StoreError::Conflict`].
    pub fn conflict(entity: Entity, key: impl ToString) -> Self {
        Self::Conflict {
            entity,
            key: key.to_string(),
        }
    }

    /// Whether re-reading and retrying may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Timeout { .. })
    }
}
