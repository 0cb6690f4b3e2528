//! Resource vector algebra for the Bermudia game economy.
//!
//! Every resource a player holds lives in a [`ResourceVector`] embedded in
//! the player record. All changes to that vector go through the four pure
//! operations of this crate, which never perform I/O and never panic.
//!
//! # Architecture
//!
//! - [`ledger`] -- `can_afford`, `deduct`, `induct`, `diff`.
//! - [`cost`] -- Parsing and normalization of cost lists.
//! - [`conservation`] -- Conservation verification across multi-party moves.
//!
//! # Invariants
//!
//! - A committed vector never holds a negative quantity.
//! - [`deduct`] is all-or-nothing: either every line applies or the input
//!   is returned untouched through the error path.
//! - Fuel is never inducted past the tank capacity.
//!
//! # Usage
//!
//! ```
//! use bermudia_ledger::{deduct, diff, induct};
//! use bermudia_types::{Cost, ResourceKind, ResourceVector};
//!
//! let wallet = ResourceVector { coin: 10, ..ResourceVector::default() };
//! let price = Cost::of(ResourceKind::Coin, 3);
//!
//! let after = deduct(&wallet, &price).ok();
//! assert_eq!(after.map(|v| v.coin), Some(7));
//! assert_eq!(after.map(|v| diff(&wallet, &v)), price.negated());
//! assert_eq!(after.map(|v| induct(&v, &price)), Some(wallet));
//! ```
//!
//! [`ResourceVector`]: bermudia_types::ResourceVector

pub mod conservation;
pub mod cost;
pub mod ledger;

// Re-export primary types at crate root.
pub use conservation::{ConservationResult, verify_transfer};
pub use cost::{normalize_tradable, parse_cost};
pub use ledger::{can_afford, deduct, diff, induct};

use std::collections::BTreeMap;

use bermudia_types::{ResourceKind, UnknownResourceKind};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the resource algebra.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A deduction would take a quantity below zero.
    #[error("insufficient {kind}: need {required}, have {available}")]
    Insufficient {
        /// The resource that ran short.
        kind: ResourceKind,
        /// The amount the cost line asked for.
        required: i32,
        /// The amount held when the line was applied.
        available: i32,
    },

    /// Integer overflow while applying a cost line.
    #[error("arithmetic overflow on {kind}")]
    Overflow {
        /// The resource being computed.
        kind: ResourceKind,
    },

    /// A cost line carried a negative amount where only positive ones are
    /// accepted.
    #[error("invalid amount {amount} for {kind}")]
    NegativeAmount {
        /// The resource of the offending line.
        kind: ResourceKind,
        /// The offending amount.
        amount: i32,
    },

    /// A cost line named a kind that cannot be traded.
    #[error("{kind} cannot be traded")]
    Untradable {
        /// The offending kind.
        kind: ResourceKind,
    },

    /// A cost that must carry something was empty after normalization.
    #[error("cost is empty")]
    EmptyCost,

    /// A cost line named a kind that does not exist.
    #[error(transparent)]
    UnknownKind(#[from] UnknownResourceKind),
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A conservation violation detected while verifying a multi-party move.
///
/// This indicates a bug in an engine, not a player error: resources were
/// created or destroyed by something that should only have moved them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnomaly {
    /// What was being verified (for example `"accept offer"`).
    pub context: String,
    /// Per-kind totals that did not balance: (`before`, `after`).
    pub imbalances: BTreeMap<ResourceKind, (i64, i64)>,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
