//! Data layer for the Bermudia game economy.
//!
//! Provides the [`GameStore`] contract and two backends:
//!
//! - [`PgStore`] -- `PostgreSQL`, the authoritative store in production
//! - [`MemoryStore`] -- a single-process store for tests and development
//!
//! Updates go through [`Swap`] values: a write succeeds only if the stored
//! record still matches the snapshot the caller read, under that record's
//! compare basis (see [`Record`]). Multi-record writes commit as one change
//! set. The store never retries; a lost compare surfaces as
//! [`StoreError::Conflict`].
//!
//! # Modules
//!
//! - [`deadline`] -- Bounding store calls with a timeout
//! - [`error`] -- Error types ([`StoreError`])
//! - [`memory`] -- In-memory backend
//! - [`pg_store`] -- `PostgreSQL` backend, its pool and migrations
//! - [`record`] -- Versioned records and swaps
//! - [`store`] -- The [`GameStore`] trait

pub mod deadline;
pub mod error;
pub mod memory;
pub mod pg_store;
pub mod record;
mod rows;
pub mod store;

// Re-export primary types at crate root for convenience.
pub use deadline::with_deadline;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use pg_store::PgStore;
pub use record::{Record, Swap};
pub use store::{CommittedCorrection, GameStore};
