//! Service layer for the Bermudia game economy.
//!
//! This crate wires the pure engines of `bermudia-players` to a
//! [`GameStore`](bermudia_db::GameStore) and pushes committed changes to
//! connected players. It owns no game rules of its own.
//!
//! # Modules
//!
//! - [`catalog`] -- Read-only content: territories, questions, treasures.
//! - [`config`] -- Configuration loading from `bermudia-config.yaml` into
//!   strongly-typed structs.
//! - [`corrections`] -- Background job applying finalized corrections.
//! - [`error`] -- [`ActionError`], the error every action reports.
//! - [`hub`] -- Per-user notification connections.
//! - [`service`] -- [`GameService`]: load, engine, commit, notify.

pub mod catalog;
pub mod config;
pub mod corrections;
pub mod error;
pub mod hub;
pub mod service;

pub use catalog::{Catalog, CatalogError};
pub use config::{AppConfig, ConfigError};
pub use corrections::{CorrectionJob, RoundReport};
pub use error::{ActionError, ErrorKind};
pub use hub::{Hub, Outgoing, Subscription};
pub use service::{GameService, Graded, OfferView, Payout, ServiceSettings, SessionResolution};
