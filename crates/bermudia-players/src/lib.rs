//! Player-facing game engines for the Bermudia economy.
//!
//! This crate contains the logic layer for players: everything that
//! operates on player state without touching I/O. It sits between
//! `bermudia-types`/`bermudia-ledger` (data and arithmetic) and the core
//! service (persistence and orchestration).
//!
//! Every engine takes value snapshots and returns new values: a
//! [`PlayerUpdateEvent`](bermudia_types::PlayerUpdateEvent) holding the
//! prospective player plus any secondary record. The caller commits them
//! through the store and forwards the event.
//!
//! # Modules
//!
//! - [`answer`] -- Answer submission, grading decisions, auto-correction, fence
//! - [`config`] -- Economy parameters ([`EconomyConfig`])
//! - [`error`] -- Engine errors ([`GameError`], [`Violation`])
//! - [`invest`] -- Investment sessions and their resolution
//! - [`migrate`] -- Knowledge bars and migration between territories
//! - [`player`] -- Onboarding and shared helpers
//! - [`reward`] -- Weighted key rewards
//! - [`trade`] -- Market offers: post, accept, withdraw
//! - [`travel`] -- Travel, refuel, anchor
//! - [`treasure`] -- Deterministic treasure costs and unlocking

pub mod answer;
pub mod config;
pub mod error;
pub mod invest;
pub mod migrate;
pub mod player;
pub mod reward;
pub mod trade;
pub mod travel;
pub mod treasure;

// Re-export primary types at crate root for convenience.
pub use answer::{
    AppliedCorrection, Submission, apply_correction, auto_correction, auto_verdict,
    create_correction, finalize_correction, passes_fence, reject_correction, revise_correction,
    submit_answer,
};
pub use config::EconomyConfig;
pub use error::{GameError, Violation};
pub use invest::{
    InvestCheck, give_investment_reward, invest, invest_check, resolve_investments,
};
pub use migrate::{
    KnowledgeBar, MigrateCheck, MigrationOption, MigrationStatus, knowledge_bars, migrate,
    migrate_check,
};
pub use player::{new_player, tradable};
pub use reward::{coin_worth, roll_reward};
pub use trade::{
    AcceptedTrade, OfferCheck, accept_offer, delete_offer, is_acceptable, make_offer,
    make_offer_check,
};
pub use travel::{
    AnchorCheck, RefuelCheck, TravelCheck, anchor, anchor_check, refuel, refuel_check, travel,
    travel_check,
};
pub use treasure::{UnlockCheck, new_user_treasure, treasure_cost, unlock, unlock_check};
