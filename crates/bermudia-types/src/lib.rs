//! Shared type definitions for the Bermudia game economy.
//!
//! This crate is the single source of truth for the records, content
//! definitions, and push messages used across the workspace. Client-facing
//! types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers (generated ids, content keys, user ids)
//! - [`enums`] -- Resource kinds, answer and correction states, event reasons
//! - [`structs`] -- Players, costs, offers, treasures, answers, corrections, inbox
//! - [`events`] -- Notifications pushed to connected clients

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    AnswerStatus, CorrectionStatus, Entity, OfferScope, PlayerUpdateReason, ResourceKind,
    UnknownResourceKind,
};
pub use events::{Notification, PlayerUpdateEvent};
pub use ids::{
    CorrectionId, InboxMessageId, InvestmentSessionId, IslandId, QuestionId, TerritoryId,
    TradeOfferId, TreasureId, UserId,
};
pub use structs::{
    Answer, Correction, Cost, CostItem, Edge, InboxContent, InboxMessage, InvestmentSession,
    Island, Player, Question, ResourceVector, Territory, TradeOffer, Treasure, UserInvestment,
    UserTreasure, store_timestamp,
};
