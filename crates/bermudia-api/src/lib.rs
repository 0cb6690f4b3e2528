//! Player API server for the Bermudia game economy.
//!
//! This crate is a thin HTTP and `WebSocket` adapter over
//! [`GameService`](bermudia_core::GameService). It contains no game rules;
//! every handler extracts the caller, calls one service action, and maps
//! the outcome to JSON.
//!
//! # Architecture
//!
//! ```text
//! auth proxy (x-user-id) --> [Axum Router] --> GameService --> GameStore
//!                                 |                 |
//!                                 +-- GET /ws <---- Hub (per-user push)
//! ```
//!
//! # Modules
//!
//! - [`error`] -- [`ApiError`] and its HTTP mapping
//! - [`extract`] -- Caller and grader extractors
//! - [`handlers`] -- REST endpoint handlers
//! - [`router`] -- Route table and middleware
//! - [`server`] -- Bind and serve with graceful shutdown
//! - [`state`] -- Shared application state
//! - [`ws`] -- Notification socket

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
