//! Axum router construction for the player API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with tracing and CORS middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bermudia_db::GameStore;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the player API.
///
/// See [`handlers`] for the endpoint table. `GET /ws` upgrades to the
/// notification socket.
///
/// CORS allows any origin; the upstream auth layer is responsible for
/// restricting callers.
pub fn build_router<S: GameStore>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws", get(ws::ws_notifications::<S>))
        // Player
        .route("/api/player", get(handlers::get_player::<S>))
        .route("/api/travel/check", post(handlers::travel_check::<S>))
        .route("/api/travel", post(handlers::travel::<S>))
        .route("/api/refuel/check", get(handlers::refuel_check::<S>))
        .route("/api/refuel", post(handlers::refuel::<S>))
        .route("/api/anchor/check", post(handlers::anchor_check::<S>))
        .route("/api/anchor", post(handlers::anchor::<S>))
        .route("/api/migrate/check", get(handlers::migrate_check::<S>))
        .route("/api/migrate", post(handlers::migrate::<S>))
        .route("/api/knowledge", get(handlers::knowledge::<S>))
        // Inbox
        .route("/api/inbox", get(handlers::inbox::<S>))
        // Trade
        .route("/api/trade/check", get(handlers::offer_check::<S>))
        .route(
            "/api/trade/offers",
            get(handlers::list_offers::<S>).post(handlers::make_offer::<S>),
        )
        .route(
            "/api/trade/offers/{id}",
            delete(handlers::delete_offer::<S>),
        )
        .route(
            "/api/trade/offers/{id}/accept",
            post(handlers::accept_offer::<S>),
        )
        // Treasures
        .route(
            "/api/treasures/{id}/check",
            get(handlers::unlock_check::<S>),
        )
        .route("/api/treasures/{id}/unlock", post(handlers::unlock::<S>))
        // Investment
        .route("/api/invest/check", get(handlers::invest_check::<S>))
        .route("/api/invest", post(handlers::invest::<S>))
        // Answers
        .route(
            "/api/answers/{question_id}",
            get(handlers::get_answer::<S>).post(handlers::submit_answer::<S>),
        )
        // Grading
        .route(
            "/api/grading/corrections",
            post(handlers::create_correction::<S>),
        )
        .route(
            "/api/grading/corrections/{id}",
            patch(handlers::revise_correction::<S>),
        )
        .route(
            "/api/grading/corrections/{id}/finalize",
            post(handlers::finalize_correction::<S>),
        )
        .route("/api/grading/sessions", post(handlers::create_session::<S>))
        .route(
            "/api/grading/sessions/{id}/resolve",
            post(handlers::resolve_session::<S>),
        )
        .route("/api/grading/broadcast", post(handlers::broadcast::<S>))
        .route(
            "/api/grading/pause",
            get(handlers::pause_state::<S>).put(handlers::set_pause::<S>),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
