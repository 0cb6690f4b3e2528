//! REST API endpoint handlers for the player API.
//!
//! Every handler is a thin adapter: it extracts the caller and the body,
//! calls one [`GameService`](bermudia_core::GameService) action, and
//! serializes the result. Errors convert through [`ApiError`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness check |
//! | `GET` | `/api/player` | Onboard and return the caller's player |
//! | `POST` | `/api/travel/check` | Can the caller sail `from` to `to` |
//! | `POST` | `/api/travel` | Sail `from` to `to` |
//! | `GET` | `/api/refuel/check` | Refuel limit at the current island |
//! | `POST` | `/api/refuel` | Buy fuel |
//! | `POST` | `/api/anchor/check` | Can the caller anchor at `island` |
//! | `POST` | `/api/anchor` | Anchor at `island` |
//! | `GET` | `/api/migrate/check` | Migration options and knowledge |
//! | `POST` | `/api/migrate` | Migrate to `territory` |
//! | `GET` | `/api/knowledge` | The caller's knowledge bars |
//! | `GET` | `/api/inbox` | Inbox page (`?before=&limit=`) |
//! | `GET` | `/api/trade/check` | Can the caller post another offer |
//! | `GET` | `/api/trade/offers` | List open offers (`?by=me\|others\|all`) |
//! | `POST` | `/api/trade/offers` | Post an offer |
//! | `POST` | `/api/trade/offers/{id}/accept` | Accept an offer |
//! | `DELETE` | `/api/trade/offers/{id}` | Withdraw an own offer |
//! | `GET` | `/api/treasures/{id}/check` | Unlock cost and feasibility |
//! | `POST` | `/api/treasures/{id}/unlock` | Unlock a treasure |
//! | `GET` | `/api/invest/check` | Stake limit in the active session |
//! | `POST` | `/api/invest` | Stake coin |
//! | `GET` | `/api/answers/{question_id}` | The caller's answer |
//! | `POST` | `/api/answers/{question_id}` | Submit an answer |
//! | `POST` | `/api/grading/corrections` | Create a draft correction |
//! | `PATCH` | `/api/grading/corrections/{id}` | Revise a draft |
//! | `POST` | `/api/grading/corrections/{id}/finalize` | Finalize a draft |
//! | `POST` | `/api/grading/sessions` | Open an investment session |
//! | `POST` | `/api/grading/sessions/{id}/resolve` | Resolve a session |
//! | `POST` | `/api/grading/broadcast` | Push a message to every player |
//! | `GET` | `/api/grading/pause` | Whether the game is paused |
//! | `PUT` | `/api/grading/pause` | Pause or resume the game |
//!
//! Every `/api` route outside `/api/grading` answers `423 Locked` while the
//! game is paused.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use bermudia_core::{OfferView, SessionResolution};
use bermudia_db::GameStore;
use bermudia_players::{
    AnchorCheck, InvestCheck, KnowledgeBar, MigrateCheck, OfferCheck, RefuelCheck, Submission,
    TravelCheck, UnlockCheck,
};
use bermudia_types::{
    Answer, AnswerStatus, Correction, CorrectionId, Cost, InboxMessage, InvestmentSession,
    InvestmentSessionId, IslandId, OfferScope, Player, QuestionId, TerritoryId, TradeOffer,
    TradeOfferId, TreasureId, UserId, UserInvestment, UserTreasure,
};

use crate::error::ApiError;
use crate::extract::{Caller, Grader};
use crate::state::AppState;

type ApiState<S> = State<Arc<AppState<S>>>;

// ---------------------------------------------------------------------------
// Request bodies and query parameters
// ---------------------------------------------------------------------------

/// Body of the travel routes.
#[derive(Debug, Deserialize)]
pub struct TravelBody {
    /// Island the caller believes they are at.
    pub from: IslandId,
    /// Destination island.
    pub to: IslandId,
}

/// Body of `POST /api/refuel`.
#[derive(Debug, Deserialize)]
pub struct RefuelBody {
    /// Units of fuel to buy.
    pub amount: i32,
}

/// Body of the anchor routes.
#[derive(Debug, Deserialize)]
pub struct AnchorBody {
    /// Island to anchor at.
    pub island: IslandId,
}

/// Body of `POST /api/migrate`.
#[derive(Debug, Deserialize)]
pub struct MigrateBody {
    /// Destination territory.
    pub territory: TerritoryId,
}

/// Query parameters for `GET /api/inbox`.
#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    /// Only messages created strictly before this instant.
    #[serde(default)]
    pub before: Option<DateTime<Utc>>,
    /// Page size.
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Body of `PUT /api/grading/pause`.
#[derive(Debug, Deserialize)]
pub struct PauseBody {
    /// Whether the game should be paused.
    pub paused: bool,
}

/// Body of `POST /api/trade/offers`.
#[derive(Debug, Deserialize)]
pub struct OfferBody {
    /// What the caller gives.
    pub offered: Cost,
    /// What the caller wants in return.
    pub requested: Cost,
}

/// Which offers a listing shows, as spelled in the query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffersBy {
    /// The caller's own offers.
    #[serde(alias = "mine")]
    Me,
    /// Everyone else's offers.
    Others,
    /// All open offers.
    #[default]
    All,
}

impl From<OffersBy> for OfferScope {
    fn from(by: OffersBy) -> Self {
        match by {
            OffersBy::Me => Self::Mine,
            OffersBy::Others => Self::Others,
            OffersBy::All => Self::All,
        }
    }
}

/// Query parameters for `GET /api/trade/offers`.
#[derive(Debug, Deserialize)]
pub struct OffersQuery {
    /// Filter by owner. Defaults to `all`.
    #[serde(default)]
    pub by: OffersBy,
}

/// Body of `POST /api/invest`.
#[derive(Debug, Deserialize)]
pub struct InvestBody {
    /// Session to stake in.
    pub session_id: Uuid,
    /// Coins to stake.
    pub coin: i32,
}

/// Body of `POST /api/answers/{question_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct AnswerBody {
    /// Text answer.
    #[serde(default)]
    pub text: Option<String>,
    /// Name of an uploaded file.
    #[serde(default)]
    pub filename: Option<String>,
}

impl From<AnswerBody> for Submission {
    fn from(body: AnswerBody) -> Self {
        Self {
            text: body.text,
            filename: body.filename,
        }
    }
}

/// Body of `POST /api/grading/corrections`.
#[derive(Debug, Deserialize)]
pub struct CorrectionBody {
    /// Player whose answer is graded.
    pub user_id: UserId,
    /// Question the answer belongs to.
    pub question_id: QuestionId,
    /// Verdict.
    pub status: AnswerStatus,
    /// Feedback shown to the player.
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Body of `PATCH /api/grading/corrections/{id}`.
#[derive(Debug, Deserialize)]
pub struct RevisionBody {
    /// New verdict, if changing.
    #[serde(default)]
    pub status: Option<AnswerStatus>,
    /// New feedback, if changing.
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Body of `POST /api/grading/sessions`.
#[derive(Debug, Deserialize)]
pub struct SessionBody {
    /// Prompt shown to investors.
    pub text: String,
    /// When the session stops accepting stakes.
    pub end_at: DateTime<Utc>,
}

/// Body of `POST /api/grading/sessions/{id}/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    /// Multiplier applied to every stake.
    pub coefficient: Decimal,
}

/// Body of `POST /api/grading/broadcast`.
#[derive(Debug, Deserialize)]
pub struct BroadcastBody {
    /// Message text.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Liveness check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Player, travel, refuel, anchor
// ---------------------------------------------------------------------------

/// Return the caller's player, creating it on first contact.
pub async fn get_player<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
) -> Result<Json<Player>, ApiError> {
    Ok(Json(state.service.onboard(user).await?))
}

/// Check a voyage without moving.
pub async fn travel_check<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Json(body): Json<TravelBody>,
) -> Result<Json<TravelCheck>, ApiError> {
    let check = state
        .service
        .travel_check(user, &body.from, &body.to)
        .await?;
    Ok(Json(check))
}

/// Sail from one island to a neighbour.
pub async fn travel<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Json(body): Json<TravelBody>,
) -> Result<Json<Player>, ApiError> {
    Ok(Json(state.service.travel(user, &body.from, &body.to).await?))
}

/// How much fuel the caller could buy here.
pub async fn refuel_check<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
) -> Result<Json<RefuelCheck>, ApiError> {
    Ok(Json(state.service.refuel_check(user).await?))
}

/// Buy fuel.
pub async fn refuel<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Json(body): Json<RefuelBody>,
) -> Result<Json<Player>, ApiError> {
    Ok(Json(state.service.refuel(user, body.amount).await?))
}

/// Check anchoring without paying.
pub async fn anchor_check<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Json(body): Json<AnchorBody>,
) -> Result<Json<AnchorCheck>, ApiError> {
    Ok(Json(state.service.anchor_check(user, &body.island).await?))
}

/// Anchor at the current island.
pub async fn anchor<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Json(body): Json<AnchorBody>,
) -> Result<Json<Player>, ApiError> {
    Ok(Json(state.service.anchor(user, &body.island).await?))
}

/// Where the caller could migrate and at what price.
pub async fn migrate_check<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
) -> Result<Json<MigrateCheck>, ApiError> {
    Ok(Json(state.service.migrate_check(user).await?))
}

/// Move to another territory.
pub async fn migrate<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Json(body): Json<MigrateBody>,
) -> Result<Json<Player>, ApiError> {
    Ok(Json(state.service.migrate(user, &body.territory).await?))
}

/// Knowledge gathered per territory.
pub async fn knowledge<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
) -> Result<Json<Vec<KnowledgeBar>>, ApiError> {
    Ok(Json(state.service.knowledge_bars(user).await?))
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

/// A page of the caller's inbox, newest first.
pub async fn inbox<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Query(params): Query<InboxQuery>,
) -> Result<Json<Vec<InboxMessage>>, ApiError> {
    let page = state
        .service
        .inbox(user, params.before, params.limit)
        .await?;
    Ok(Json(page))
}

// ---------------------------------------------------------------------------
// Trade
// ---------------------------------------------------------------------------

/// Whether the caller can post another offer.
pub async fn offer_check<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
) -> Result<Json<OfferCheck>, ApiError> {
    Ok(Json(state.service.offer_check(user).await?))
}

/// List open offers, newest first.
pub async fn list_offers<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Query(params): Query<OffersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let offers: Vec<OfferView> = state
        .service
        .list_offers(user, params.by.into())
        .await?;
    Ok(Json(serde_json::json!({
        "count": offers.len(),
        "offers": offers,
    })))
}

/// Post an offer.
pub async fn make_offer<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Json(body): Json<OfferBody>,
) -> Result<(StatusCode, Json<TradeOffer>), ApiError> {
    let offer = state
        .service
        .make_offer(user, &body.offered, &body.requested)
        .await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

/// Accept someone else's offer.
pub async fn accept_offer<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<TradeOffer>, ApiError> {
    let offer = state
        .service
        .accept_offer(user, TradeOfferId::from(id))
        .await?;
    Ok(Json(offer))
}

/// Withdraw an own offer.
pub async fn delete_offer<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<TradeOffer>, ApiError> {
    let offer = state
        .service
        .delete_offer(user, TradeOfferId::from(id))
        .await?;
    Ok(Json(offer))
}

// ---------------------------------------------------------------------------
// Treasures
// ---------------------------------------------------------------------------

/// Unlock cost and feasibility for one treasure.
pub async fn unlock_check<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<UnlockCheck>, ApiError> {
    let check = state
        .service
        .unlock_check(user, &TreasureId::new(id))
        .await?;
    Ok(Json(check))
}

/// Unlock a treasure.
pub async fn unlock<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<UserTreasure>, ApiError> {
    Ok(Json(state.service.unlock(user, &TreasureId::new(id)).await?))
}

// ---------------------------------------------------------------------------
// Investment
// ---------------------------------------------------------------------------

/// Stake limit in the active session.
pub async fn invest_check<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
) -> Result<Json<InvestCheck>, ApiError> {
    Ok(Json(state.service.invest_check(user).await?))
}

/// Stake coin in a session.
pub async fn invest<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Json(body): Json<InvestBody>,
) -> Result<(StatusCode, Json<UserInvestment>), ApiError> {
    let stake = state
        .service
        .invest(user, InvestmentSessionId::from(body.session_id), body.coin)
        .await?;
    Ok((StatusCode::CREATED, Json(stake)))
}

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

/// The caller's answer to a question.
pub async fn get_answer<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Path(question_id): Path<String>,
) -> Result<Json<Answer>, ApiError> {
    let answer = state
        .service
        .answer(user, &QuestionId::new(question_id))
        .await?;
    Ok(Json(answer))
}

/// Submit an answer.
pub async fn submit_answer<S: GameStore>(
    State(state): ApiState<S>,
    Caller(user): Caller,
    Path(question_id): Path<String>,
    Json(body): Json<AnswerBody>,
) -> Result<Json<Answer>, ApiError> {
    let answer = state
        .service
        .submit_answer(user, &QuestionId::new(question_id), body.into())
        .await?;
    Ok(Json(answer))
}

// ---------------------------------------------------------------------------
// Grading
// ---------------------------------------------------------------------------

/// Create a draft correction.
pub async fn create_correction<S: GameStore>(
    State(state): ApiState<S>,
    _grader: Grader,
    Json(body): Json<CorrectionBody>,
) -> Result<(StatusCode, Json<Correction>), ApiError> {
    let draft = state
        .service
        .create_correction(body.user_id, body.question_id, body.status, body.feedback)
        .await?;
    Ok((StatusCode::CREATED, Json(draft)))
}

/// Revise a draft correction.
pub async fn revise_correction<S: GameStore>(
    State(state): ApiState<S>,
    _grader: Grader,
    Path(id): Path<Uuid>,
    Json(body): Json<RevisionBody>,
) -> Result<Json<Correction>, ApiError> {
    let draft = state
        .service
        .revise_correction(CorrectionId::from(id), body.status, body.feedback)
        .await?;
    Ok(Json(draft))
}

/// Finalize a draft so the correction job picks it up.
pub async fn finalize_correction<S: GameStore>(
    State(state): ApiState<S>,
    _grader: Grader,
    Path(id): Path<Uuid>,
) -> Result<Json<Correction>, ApiError> {
    let pending = state
        .service
        .finalize_correction(CorrectionId::from(id))
        .await?;
    Ok(Json(pending))
}

/// Open an investment session.
pub async fn create_session<S: GameStore>(
    State(state): ApiState<S>,
    _grader: Grader,
    Json(body): Json<SessionBody>,
) -> Result<(StatusCode, Json<InvestmentSession>), ApiError> {
    let session = state
        .service
        .create_session(body.text, body.end_at)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Pay out and close a session.
pub async fn resolve_session<S: GameStore>(
    State(state): ApiState<S>,
    _grader: Grader,
    Path(id): Path<Uuid>,
    Json(body): Json<ResolveBody>,
) -> Result<Json<SessionResolution>, ApiError> {
    let outcome = state
        .service
        .resolve_session(InvestmentSessionId::from(id), body.coefficient)
        .await?;
    Ok(Json(outcome))
}

/// Push a message to every connected player.
pub async fn broadcast<S: GameStore>(
    State(state): ApiState<S>,
    _grader: Grader,
    Json(body): Json<BroadcastBody>,
) -> impl IntoResponse {
    let delivered = state.service.broadcast(body.text).await;
    Json(serde_json::json!({ "delivered": delivered }))
}

/// Whether the game is paused.
pub async fn pause_state<S: GameStore>(
    State(state): ApiState<S>,
    _grader: Grader,
) -> Result<impl IntoResponse, ApiError> {
    let paused = state.service.is_paused().await?;
    Ok(Json(serde_json::json!({ "paused": paused })))
}

/// Pause or resume the game.
pub async fn set_pause<S: GameStore>(
    State(state): ApiState<S>,
    _grader: Grader,
    Json(body): Json<PauseBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.set_paused(body.paused).await?;
    Ok(Json(serde_json::json!({ "paused": body.paused })))
}
