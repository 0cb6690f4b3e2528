//! Integration tests for the player API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, over an in-memory store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bermudia_api::router::build_router;
use bermudia_api::state::AppState;
use bermudia_core::{Catalog, GameService, Hub, ServiceSettings};
use bermudia_db::MemoryStore;
use bermudia_players::EconomyConfig;
use serde_json::{Value, json};
use tower::ServiceExt;

const CONTENT: &str = r"
startTerritory: bermuda
territories:
  - id: bermuda
    name: Bermuda
    startIsland: a
    islands:
      - { id: a, name: Alpha }
      - { id: b, name: Beta }
    edges:
      - { from: a, to: b }
      - { from: b, to: a }
    refuelIslands: [b]
questions:
  - { id: q1, knowledgeAmount: 10, resubmittable: true, rewardWorth: 0 }
treasures:
  - { id: chest-b, island: b }
";

type State = Arc<AppState<MemoryStore>>;

fn make_test_state(grader_token: Option<&str>) -> State {
    let service = GameService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(Catalog::parse(CONTENT).unwrap()),
        Arc::new(Hub::new(Duration::from_millis(100))),
        ServiceSettings {
            economy: EconomyConfig {
                initial_keys: 2,
                ..EconomyConfig::default()
            },
            ..ServiceSettings::default()
        },
    );
    Arc::new(AppState::new(service).with_grader_token(grader_token.map(String::from)))
}

fn request(method: &str, uri: &str, user: Option<i32>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(state: &State, req: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(state.clone()).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn onboard(state: &State, user: i32) -> Value {
    let (status, json) = send(state, request("GET", "/api/player", Some(user), None)).await;
    assert_eq!(status, StatusCode::OK);
    json
}

fn coins(amount: i32) -> Value {
    json!({ "items": [{ "type": "coin", "amount": amount }] })
}

fn blue_keys(amount: i32) -> Value {
    json!({ "items": [{ "type": "blueKey", "amount": amount }] })
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_health() {
    let state = make_test_state(None);
    let (status, json) = send(&state, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_missing_user_header_is_bad_request() {
    let state = make_test_state(None);
    let (status, json) = send(&state, request("GET", "/api/player", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "badRequest");
}

#[tokio::test]
async fn test_onboarding_returns_starting_player() {
    let state = make_test_state(None);
    let player = onboard(&state, 1).await;
    assert_eq!(player["userId"], 1);
    assert_eq!(player["island"], "a");
    assert_eq!(player["coin"], 400);
    assert_eq!(player["fuel"], 15);
    assert_eq!(player["blueKey"], 2);

    let again = onboard(&state, 1).await;
    assert_eq!(again, player);
}

#[tokio::test]
async fn test_actions_before_onboarding_are_not_found() {
    let state = make_test_state(None);
    let (status, json) = send(&state, request("GET", "/api/refuel/check", Some(9), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "notFound");
}

#[tokio::test]
async fn test_travel_and_stale_departure() {
    let state = make_test_state(None);
    onboard(&state, 1).await;
    let hop = json!({ "from": "a", "to": "b" });

    let (status, check) = send(
        &state,
        request("POST", "/api/travel/check", Some(1), Some(&hop)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["feasible"], true);

    let (status, player) = send(&state, request("POST", "/api/travel", Some(1), Some(&hop))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["island"], "b");
    assert_eq!(player["fuel"], 14);

    let (status, json) = send(&state, request("POST", "/api/travel", Some(1), Some(&hop))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "ruleViolation");
    assert_eq!(json["violation"]["code"], "locationMismatch");
}

#[tokio::test]
async fn test_refuel_only_on_refuel_islands() {
    let state = make_test_state(None);
    onboard(&state, 1).await;
    let (status, json) = send(
        &state,
        request("POST", "/api/refuel", Some(1), Some(&json!({ "amount": 1 }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "ruleViolation");
}

#[tokio::test]
async fn test_trade_round_trip() {
    let state = make_test_state(None);
    onboard(&state, 1).await;
    onboard(&state, 2).await;

    let body = json!({ "offered": coins(3), "requested": blue_keys(2) });
    let (status, offer) = send(
        &state,
        request("POST", "/api/trade/offers", Some(1), Some(&body)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = offer["id"].as_str().unwrap().to_owned();

    let (status, listing) = send(
        &state,
        request("GET", "/api/trade/offers?by=others", Some(2), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["offers"][0]["id"], id.as_str());
    assert_eq!(listing["offers"][0]["acceptable"], true);

    let (status, mine) = send(
        &state,
        request("GET", "/api/trade/offers?by=me", Some(2), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["count"], 0);

    let accept = format!("/api/trade/offers/{id}/accept");
    let (status, closed) = send(&state, request("POST", &accept, Some(2), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(closed["deletedAt"].is_string());

    let acceptor = onboard(&state, 2).await;
    assert_eq!(acceptor["coin"], 403);
    assert_eq!(acceptor["blueKey"], 0);
    let offerer = onboard(&state, 1).await;
    assert_eq!(offerer["coin"], 397);
    assert_eq!(offerer["blueKey"], 4);

    let (status, json) = send(&state, request("POST", &accept, Some(2), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["violation"]["code"], "offerAlreadyDeleted");

    let (status, inbox) = send(&state, request("GET", "/api/inbox?limit=5", Some(1), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox[0]["content"]["type"], "ownOfferAccepted");
    assert_eq!(inbox[0]["content"]["acceptedBy"], 2);
    assert_eq!(inbox[0]["content"]["offer"]["id"], id.as_str());
}

#[tokio::test]
async fn test_unknown_treasure_is_not_found() {
    let state = make_test_state(None);
    onboard(&state, 1).await;
    let (status, json) = send(
        &state,
        request("GET", "/api/treasures/nowhere/check", Some(1), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "notFound");
}

#[tokio::test]
async fn test_grader_routes_require_token() {
    let state = make_test_state(Some("s3cret"));
    let body = json!({ "text": "storm warning" });

    let (status, json) = send(
        &state,
        request("POST", "/api/grading/broadcast", None, Some(&body)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "unauthorized");

    let req = Request::post("/api/grading/broadcast")
        .header("x-grader-token", "s3cret")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, json) = send(&state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["delivered"], 0);
}

#[tokio::test]
async fn test_answer_and_correction_lifecycle() {
    let state = make_test_state(None);
    onboard(&state, 1).await;

    let submission = json!({ "text": "forty-two" });
    let (status, answer) = send(
        &state,
        request("POST", "/api/answers/q1", Some(1), Some(&submission)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["status"], "pending");

    let draft = json!({
        "user_id": 1,
        "question_id": "q1",
        "status": "wrong",
        "feedback": "close",
    });
    let (status, correction) = send(
        &state,
        request("POST", "/api/grading/corrections", None, Some(&draft)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = correction["id"].as_str().unwrap().to_owned();

    let revise = format!("/api/grading/corrections/{id}");
    let (status, revised) = send(
        &state,
        request("PATCH", &revise, None, Some(&json!({ "status": "correct" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revised["newStatus"], "correct");

    let finalize = format!("/api/grading/corrections/{id}/finalize");
    let (status, _) = send(&state, request("POST", &finalize, None, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, again) = send(&state, request("POST", &finalize, None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(again["violation"]["code"], "correctionNotDraft");

    let (status, pending) = send(&state, request("GET", "/api/answers/q1", Some(1), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["status"], "pending");
}

#[tokio::test]
async fn test_investment_session_flow() {
    let state = make_test_state(None);
    onboard(&state, 1).await;

    let (status, check) = send(&state, request("GET", "/api/invest/check", Some(1), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["feasible"], false);

    let end_at = chrono::Utc::now() + chrono::TimeDelta::hours(1);
    let (status, session) = send(
        &state,
        request(
            "POST",
            "/api/grading/sessions",
            None,
            Some(&json!({ "text": "Pearl futures", "end_at": end_at })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = session["id"].as_str().unwrap().to_owned();

    let stake = json!({ "session_id": session_id, "coin": 100 });
    let (status, _) = send(&state, request("POST", "/api/invest", Some(1), Some(&stake))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(onboard(&state, 1).await["coin"], 300);

    let resolve = format!("/api/grading/sessions/{session_id}/resolve");
    let (status, json) = send(
        &state,
        request("POST", &resolve, None, Some(&json!({ "coefficient": "1.5" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["violation"]["code"], "sessionStillOpen");
}

#[tokio::test]
async fn test_pause_locks_player_routes_only() {
    let state = make_test_state(None);
    onboard(&state, 1).await;

    let pause = json!({ "paused": true });
    let (status, json) = send(
        &state,
        request("PUT", "/api/grading/pause", None, Some(&pause)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["paused"], true);

    let (status, json) = send(&state, request("GET", "/api/player", Some(1), None)).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(json["kind"], "paused");

    let (status, json) = send(&state, request("GET", "/api/grading/pause", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["paused"], true);

    let resume = json!({ "paused": false });
    send(
        &state,
        request("PUT", "/api/grading/pause", None, Some(&resume)),
    )
    .await;
    let (status, _) = send(&state, request("GET", "/api/player", Some(1), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_migration_check_lists_the_home_territory() {
    let state = make_test_state(None);
    onboard(&state, 1).await;

    let (status, check) = send(&state, request("GET", "/api/migrate/check", Some(1), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["knowledgeCriteriaTerritory"], "bermuda");
    assert_eq!(check["options"][0]["status"], "resident");
    assert_eq!(check["options"][0]["reason"]["code"], "alreadyInTerritory");

    let body = json!({ "territory": "atlantis" });
    let (status, json) = send(&state, request("POST", "/api/migrate", Some(1), Some(&body))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "notFound");
}
