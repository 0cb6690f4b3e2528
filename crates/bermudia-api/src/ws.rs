//! `WebSocket` handler for per-player notifications.
//!
//! Clients connect to `GET /ws` as the user in `x-user-id` (browsers that
//! cannot set headers pass `?user=` instead). The connection is registered
//! with the [`Hub`](bermudia_core::Hub); every committed change to the
//! player arrives as one JSON text frame. A newer connection for the same
//! user, or a send that outlasts the hub deadline, ends this one with a
//! close frame.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::{debug, warn};

use bermudia_core::{Outgoing, Subscription};
use bermudia_db::GameStore;
use bermudia_types::UserId;

use crate::error::ApiError;
use crate::extract::{USER_HEADER, parse_user};
use crate::state::AppState;

/// Query parameters for `GET /ws`.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// User id, for clients that cannot set headers.
    pub user: Option<String>,
}

fn caller(headers: &HeaderMap, query: &WsQuery) -> Result<UserId, ApiError> {
    if let Some(value) = headers.get(USER_HEADER) {
        let raw = value
            .to_str()
            .map_err(|e| ApiError::BadRequest(format!("unreadable {USER_HEADER} header: {e}")))?;
        return parse_user(raw);
    }
    query.user.as_deref().map_or_else(
        || {
            Err(ApiError::BadRequest(format!(
                "missing {USER_HEADER} header or user parameter"
            )))
        },
        parse_user,
    )
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming the caller's notifications.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_notifications<S: GameStore>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user = caller(&headers, &query)?;
    Ok(ws.on_upgrade(move |socket| handle_ws(socket, state, user)))
}

/// Handle the `WebSocket` lifecycle: register with the hub, forward
/// notifications, and unregister on the way out.
async fn handle_ws<S: GameStore>(socket: WebSocket, state: Arc<AppState<S>>, user: UserId) {
    let hub = state.service.hub();
    let subscription = hub.register(user);
    let id = subscription.id;
    debug!(user_id = %user, "WebSocket client connected");

    pump(socket, subscription).await;

    hub.unregister(user, id);
    debug!(user_id = %user, "WebSocket client disconnected");
}

async fn pump(mut socket: WebSocket, mut subscription: Subscription) {
    loop {
        tokio::select! {
            outgoing = subscription.receiver.recv() => {
                match outgoing {
                    Some(Outgoing::Notify(notification)) => {
                        let json = match serde_json::to_string(&notification) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize notification: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            return;
                        }
                    }
                    Some(Outgoing::Close(reason)) => {
                        let frame = CloseFrame {
                            code: close_code::POLICY,
                            reason: Utf8Bytes::from_static(reason),
                        };
                        let _ = socket.send(Message::Close(Some(frame))).await;
                        return;
                    }
                    None => return,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Clients have nothing to say on this channel.
                    }
                }
            }
        }
    }
}
