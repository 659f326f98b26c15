//! Internal notification and health endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;
use trackpro_core::LiveMessage;

use crate::state::AppState;

/// Receive a live message from another process and broadcast it.
pub async fn notify(
    State(state): State<AppState>,
    Json(msg): Json<LiveMessage>,
) -> StatusCode {
    info!(kind = %msg.kind(), "Received internal notification, broadcasting to subscribers");
    state.hub.broadcast(&msg);
    StatusCode::OK
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub subscribers: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        subscribers: state.hub.registry().len(),
    })
}
