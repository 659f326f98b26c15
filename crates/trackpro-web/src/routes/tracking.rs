//! Tracking and alert route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use trackpro_core::tracking::{AlertInfo, NewTrackingPoint, TrackingPoint};
use trackpro_core::LiveMessage;

use super::{not_found, store_error, ApiError};
use crate::state::AppState;

/// Record a tracking point and fan it out, like a report on the live channel.
pub async fn create_tracking_point(
    State(state): State<AppState>,
    Json(req): Json<NewTrackingPoint>,
) -> Result<(StatusCode, Json<TrackingPoint>), ApiError> {
    let point = state.hub.ingest(req).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(point)))
}

pub async fn list_event_alerts(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<AlertInfo>>, ApiError> {
    let alerts = state.store.active_alerts(event_id).await.map_err(store_error)?;
    Ok(Json(alerts))
}

pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.resolve_alert(id).await.map_err(store_error)? {
        return Err(not_found("Tracking point"));
    }
    state.hub.broadcast(&LiveMessage::alert_resolved(id));
    Ok(Json(json!({ "success": true })))
}
