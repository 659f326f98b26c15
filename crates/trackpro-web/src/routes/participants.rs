//! Participant route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use trackpro_core::device::Device;
use trackpro_core::participant::{
    NewParticipant, Participant, ParticipantUpdate, ParticipantWithTracking,
};
use trackpro_core::tracking::{TrackingPoint, DEFAULT_HISTORY_LIMIT};
use trackpro_core::LiveMessage;

use super::{not_found, store_error, ApiError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub async fn list_event_participants(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    let participants = state
        .store
        .participants_for_event(event_id)
        .await
        .map_err(store_error)?;
    Ok(Json(participants))
}

pub async fn list_event_participants_tracking(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<ParticipantWithTracking>>, ApiError> {
    let participants = state
        .store
        .participants_with_tracking(event_id)
        .await
        .map_err(store_error)?;
    Ok(Json(participants))
}

pub async fn get_participant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Participant>, ApiError> {
    let participant = state
        .store
        .get_participant(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Participant"))?;
    Ok(Json(participant))
}

pub async fn create_participant(
    State(state): State<AppState>,
    Json(req): Json<NewParticipant>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let participant = state.store.create_participant(req).await.map_err(store_error)?;
    state
        .hub
        .broadcast(&LiveMessage::ParticipantStatus(participant.clone()));
    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn update_participant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ParticipantUpdate>,
) -> Result<Json<Participant>, ApiError> {
    let participant = state
        .store
        .update_participant(id, req)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Participant"))?;
    state
        .hub
        .broadcast(&LiveMessage::ParticipantStatus(participant.clone()));
    Ok(Json(participant))
}

pub async fn get_participant_tracking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TrackingPoint>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let points = state
        .store
        .tracking_history(id, limit)
        .await
        .map_err(store_error)?;
    Ok(Json(points))
}

pub async fn get_participant_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .store
        .device_for_participant(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "No device assigned to this participant".to_string()))?;
    Ok(Json(device))
}
