//! Checkpoint route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use trackpro_core::route::{Checkpoint, CheckpointUpdate, NewCheckpoint};

use super::{not_found, store_error, ApiError};
use crate::state::AppState;

pub async fn create_checkpoint(
    State(state): State<AppState>,
    Json(req): Json<NewCheckpoint>,
) -> Result<(StatusCode, Json<Checkpoint>), ApiError> {
    let checkpoint = state.store.create_checkpoint(req).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(checkpoint)))
}

pub async fn update_checkpoint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CheckpointUpdate>,
) -> Result<Json<Checkpoint>, ApiError> {
    let checkpoint = state
        .store
        .update_checkpoint(id, req)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Checkpoint"))?;
    Ok(Json(checkpoint))
}

pub async fn delete_checkpoint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_checkpoint(id).await.map_err(store_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Checkpoint"))
    }
}
