//! Device route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use trackpro_core::device::{Device, DeviceUpdate, NewDevice};

use super::{not_found, store_error, ApiError};
use crate::state::AppState;

pub async fn list_devices(State(state): State<AppState>) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = state.store.list_devices().await.map_err(store_error)?;
    Ok(Json(devices))
}

pub async fn list_unassigned_devices(
    State(state): State<AppState>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = state.store.unassigned_devices().await.map_err(store_error)?;
    Ok(Json(devices))
}

pub async fn list_devices_by_type(
    State(state): State<AppState>,
    Path(device_type): Path<String>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = state
        .store
        .devices_by_type(&device_type)
        .await
        .map_err(store_error)?;
    Ok(Json(devices))
}

pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .store
        .get_device(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Device"))?;
    Ok(Json(device))
}

pub async fn create_device(
    State(state): State<AppState>,
    Json(req): Json<NewDevice>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    let device = state.store.create_device(req).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(device)))
}

pub async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<DeviceUpdate>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .store
        .update_device(id, req)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Device"))?;
    Ok(Json(device))
}

pub async fn assign_device(
    State(state): State<AppState>,
    Path((device_id, participant_id)): Path<(i64, i64)>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .store
        .assign_device(device_id, participant_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Device or participant"))?;
    Ok(Json(device))
}

pub async fn unassign_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .store
        .unassign_device(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Device"))?;
    Ok(Json(device))
}
