//! Route (course) handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use trackpro_core::route::{Checkpoint, NewRoute, Route};

use super::{not_found, store_error, ApiError};
use crate::state::AppState;

pub async fn list_routes(State(state): State<AppState>) -> Result<Json<Vec<Route>>, ApiError> {
    let routes = state.store.list_routes().await.map_err(store_error)?;
    Ok(Json(routes))
}

pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Route>, ApiError> {
    let route = state
        .store
        .get_route(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Route"))?;
    Ok(Json(route))
}

pub async fn create_route(
    State(state): State<AppState>,
    Json(req): Json<NewRoute>,
) -> Result<(StatusCode, Json<Route>), ApiError> {
    let route = state.store.create_route(req).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn list_route_checkpoints(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Checkpoint>>, ApiError> {
    let checkpoints = state.store.checkpoints_for_route(id).await.map_err(store_error)?;
    Ok(Json(checkpoints))
}
