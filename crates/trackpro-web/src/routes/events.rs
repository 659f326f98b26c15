//! Event route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use trackpro_core::event::{Event, EventUpdate, EventWithStats, NewEvent};
use trackpro_core::route::Route;
use trackpro_core::LiveMessage;

use super::{not_found, store_error, ApiError};
use crate::state::AppState;

pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state.store.list_events().await.map_err(store_error)?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Event>, ApiError> {
    let event = state
        .store
        .get_event(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Event"))?;
    Ok(Json(event))
}

pub async fn get_event_stats(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EventWithStats>, ApiError> {
    let stats = state
        .store
        .event_with_stats(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Event"))?;
    Ok(Json(stats))
}

pub async fn get_event_route(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Route>>, ApiError> {
    let routes = state.store.routes_for_event(id).await.map_err(store_error)?;
    Ok(Json(routes))
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<NewEvent>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = state.store.create_event(req).await.map_err(store_error)?;
    state.hub.broadcast(&LiveMessage::EventUpdate(event.clone()));
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<EventUpdate>,
) -> Result<Json<Event>, ApiError> {
    let event = state
        .store
        .update_event(id, req)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Event"))?;
    state.hub.broadcast(&LiveMessage::EventUpdate(event.clone()));
    Ok(Json(event))
}
