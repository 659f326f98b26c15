//! Route handlers.

pub mod checkpoints;
pub mod devices;
pub mod events;
pub mod internal;
pub mod participants;
pub mod routes;
pub mod tracking;

use axum::http::StatusCode;
use trackpro_db::StoreError;

/// Error half of every handler result.
pub type ApiError = (StatusCode, String);

pub(crate) fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
    };
    (status, e.to_string())
}

pub(crate) fn not_found(what: &str) -> ApiError {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}
