//! HTTP endpoints

use crate::core::error::SessionError;
use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;

pub mod actions;
pub mod equipment;
pub mod sessions;

/// Every endpoint, ready for a service provider.
pub fn router() -> Router {
    Router::new()
        .nest("/actions", actions::router())
        .nest("/equipment", equipment::router())
        .nest("/sessions", sessions::router())
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::NotFound | SessionError::UnknownEquipment(_) => StatusCode::NOT_FOUND,
            SessionError::Busy | SessionError::NoPendingOrder | SessionError::NoBagSearch => {
                StatusCode::CONFLICT
            }
            SessionError::EmptyMessage | SessionError::EmptyBagId => StatusCode::BAD_REQUEST,
            SessionError::Store(e) => {
                error!("{e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
