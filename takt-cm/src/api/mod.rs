//! HTTP API handlers for takt-cm

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub mod admin;
pub mod candidates;
pub mod catalog;
pub mod health;
pub mod recordings;
pub mod selections;

pub use admin::{candidate_by_secret_id, renumber_candidates, secret_id_audit};
pub use candidates::{
    get_candidate, get_completeness, qualify_candidate, register_candidate, update_documents,
};
pub use catalog::{
    create_instrument, create_piece, create_required_recording, create_round, create_set_list,
    get_catalog,
};
pub use health::health_routes;
pub use recordings::{complete_upload, list_recordings, start_upload};
pub use selections::{list_selections, put_selection};

/// API error responses, rendered as JSON `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

impl From<takt_common::Error> for ApiError {
    fn from(err: takt_common::Error) -> Self {
        use takt_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::BatchAborted(msg) => ApiError::Conflict(msg),
            Error::Database(e) => ApiError::Internal(format!("Database error: {}", e)),
            Error::Io(e) => ApiError::Internal(format!("IO error: {}", e)),
            Error::Config(msg) => ApiError::Internal(format!("Configuration error: {}", msg)),
            Error::Internal(msg) => ApiError::Internal(msg),
        }
    }
}
