//! takt-cm library - Competition Management service
//!
//! HTTP surface over the Takt engine: candidate registration, repertoire
//! selection validation, recording upload tracking, completeness reports
//! and the anonymization registry. Authentication and session handling
//! live in front of this service; every request is assumed authorized.

use axum::Router;
use sqlx::SqlitePool;
use std::path::PathBuf;

pub mod api;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Folder where uploaded media (photos, passports, recordings) lands
    pub media_root: PathBuf,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, media_root: PathBuf) -> Self {
        Self { db, media_root }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    Router::new()
        .merge(api::health_routes())
        .route("/api/catalog/:instrument_id", get(api::get_catalog))
        .route("/api/candidates", post(api::register_candidate))
        .route("/api/candidates/:id", get(api::get_candidate))
        .route(
            "/api/candidates/:id/completeness",
            get(api::get_completeness),
        )
        .route("/api/candidates/:id/documents", put(api::update_documents))
        .route("/api/candidates/:id/qualify", post(api::qualify_candidate))
        .route(
            "/api/candidates/:id/selections",
            get(api::list_selections),
        )
        .route(
            "/api/candidates/:id/selections/:set_list_id",
            put(api::put_selection),
        )
        .route(
            "/api/candidates/:id/recordings",
            get(api::list_recordings),
        )
        .route(
            "/api/candidates/:id/recordings/:requirement_id",
            post(api::start_upload),
        )
        .route("/api/recordings/:id/complete", post(api::complete_upload))
        .route("/api/admin/instruments", post(api::create_instrument))
        .route("/api/admin/rounds", post(api::create_round))
        .route("/api/admin/set-lists", post(api::create_set_list))
        .route("/api/admin/pieces", post(api::create_piece))
        .route(
            "/api/admin/required-recordings",
            post(api::create_required_recording),
        )
        .route("/api/admin/renumber", post(api::renumber_candidates))
        .route(
            "/api/admin/candidates/by-secret-id/:token",
            get(api::candidate_by_secret_id),
        )
        .route("/api/admin/secret-id-audit", get(api::secret_id_audit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
