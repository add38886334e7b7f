//! Candidate registration, detail and qualification endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use takt_common::anonymize;
use takt_common::completeness::{completeness, CompletenessReport};
use takt_common::db::candidates::{self, NewCandidate};
use takt_common::db::catalog;
use takt_common::db::models::{Candidate, Gender};
use uuid::Uuid;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub instrument_id: Uuid,
    pub given_name: String,
    pub surname: String,
    pub gender: Gender,
    pub date_of_birth: String,
    pub nationality: String,
    pub email: String,
    pub phone: String,
    pub education: String,
    pub occupation: String,
    pub notes: Option<String>,
}

/// POST /api/candidates
///
/// Registers a candidate and assigns a collision-checked secret id.
pub async fn register_candidate(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Candidate>), ApiError> {
    for (field, value) in [
        ("given_name", &req.given_name),
        ("surname", &req.surname),
        ("email", &req.email),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::BadRequest(format!("{} is required", field)));
        }
    }

    if catalog::load_instrument(&state.db, req.instrument_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "unknown instrument {}",
            req.instrument_id
        )));
    }

    if candidates::email_taken(&state.db, &req.email).await? {
        return Err(ApiError::Conflict(
            "This email has already been registered".to_string(),
        ));
    }

    let secret_id = anonymize::assign_secret_id(&state.db).await?;

    let new = NewCandidate {
        instrument_id: req.instrument_id,
        given_name: req.given_name,
        surname: req.surname,
        gender: req.gender,
        date_of_birth: req.date_of_birth,
        nationality: req.nationality,
        email: req.email,
        phone: req.phone,
        education: req.education,
        occupation: req.occupation,
        notes: req.notes,
    };

    let candidate = candidates::insert_candidate(&state.db, &new, &secret_id).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

#[derive(Debug, Serialize)]
pub struct CandidateDetailResponse {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub completeness: CompletenessReport,
}

/// GET /api/candidates/:id
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CandidateDetailResponse>, ApiError> {
    let candidate = load_or_404(&state, id).await?;
    let report = completeness(&state.db, &state.media_root, &candidate).await?;

    Ok(Json(CandidateDetailResponse {
        candidate,
        completeness: report,
    }))
}

/// GET /api/candidates/:id/completeness
///
/// Recomputed on demand; there is no cached copy to go stale.
pub async fn get_completeness(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompletenessReport>, ApiError> {
    let candidate = load_or_404(&state, id).await?;
    let report = completeness(&state.db, &state.media_root, &candidate).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentsRequest {
    /// Media-root-relative path of the uploaded photo
    pub photo_path: Option<String>,
    /// Media-root-relative path of the uploaded passport scan
    pub passport_path: Option<String>,
}

/// PUT /api/candidates/:id/documents
///
/// Records where the storage collaborator put the files. Presence is still
/// verified against the filesystem whenever completeness is computed.
pub async fn update_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDocumentsRequest>,
) -> Result<Json<Candidate>, ApiError> {
    candidates::update_documents(
        &state.db,
        id,
        req.photo_path.as_deref(),
        req.passport_path.as_deref(),
    )
    .await?;

    let candidate = load_or_404(&state, id).await?;
    Ok(Json(candidate))
}

#[derive(Debug, Serialize)]
pub struct QualifyResponse {
    pub guid: Uuid,
    pub is_qualified: bool,
}

/// POST /api/candidates/:id/qualify
///
/// Staff gate: refuses unless the completeness report is fully green.
pub async fn qualify_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QualifyResponse>, ApiError> {
    let candidate = load_or_404(&state, id).await?;
    let report = completeness(&state.db, &state.media_root, &candidate).await?;

    if !report.is_complete() {
        return Err(ApiError::Conflict(format!(
            "candidate is not complete: {}",
            report.todos.join("; ")
        )));
    }

    candidates::set_qualified(&state.db, id, true).await?;

    Ok(Json(QualifyResponse {
        guid: id,
        is_qualified: true,
    }))
}

async fn load_or_404(state: &AppState, id: Uuid) -> Result<Candidate, ApiError> {
    candidates::load_candidate(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("candidate {}", id)))
}
