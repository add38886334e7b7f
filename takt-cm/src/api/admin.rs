//! Staff-only administrative endpoints for the anonymization registry

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use takt_common::anonymize;
use takt_common::db::models::Candidate;
use takt_common::Error;
use uuid::Uuid;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RenumberRequest {
    pub candidate_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RenumberResponse {
    pub renumbered: usize,
}

/// POST /api/admin/renumber
///
/// Atomic batch renumbering before judging: the whole batch gets new
/// sequential ids in shuffled order, or nothing changes at all.
pub async fn renumber_candidates(
    State(state): State<AppState>,
    Json(req): Json<RenumberRequest>,
) -> Result<Json<RenumberResponse>, ApiError> {
    if req.candidate_ids.is_empty() {
        return Err(ApiError::BadRequest("candidate_ids is empty".to_string()));
    }

    match anonymize::renumber(&state.db, &req.candidate_ids).await {
        Ok(()) => Ok(Json(RenumberResponse {
            renumbered: req.candidate_ids.len(),
        })),
        Err(Error::BatchAborted(msg)) => Err(ApiError::Conflict(msg)),
        Err(other) => Err(other.into()),
    }
}

/// GET /api/admin/candidates/by-secret-id/:token
///
/// Exact, case-sensitive match; a miss is 404.
pub async fn candidate_by_secret_id(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Candidate>, ApiError> {
    let candidate = anonymize::find_by_secret_id(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no candidate with secret id {}", token)))?;

    Ok(Json(candidate))
}

#[derive(Debug, Serialize)]
pub struct SecretIdAuditResponse {
    /// Tokens currently held by more than one candidate; must be empty
    /// before a judging export is cut
    pub duplicates: Vec<String>,
}

/// GET /api/admin/secret-id-audit
pub async fn secret_id_audit(
    State(state): State<AppState>,
) -> Result<Json<SecretIdAuditResponse>, ApiError> {
    let duplicates = anonymize::duplicate_secret_ids(&state.db).await?;
    Ok(Json(SecretIdAuditResponse { duplicates }))
}
