//! Recording upload endpoints
//!
//! The binary transfer itself is the storage collaborator's job. This
//! service creates the placeholder row, hands back the media-root-relative
//! target path, and flips `is_complete` once the client reports the upload
//! finished and the payload is verified on disk.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use takt_common::db::models::{Candidate, Recording, RequiredRecording};
use takt_common::db::{candidates, recordings};
use uuid::Uuid;

use crate::api::ApiError;
use crate::AppState;

/// Accepted container formats for submitted recordings
const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

#[derive(Debug, Serialize)]
pub struct RequirementStatus {
    #[serde(flatten)]
    pub requirement: RequiredRecording,
    pub recording: Option<Recording>,
}

/// GET /api/candidates/:id/recordings
///
/// Every requirement for the candidate's instrument with the matching
/// recording row, if any.
pub async fn list_recordings(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<Vec<RequirementStatus>>, ApiError> {
    let candidate = load_candidate(&state, candidate_id).await?;

    let requirements = recordings::list_requirements(&state.db, candidate.instrument_id).await?;
    let mut by_requirement: std::collections::HashMap<Uuid, Recording> =
        recordings::recordings_by_requirement(&state.db, candidate.guid)
            .await?
            .into_iter()
            .collect();

    let statuses = requirements
        .into_iter()
        .map(|requirement| {
            let recording = by_requirement.remove(&requirement.guid);
            RequirementStatus {
                requirement,
                recording,
            }
        })
        .collect();

    Ok(Json(statuses))
}

#[derive(Debug, Deserialize)]
pub struct StartUploadRequest {
    pub extension: String,
}

#[derive(Debug, Serialize)]
pub struct StartUploadResponse {
    #[serde(flatten)]
    pub recording: Recording,
    /// Where the storage collaborator must put the payload, relative to
    /// the media root
    pub upload_path: String,
}

/// POST /api/candidates/:id/recordings/:requirement_id
///
/// Creates (or reuses) the placeholder row and assigns the target path
/// `<candidate>/recordings/<nr>_<slug>_<recording>.<ext>`.
pub async fn start_upload(
    State(state): State<AppState>,
    Path((candidate_id, requirement_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<StartUploadRequest>,
) -> Result<Json<StartUploadResponse>, ApiError> {
    let extension = req.extension.to_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "extension {} not allowed (use one of: {})",
            req.extension,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let candidate = load_candidate(&state, candidate_id).await?;

    let requirement = recordings::load_requirement(&state.db, requirement_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("requirement {}", requirement_id)))?;

    if requirement.instrument_id != candidate.instrument_id {
        return Err(ApiError::BadRequest(
            "requirement belongs to a different instrument".to_string(),
        ));
    }

    let recording =
        recordings::get_or_create_recording(&state.db, candidate.guid, requirement.guid).await?;

    let upload_path = format!(
        "{}/recordings/{:02}_{}_{}.{}",
        candidate.guid, requirement.nr, requirement.slug, recording.guid, extension
    );
    recordings::set_file_path(&state.db, recording.guid, &upload_path).await?;

    let recording = recordings::load_recording(&state.db, recording.guid)
        .await?
        .ok_or_else(|| ApiError::Internal("recording vanished after update".to_string()))?;

    Ok(Json(StartUploadResponse {
        recording,
        upload_path,
    }))
}

/// POST /api/recordings/:id/complete
///
/// Client-reported "upload finished". The payload must actually exist and
/// be non-empty before the completion flag is set; until then the row stays
/// a placeholder and does not count toward completeness.
pub async fn complete_upload(
    State(state): State<AppState>,
    Path(recording_id): Path<Uuid>,
) -> Result<Json<Recording>, ApiError> {
    let recording = recordings::load_recording(&state.db, recording_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("recording {}", recording_id)))?;

    let file_path = recording
        .file_path
        .as_deref()
        .ok_or_else(|| ApiError::Conflict("no upload was started for this recording".to_string()))?;

    let on_disk = state.media_root.join(file_path);
    let payload_landed = std::fs::metadata(&on_disk)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false);

    if !payload_landed {
        return Err(ApiError::Conflict(
            "upload payload has not landed in storage".to_string(),
        ));
    }

    recordings::mark_complete(&state.db, recording_id).await?;

    let recording = recordings::load_recording(&state.db, recording_id)
        .await?
        .ok_or_else(|| ApiError::Internal("recording vanished after update".to_string()))?;

    Ok(Json(recording))
}

async fn load_candidate(state: &AppState, id: Uuid) -> Result<Candidate, ApiError> {
    candidates::load_candidate(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("candidate {}", id)))
}
