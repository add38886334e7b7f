//! Repertoire selection endpoints
//!
//! Submitting a choice stores it whether or not it validates, so the
//! candidate can always see what they picked; the validation outcome is
//! returned with every violation listed. An out-of-scope piece is the one
//! hard failure: nothing is stored and the request is rejected outright.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use takt_common::db::models::Candidate;
use takt_common::db::{candidates, catalog, selections};
use takt_common::repertoire::{self, SelectionError, Violation};
use uuid::Uuid;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PutSelectionRequest {
    pub piece_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SelectionOutcome {
    pub set_list_id: Uuid,
    pub valid: bool,
    pub violations: Vec<Violation>,
}

/// PUT /api/candidates/:id/selections/:set_list_id
pub async fn put_selection(
    State(state): State<AppState>,
    Path((candidate_id, set_list_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<PutSelectionRequest>,
) -> Result<Json<SelectionOutcome>, ApiError> {
    let candidate = load_candidate(&state, candidate_id).await?;

    let snapshot = catalog::load_set_list_catalog(&state.db, set_list_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("set list {}", set_list_id)))?;

    let chosen: HashSet<Uuid> = req.piece_ids.iter().copied().collect();

    let outcome = match repertoire::validate(&snapshot, &chosen) {
        Ok(()) => SelectionOutcome {
            set_list_id,
            valid: true,
            violations: Vec::new(),
        },
        Err(SelectionError::InvalidScope { piece_id }) => {
            // Caller bug or tampering; reject without storing
            return Err(ApiError::BadRequest(format!(
                "piece {} does not belong to set list {}",
                piece_id, set_list_id
            )));
        }
        Err(SelectionError::Rejected { violations }) => SelectionOutcome {
            set_list_id,
            valid: false,
            violations,
        },
    };

    selections::store_selection(&state.db, candidate.guid, set_list_id, &chosen).await?;

    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct SelectionStatus {
    pub set_list_id: Uuid,
    pub round_name: String,
    pub set_list_name: String,
    pub piece_ids: Vec<Uuid>,
    /// `None` when the candidate has not submitted for this set list yet
    pub valid: Option<bool>,
}

/// GET /api/candidates/:id/selections
///
/// One row per set list of the candidate's instrument, with the stored
/// choice and its validity derived on read.
pub async fn list_selections(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<Vec<SelectionStatus>>, ApiError> {
    let candidate = load_candidate(&state, candidate_id).await?;

    let set_list_ids =
        catalog::set_list_ids_for_instrument(&state.db, candidate.instrument_id).await?;

    let mut statuses = Vec::with_capacity(set_list_ids.len());

    for set_list_id in set_list_ids {
        let (round_name, set_list_name) = selections::set_list_labels(&state.db, set_list_id).await?;

        let snapshot = match catalog::load_set_list_catalog(&state.db, set_list_id).await? {
            Some(s) => s,
            None => continue,
        };

        let chosen = selections::load_selection_pieces(&state.db, candidate.guid, set_list_id).await?;

        let (piece_ids, valid) = match chosen {
            Some(chosen) => {
                let valid = repertoire::validate(&snapshot, &chosen).is_ok();
                let mut ids: Vec<Uuid> = chosen.into_iter().collect();
                ids.sort();
                (ids, Some(valid))
            }
            None => (Vec::new(), None),
        };

        statuses.push(SelectionStatus {
            set_list_id,
            round_name,
            set_list_name,
            piece_ids,
            valid,
        });
    }

    Ok(Json(statuses))
}

async fn load_candidate(state: &AppState, id: Uuid) -> Result<Candidate, ApiError> {
    candidates::load_candidate(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("candidate {}", id)))
}
