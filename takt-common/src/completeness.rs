//! Candidate completeness aggregation
//!
//! The report answers "what is still missing before this candidate can be
//! qualified": a valid selection for every set list of their instrument,
//! every required recording uploaded, and both identity documents present.
//!
//! The report is recomputed on demand from the same records the validator
//! and recording subsystem write; nothing here is cached, so it cannot go
//! stale. Validity of each stored selection is derived by re-running the
//! validator over the stored pieces. Documents are checked by file presence
//! under the media root, not by row existence, since a path can be recorded
//! before the payload ever lands.

use crate::db::models::{Candidate, DocumentKind};
use crate::db::{catalog, recordings, selections};
use crate::repertoire;
use crate::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;

/// On-demand completeness report for one candidate
#[derive(Debug, Clone, Serialize)]
pub struct CompletenessReport {
    pub repertoire_complete: bool,
    pub set_lists_total: i64,
    pub set_lists_valid: i64,
    pub recordings_uploaded: i64,
    pub recordings_required: i64,
    pub missing_documents: Vec<DocumentKind>,
    /// Human-readable outstanding items for the candidate dashboard
    pub todos: Vec<String>,
}

impl CompletenessReport {
    /// Everything required for qualification is in place
    pub fn is_complete(&self) -> bool {
        self.repertoire_complete
            && self.recordings_uploaded >= self.recordings_required
            && self.missing_documents.is_empty()
    }
}

/// Compute the report for one candidate
///
/// An instrument with zero set lists or zero required recordings is
/// vacuously complete on that axis; the computation itself never fails on
/// domain grounds.
pub async fn completeness(
    pool: &SqlitePool,
    media_root: &Path,
    candidate: &Candidate,
) -> Result<CompletenessReport> {
    let set_list_ids = catalog::set_list_ids_for_instrument(pool, candidate.instrument_id).await?;
    let set_lists_total = set_list_ids.len() as i64;

    let mut set_lists_valid = 0i64;
    for set_list_id in set_list_ids {
        let snapshot = match catalog::load_set_list_catalog(pool, set_list_id).await? {
            Some(s) => s,
            None => continue,
        };
        let chosen = selections::load_selection_pieces(pool, candidate.guid, set_list_id).await?;
        if let Some(chosen) = chosen {
            if repertoire::validate(&snapshot, &chosen).is_ok() {
                set_lists_valid += 1;
            }
        }
    }

    let repertoire_complete = set_lists_valid == set_lists_total;

    let recordings_uploaded = recordings::count_complete(pool, candidate.guid).await?;
    let recordings_required =
        recordings::list_requirements(pool, candidate.instrument_id).await?.len() as i64;

    let mut missing_documents = Vec::new();
    if !document_present(media_root, candidate.photo_path.as_deref()) {
        missing_documents.push(DocumentKind::Photo);
    }
    if !document_present(media_root, candidate.passport_path.as_deref()) {
        missing_documents.push(DocumentKind::PassportScan);
    }

    let mut todos = Vec::new();
    if !repertoire_complete {
        todos.push("Complete your repertoire selection".to_string());
    }
    if recordings_uploaded < recordings_required {
        todos.push("Upload required recordings".to_string());
    }
    if missing_documents.contains(&DocumentKind::PassportScan) {
        todos.push("Upload scan of your passport".to_string());
    }
    if missing_documents.contains(&DocumentKind::Photo) {
        todos.push("Upload a photo of yourself".to_string());
    }

    Ok(CompletenessReport {
        repertoire_complete,
        set_lists_total,
        set_lists_valid,
        recordings_uploaded,
        recordings_required,
        missing_documents,
        todos,
    })
}

/// A document counts only when a non-empty file actually exists under the
/// media root
fn document_present(media_root: &Path, relative_path: Option<&str>) -> bool {
    let relative_path = match relative_path {
        Some(p) if !p.is_empty() => p,
        _ => return false,
    };

    match std::fs::metadata(media_root.join(relative_path)) {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}
