//! Piece catalog endpoints
//!
//! Read side feeds the repertoire selection form; write side is the staff
//! CRUD used to enter reference data before the competition opens.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use takt_common::db::catalog;
use takt_common::db::models::{Instrument, Piece, RequiredRecording, Round, SetList};
use takt_common::units::{units_to_value, value_to_units};
use uuid::Uuid;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PieceView {
    pub guid: Uuid,
    pub title: String,
    pub value_units: i64,
    pub value: f64,
    pub excludes: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SetListView {
    pub guid: Uuid,
    pub name: String,
    pub required_units: i64,
    pub required: f64,
    pub pieces: Vec<PieceView>,
}

#[derive(Debug, Serialize)]
pub struct RoundView {
    pub guid: Uuid,
    pub name: String,
    pub set_lists: Vec<SetListView>,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub instrument: Instrument,
    pub rounds: Vec<RoundView>,
}

/// GET /api/catalog/:instrument_id
///
/// Rounds with nested set lists and pieces, ordered for display
/// (round name, set-list name, piece title).
pub async fn get_catalog(
    State(state): State<AppState>,
    Path(instrument_id): Path<Uuid>,
) -> Result<Json<CatalogResponse>, ApiError> {
    let instrument = catalog::load_instrument(&state.db, instrument_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("instrument {}", instrument_id)))?;

    let rounds = catalog::load_instrument_catalog(&state.db, instrument_id).await?;

    let rounds = rounds
        .into_iter()
        .map(|(round, set_lists)| RoundView {
            guid: round.guid,
            name: round.name,
            set_lists: set_lists
                .into_iter()
                .map(|sl| SetListView {
                    guid: sl.guid,
                    name: sl.name,
                    required_units: sl.required_units,
                    required: units_to_value(sl.required_units),
                    pieces: sl
                        .pieces
                        .into_iter()
                        .map(|p| {
                            let mut excludes: Vec<Uuid> = p.excludes.into_iter().collect();
                            excludes.sort();
                            PieceView {
                                guid: p.guid,
                                title: p.title,
                                value_units: p.value_units,
                                value: units_to_value(p.value_units),
                                excludes,
                            }
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    Ok(Json(CatalogResponse { instrument, rounds }))
}

#[derive(Debug, Deserialize)]
pub struct CreateInstrumentRequest {
    pub name: String,
}

/// POST /api/admin/instruments
pub async fn create_instrument(
    State(state): State<AppState>,
    Json(req): Json<CreateInstrumentRequest>,
) -> Result<Json<Instrument>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("instrument name is required".to_string()));
    }

    let instrument = catalog::insert_instrument(&state.db, req.name.trim()).await?;
    Ok(Json(instrument))
}

#[derive(Debug, Deserialize)]
pub struct CreateRoundRequest {
    pub instrument_id: Uuid,
    pub name: String,
}

/// POST /api/admin/rounds
pub async fn create_round(
    State(state): State<AppState>,
    Json(req): Json<CreateRoundRequest>,
) -> Result<Json<Round>, ApiError> {
    let round = catalog::insert_round(&state.db, req.instrument_id, &req.name).await?;
    Ok(Json(round))
}

#[derive(Debug, Deserialize)]
pub struct CreateSetListRequest {
    pub round_id: Uuid,
    pub name: String,
    /// Quota as a fractional value; defaults to one whole piece
    #[serde(default = "default_quota")]
    pub required: f64,
}

fn default_quota() -> f64 {
    1.0
}

/// POST /api/admin/set-lists
pub async fn create_set_list(
    State(state): State<AppState>,
    Json(req): Json<CreateSetListRequest>,
) -> Result<Json<SetList>, ApiError> {
    let required_units = value_to_units(req.required)?;
    let set_list =
        catalog::insert_set_list(&state.db, req.round_id, &req.name, required_units).await?;
    Ok(Json(set_list))
}

#[derive(Debug, Deserialize)]
pub struct CreatePieceRequest {
    pub set_list_id: Uuid,
    pub title: String,
    pub composer: Option<String>,
    /// Piece value as a fractional count; defaults to one whole piece
    #[serde(default = "default_quota")]
    pub value: f64,
    /// Pieces this one cannot be combined with. Stored as declared; the
    /// validator treats the relation as symmetric either way.
    #[serde(default)]
    pub excludes: Vec<Uuid>,
}

/// POST /api/admin/pieces
pub async fn create_piece(
    State(state): State<AppState>,
    Json(req): Json<CreatePieceRequest>,
) -> Result<Json<Piece>, ApiError> {
    let value_units = value_to_units(req.value)?;
    let piece = catalog::insert_piece(
        &state.db,
        req.set_list_id,
        &req.title,
        req.composer.as_deref(),
        value_units,
        &req.excludes,
    )
    .await?;
    Ok(Json(piece))
}

#[derive(Debug, Deserialize)]
pub struct CreateRequiredRecordingRequest {
    pub instrument_id: Uuid,
    pub name: String,
    pub slug: String,
    pub nr: i64,
}

/// POST /api/admin/required-recordings
pub async fn create_required_recording(
    State(state): State<AppState>,
    Json(req): Json<CreateRequiredRecordingRequest>,
) -> Result<Json<RequiredRecording>, ApiError> {
    if catalog::load_instrument(&state.db, req.instrument_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("instrument {}", req.instrument_id)));
    }

    let requirement = takt_common::db::recordings::insert_requirement(
        &state.db,
        req.instrument_id,
        &req.name,
        &req.slug,
        req.nr,
    )
    .await?;
    Ok(Json(requirement))
}
