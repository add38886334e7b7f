//! Required recordings and submitted recordings
//!
//! Upload is asynchronous: a placeholder recording row is created when the
//! candidate starts an upload, the payload lands out of band, and
//! `mark_complete` flips `is_complete` once the file is verified on disk.
//! Only complete recordings count toward candidate completeness.

use crate::db::models::{Recording, RequiredRecording};
use crate::db::parse_guid;
use crate::{Error, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn requirement_from_row(row: &SqliteRow) -> Result<RequiredRecording> {
    Ok(RequiredRecording {
        guid: parse_guid(row.get(0))?,
        instrument_id: parse_guid(row.get(1))?,
        name: row.get(2),
        slug: row.get(3),
        nr: row.get(4),
    })
}

fn recording_from_row(row: &SqliteRow) -> Result<Recording> {
    Ok(Recording {
        guid: parse_guid(row.get(0))?,
        candidate_id: parse_guid(row.get(1))?,
        requirement_id: parse_guid(row.get(2))?,
        file_path: row.get(3),
        is_complete: row.get::<i64, _>(4) != 0,
        created_at: row.get(5),
        updated_at: row.get(6),
    })
}

pub async fn insert_requirement(
    pool: &SqlitePool,
    instrument_id: Uuid,
    name: &str,
    slug: &str,
    nr: i64,
) -> Result<RequiredRecording> {
    let requirement = RequiredRecording {
        guid: Uuid::new_v4(),
        instrument_id,
        name: name.to_string(),
        slug: slug.to_string(),
        nr,
    };

    sqlx::query(
        "INSERT INTO required_recordings (guid, instrument_id, name, slug, nr) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(requirement.guid.to_string())
    .bind(requirement.instrument_id.to_string())
    .bind(&requirement.name)
    .bind(&requirement.slug)
    .bind(requirement.nr)
    .execute(pool)
    .await?;

    Ok(requirement)
}

/// Requirements for an instrument in their numbered order
pub async fn list_requirements(
    pool: &SqlitePool,
    instrument_id: Uuid,
) -> Result<Vec<RequiredRecording>> {
    let rows = sqlx::query(
        "SELECT guid, instrument_id, name, slug, nr
         FROM required_recordings
         WHERE instrument_id = ?
         ORDER BY nr",
    )
    .bind(instrument_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(requirement_from_row).collect()
}

pub async fn load_requirement(
    pool: &SqlitePool,
    guid: Uuid,
) -> Result<Option<RequiredRecording>> {
    let row = sqlx::query(
        "SELECT guid, instrument_id, name, slug, nr FROM required_recordings WHERE guid = ?",
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(requirement_from_row).transpose()
}

const RECORDING_COLUMNS: &str =
    "guid, candidate_id, requirement_id, file_path, is_complete, created_at, updated_at";

/// Fetch the candidate's recording for one requirement, creating the
/// placeholder row on first use
pub async fn get_or_create_recording(
    pool: &SqlitePool,
    candidate_id: Uuid,
    requirement_id: Uuid,
) -> Result<Recording> {
    sqlx::query(
        "INSERT OR IGNORE INTO recordings (guid, candidate_id, requirement_id) VALUES (?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(candidate_id.to_string())
    .bind(requirement_id.to_string())
    .execute(pool)
    .await?;

    let row = sqlx::query(&format!(
        "SELECT {} FROM recordings WHERE candidate_id = ? AND requirement_id = ?",
        RECORDING_COLUMNS
    ))
    .bind(candidate_id.to_string())
    .bind(requirement_id.to_string())
    .fetch_one(pool)
    .await?;

    recording_from_row(&row)
}

pub async fn load_recording(pool: &SqlitePool, guid: Uuid) -> Result<Option<Recording>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM recordings WHERE guid = ?",
        RECORDING_COLUMNS
    ))
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(recording_from_row).transpose()
}

/// Record where the payload is expected to land, relative to the media root
pub async fn set_file_path(pool: &SqlitePool, guid: Uuid, file_path: &str) -> Result<()> {
    let result = sqlx::query("UPDATE recordings SET file_path = ?, updated_at = ? WHERE guid = ?")
        .bind(file_path)
        .bind(Utc::now().to_rfc3339())
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("recording {}", guid)));
    }

    Ok(())
}

/// Flip the durable upload-finished signal
pub async fn mark_complete(pool: &SqlitePool, guid: Uuid) -> Result<()> {
    let result =
        sqlx::query("UPDATE recordings SET is_complete = 1, updated_at = ? WHERE guid = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(guid.to_string())
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("recording {}", guid)));
    }

    Ok(())
}

/// Completed uploads for one candidate; placeholder rows are excluded
pub async fn count_complete(pool: &SqlitePool, candidate_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM recordings WHERE candidate_id = ? AND is_complete = 1",
    )
    .bind(candidate_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// The candidate's recording rows keyed by requirement, for the upload
/// status listing
pub async fn recordings_by_requirement(
    pool: &SqlitePool,
    candidate_id: Uuid,
) -> Result<Vec<(Uuid, Recording)>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM recordings WHERE candidate_id = ?",
        RECORDING_COLUMNS
    ))
    .bind(candidate_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let recording = recording_from_row(row)?;
            Ok((recording.requirement_id, recording))
        })
        .collect()
}
