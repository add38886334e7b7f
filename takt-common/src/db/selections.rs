//! Selection persistence
//!
//! A selection is the join between one candidate, one set list and the
//! chosen pieces. Rows are created lazily on the first submit and replaced
//! wholesale on resubmit. The chosen pieces are stored whether or not they
//! satisfy the set list's rules, so the candidate can always see what they
//! picked; validity is derived on read by the validator.

use crate::db::parse_guid;
use crate::{Error, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

/// Replace the candidate's choice for one set list, creating the selection
/// row if this is the first submit
pub async fn store_selection(
    pool: &SqlitePool,
    candidate_id: Uuid,
    set_list_id: Uuid,
    piece_ids: &HashSet<Uuid>,
) -> Result<Uuid> {
    let mut tx = pool.begin().await?;

    let existing: Option<String> = sqlx::query_scalar(
        "SELECT guid FROM selections WHERE candidate_id = ? AND set_list_id = ?",
    )
    .bind(candidate_id.to_string())
    .bind(set_list_id.to_string())
    .fetch_optional(&mut *tx)
    .await?;

    let selection_id = match existing {
        Some(guid) => {
            let guid = parse_guid(&guid)?;
            sqlx::query("UPDATE selections SET updated_at = ? WHERE guid = ?")
                .bind(Utc::now().to_rfc3339())
                .bind(guid.to_string())
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM selection_pieces WHERE selection_id = ?")
                .bind(guid.to_string())
                .execute(&mut *tx)
                .await?;
            guid
        }
        None => {
            let guid = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO selections (guid, candidate_id, set_list_id) VALUES (?, ?, ?)",
            )
            .bind(guid.to_string())
            .bind(candidate_id.to_string())
            .bind(set_list_id.to_string())
            .execute(&mut *tx)
            .await?;
            guid
        }
    };

    for piece_id in piece_ids {
        sqlx::query("INSERT INTO selection_pieces (selection_id, piece_id) VALUES (?, ?)")
            .bind(selection_id.to_string())
            .bind(piece_id.to_string())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(selection_id)
}

/// Chosen piece guids for one (candidate, set list) pair, `None` when the
/// candidate has not submitted for this set list yet
pub async fn load_selection_pieces(
    pool: &SqlitePool,
    candidate_id: Uuid,
    set_list_id: Uuid,
) -> Result<Option<HashSet<Uuid>>> {
    let selection: Option<String> = sqlx::query_scalar(
        "SELECT guid FROM selections WHERE candidate_id = ? AND set_list_id = ?",
    )
    .bind(candidate_id.to_string())
    .bind(set_list_id.to_string())
    .fetch_optional(pool)
    .await?;

    let selection_id = match selection {
        Some(guid) => parse_guid(&guid)?,
        None => return Ok(None),
    };

    let rows = sqlx::query("SELECT piece_id FROM selection_pieces WHERE selection_id = ?")
        .bind(selection_id.to_string())
        .fetch_all(pool)
        .await?;

    let mut pieces = HashSet::with_capacity(rows.len());
    for row in &rows {
        pieces.insert(parse_guid(row.get(0))?);
    }

    Ok(Some(pieces))
}

/// Guard that the set list actually exists before touching selections
pub async fn set_list_exists(pool: &SqlitePool, set_list_id: Uuid) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM set_lists WHERE guid = ?")
        .bind(set_list_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

/// Map a set-list guid back to its candidate-facing labels for listings
pub async fn set_list_labels(pool: &SqlitePool, set_list_id: Uuid) -> Result<(String, String)> {
    let row = sqlx::query(
        "SELECT r.name, sl.name
         FROM set_lists sl
         JOIN rounds r ON sl.round_id = r.guid
         WHERE sl.guid = ?",
    )
    .bind(set_list_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok((row.get(0), row.get(1))),
        None => Err(Error::NotFound(format!("set list {}", set_list_id))),
    }
}
