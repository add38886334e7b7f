//! Anonymized secret-id registry
//!
//! Judging is blind: exports and jury-facing views identify a candidate only
//! by an opaque `secret_id`. Two mechanisms manage these tokens:
//!
//! - At registration, each candidate gets a random 8-char hex token. The
//!   generator itself does not guarantee uniqueness, so assignment checks
//!   for an existing holder and retries with a fresh token, bounded.
//! - Immediately before judging, staff renumber the active candidates: the
//!   batch is shuffled and assigned sequential zero-padded ids ("0001",
//!   "0002", ...) inside a single transaction. This is the authoritative
//!   uniqueness mechanism; either the whole batch gets new ids or none do.

use crate::db::candidates::{candidate_columns, candidate_from_row};
use crate::db::models::Candidate;
use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

/// Length of a creation-time secret token (hex chars)
pub const SECRET_ID_LEN: usize = 8;

/// Collision-retry bound for creation-time assignment
const MAX_SECRET_ID_ATTEMPTS: u32 = 16;

/// Generate a random secret token: 4 random bytes as lowercase hex
pub fn generate_secret_id() -> String {
    let bytes: [u8; SECRET_ID_LEN / 2] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Assign a fresh secret id, retrying on collision with existing candidates
pub async fn assign_secret_id(pool: &SqlitePool) -> Result<String> {
    assign_secret_id_with(pool, generate_secret_id).await
}

/// Assignment with an injectable generator, so the retry path is testable
pub async fn assign_secret_id_with<F>(pool: &SqlitePool, mut generate: F) -> Result<String>
where
    F: FnMut() -> String,
{
    for _ in 0..MAX_SECRET_ID_ATTEMPTS {
        let token = generate();
        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE secret_id = ?")
            .bind(&token)
            .fetch_one(pool)
            .await?;
        if taken == 0 {
            return Ok(token);
        }
    }

    Err(Error::Internal(format!(
        "no unique secret id found in {} attempts",
        MAX_SECRET_ID_ATTEMPTS
    )))
}

/// Renumber a batch of candidates for judging
///
/// Shuffles the batch into a random order, then assigns "0001", "0002", ...
/// in that order. Runs inside one transaction spanning the whole
/// read-shuffle-write sequence: a failure (including an unknown candidate
/// id) rolls everything back, so partial renumbering is never observable
/// and candidates outside the batch keep their ids.
pub async fn renumber(pool: &SqlitePool, candidate_ids: &[Uuid]) -> Result<()> {
    let mut tx = pool.begin().await?;

    let mut order: Vec<Uuid> = candidate_ids.to_vec();
    order.shuffle(&mut rand::thread_rng());

    for (index, guid) in order.iter().enumerate() {
        let result = sqlx::query("UPDATE candidates SET secret_id = ? WHERE guid = ?")
            .bind(format!("{:04}", index + 1))
            .bind(guid.to_string())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() != 1 {
            // Dropping the transaction rolls back every id already written
            return Err(Error::BatchAborted(format!(
                "renumbering failed, no ids changed: unknown candidate {}",
                guid
            )));
        }
    }

    tx.commit().await?;
    info!("Renumbered {} candidates", candidate_ids.len());

    Ok(())
}

/// Exact, case-sensitive lookup; a miss is a normal outcome
pub async fn find_by_secret_id(pool: &SqlitePool, token: &str) -> Result<Option<Candidate>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM candidates WHERE secret_id = ?",
        candidate_columns()
    ))
    .bind(token)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(candidate_from_row).transpose()
}

/// Tokens currently held by more than one candidate
///
/// Must come back empty before a judging export is cut; the renumber batch
/// is the normal way to clear it.
pub async fn duplicate_secret_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT secret_id FROM candidates GROUP BY secret_id HAVING COUNT(*) > 1 ORDER BY secret_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| row.get(0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        for _ in 0..32 {
            let token = generate_secret_id();
            assert_eq!(token.len(), SECRET_ID_LEN);
            assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_tokens_are_not_constant() {
        let a = generate_secret_id();
        let all_same = (0..16).map(|_| generate_secret_id()).all(|t| t == a);
        assert!(!all_same);
    }
}
