//! Candidate persistence

use crate::db::models::{Candidate, Gender};
use crate::db::parse_guid;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Registration payload, personal fields only; guid and secret id are
/// assigned at insert time
#[derive(Debug, Clone)]
pub struct NewCandidate {
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

const CANDIDATE_COLUMNS: &str = "guid, instrument_id, secret_id, given_name, surname, gender, \
     date_of_birth, nationality, email, phone, education, occupation, notes, \
     photo_path, passport_path, is_qualified, submitted_at";

pub(crate) fn candidate_from_row(row: &SqliteRow) -> Result<Candidate> {
    let gender_code: String = row.get(5);
    let gender = Gender::parse(&gender_code)
        .ok_or_else(|| Error::Internal(format!("unknown gender code in database: {}", gender_code)))?;

    Ok(Candidate {
        guid: parse_guid(row.get(0))?,
        instrument_id: parse_guid(row.get(1))?,
        secret_id: row.get(2),
        given_name: row.get(3),
        surname: row.get(4),
        gender,
        date_of_birth: row.get(6),
        nationality: row.get(7),
        email: row.get(8),
        phone: row.get(9),
        education: row.get(10),
        occupation: row.get(11),
        notes: row.get(12),
        photo_path: row.get(13),
        passport_path: row.get(14),
        is_qualified: row.get::<i64, _>(15) != 0,
        submitted_at: row.get(16),
    })
}

/// Insert a new candidate with an already-assigned secret id
pub async fn insert_candidate(
    pool: &SqlitePool,
    new: &NewCandidate,
    secret_id: &str,
) -> Result<Candidate> {
    let guid = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO candidates (
            guid, instrument_id, secret_id, given_name, surname, gender,
            date_of_birth, nationality, email, phone, education, occupation, notes
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(new.instrument_id.to_string())
    .bind(secret_id)
    .bind(&new.given_name)
    .bind(&new.surname)
    .bind(new.gender.as_str())
    .bind(&new.date_of_birth)
    .bind(&new.nationality)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.education)
    .bind(&new.occupation)
    .bind(&new.notes)
    .execute(pool)
    .await?;

    load_candidate(pool, guid)
        .await?
        .ok_or_else(|| Error::Internal("candidate vanished after insert".to_string()))
}

pub async fn load_candidate(pool: &SqlitePool, guid: Uuid) -> Result<Option<Candidate>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM candidates WHERE guid = ?",
        CANDIDATE_COLUMNS
    ))
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(candidate_from_row).transpose()
}

pub async fn email_taken(pool: &SqlitePool, email: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

/// Record uploaded document paths (relative to the media root). `None`
/// leaves the existing value untouched.
pub async fn update_documents(
    pool: &SqlitePool,
    guid: Uuid,
    photo_path: Option<&str>,
    passport_path: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE candidates
         SET photo_path = COALESCE(?, photo_path),
             passport_path = COALESCE(?, passport_path)
         WHERE guid = ?",
    )
    .bind(photo_path)
    .bind(passport_path)
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("candidate {}", guid)));
    }

    Ok(())
}

pub async fn set_qualified(pool: &SqlitePool, guid: Uuid, qualified: bool) -> Result<()> {
    let result = sqlx::query("UPDATE candidates SET is_qualified = ? WHERE guid = ?")
        .bind(qualified as i64)
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("candidate {}", guid)));
    }

    Ok(())
}

pub(crate) fn candidate_columns() -> &'static str {
    CANDIDATE_COLUMNS
}
