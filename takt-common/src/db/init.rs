//! Database initialization
//!
//! Creates the schema on first run and opens an existing database otherwise.
//! All table creation is `CREATE TABLE IF NOT EXISTS`, safe to call on every
//! startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Apply pragmas and create all tables (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers with one writer; the renumbering
    // transaction depends on readers never observing a half-applied batch
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    create_settings_table(pool).await?;
    create_instruments_table(pool).await?;
    create_rounds_table(pool).await?;
    create_set_lists_table(pool).await?;
    create_pieces_table(pool).await?;
    create_piece_exclusions_table(pool).await?;
    create_candidates_table(pool).await?;
    create_selections_table(pool).await?;
    create_selection_pieces_table(pool).await?;
    create_required_recordings_table(pool).await?;
    create_recordings_table(pool).await?;

    init_default_settings(pool).await?;

    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_instruments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS instruments (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_rounds_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rounds (
            guid TEXT PRIMARY KEY,
            instrument_id TEXT NOT NULL REFERENCES instruments(guid) ON DELETE CASCADE,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_set_lists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS set_lists (
            guid TEXT PRIMARY KEY,
            round_id TEXT NOT NULL REFERENCES rounds(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            required_units INTEGER NOT NULL DEFAULT 12
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_pieces_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pieces (
            guid TEXT PRIMARY KEY,
            set_list_id TEXT NOT NULL REFERENCES set_lists(guid) ON DELETE CASCADE,
            title TEXT NOT NULL,
            composer TEXT,
            value_units INTEGER NOT NULL DEFAULT 12
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_piece_exclusions_table(pool: &SqlitePool) -> Result<()> {
    // Adjacency rows, stored as declared. The intended invariant is symmetry
    // (A excludes B implies B excludes A) but the validator checks both
    // directions, so an asymmetric declaration still rejects.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS piece_exclusions (
            piece_id TEXT NOT NULL REFERENCES pieces(guid) ON DELETE CASCADE,
            excludes_id TEXT NOT NULL REFERENCES pieces(guid) ON DELETE CASCADE,
            PRIMARY KEY (piece_id, excludes_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_candidates_table(pool: &SqlitePool) -> Result<()> {
    // secret_id deliberately has no UNIQUE constraint: creation-time tokens
    // are collision-checked in code, and batch renumbering must be able to
    // rewrite the whole namespace inside one transaction
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            guid TEXT PRIMARY KEY,
            instrument_id TEXT NOT NULL REFERENCES instruments(guid) ON DELETE CASCADE,
            secret_id TEXT NOT NULL,
            given_name TEXT NOT NULL,
            surname TEXT NOT NULL,
            gender TEXT NOT NULL,
            date_of_birth TEXT NOT NULL,
            nationality TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT NOT NULL,
            education TEXT NOT NULL,
            occupation TEXT NOT NULL,
            notes TEXT,
            photo_path TEXT,
            passport_path TEXT,
            is_qualified INTEGER NOT NULL DEFAULT 0,
            submitted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_selections_table(pool: &SqlitePool) -> Result<()> {
    // At most one selection per (candidate, set list); created lazily on the
    // first submit. Validity is derived on read, not stored.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS selections (
            guid TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL REFERENCES candidates(guid) ON DELETE CASCADE,
            set_list_id TEXT NOT NULL REFERENCES set_lists(guid) ON DELETE CASCADE,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (candidate_id, set_list_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_selection_pieces_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS selection_pieces (
            selection_id TEXT NOT NULL REFERENCES selections(guid) ON DELETE CASCADE,
            piece_id TEXT NOT NULL REFERENCES pieces(guid) ON DELETE CASCADE,
            PRIMARY KEY (selection_id, piece_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_required_recordings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS required_recordings (
            guid TEXT PRIMARY KEY,
            instrument_id TEXT NOT NULL REFERENCES instruments(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            nr INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_recordings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recordings (
            guid TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL REFERENCES candidates(guid) ON DELETE CASCADE,
            requirement_id TEXT NOT NULL REFERENCES required_recordings(guid) ON DELETE CASCADE,
            file_path TEXT,
            is_complete INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (candidate_id, requirement_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO settings (key, value) VALUES ('listen_port', ?)",
    )
    .bind(crate::config::DEFAULT_PORT.to_string())
    .execute(pool)
    .await?;

    Ok(())
}
