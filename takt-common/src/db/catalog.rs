//! Piece catalog persistence
//!
//! Instruments, rounds, set lists, pieces and their exclusion edges are
//! static reference data entered by staff before the competition opens.
//! Display ordering is (round name, set-list name, piece title).

use crate::db::models::{Instrument, Piece, Round, SetList};
use crate::db::parse_guid;
use crate::repertoire::{CatalogPiece, SetListCatalog};
use crate::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub async fn insert_instrument(pool: &SqlitePool, name: &str) -> Result<Instrument> {
    let instrument = Instrument {
        guid: Uuid::new_v4(),
        name: name.to_string(),
    };

    sqlx::query("INSERT INTO instruments (guid, name) VALUES (?, ?)")
        .bind(instrument.guid.to_string())
        .bind(&instrument.name)
        .execute(pool)
        .await?;

    Ok(instrument)
}

pub async fn load_instrument(pool: &SqlitePool, guid: Uuid) -> Result<Option<Instrument>> {
    let row = sqlx::query("SELECT guid, name FROM instruments WHERE guid = ?")
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(Instrument {
            guid: parse_guid(row.get(0))?,
            name: row.get(1),
        })),
        None => Ok(None),
    }
}

pub async fn insert_round(pool: &SqlitePool, instrument_id: Uuid, name: &str) -> Result<Round> {
    if load_instrument(pool, instrument_id).await?.is_none() {
        return Err(Error::NotFound(format!("instrument {}", instrument_id)));
    }

    let round = Round {
        guid: Uuid::new_v4(),
        instrument_id,
        name: name.to_string(),
    };

    sqlx::query("INSERT INTO rounds (guid, instrument_id, name) VALUES (?, ?, ?)")
        .bind(round.guid.to_string())
        .bind(round.instrument_id.to_string())
        .bind(&round.name)
        .execute(pool)
        .await?;

    Ok(round)
}

pub async fn insert_set_list(
    pool: &SqlitePool,
    round_id: Uuid,
    name: &str,
    required_units: i64,
) -> Result<SetList> {
    let round_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rounds WHERE guid = ?")
        .bind(round_id.to_string())
        .fetch_one(pool)
        .await?;
    if round_exists == 0 {
        return Err(Error::NotFound(format!("round {}", round_id)));
    }
    if required_units <= 0 {
        return Err(Error::InvalidInput(
            "set list quota must be positive".to_string(),
        ));
    }

    let set_list = SetList {
        guid: Uuid::new_v4(),
        round_id,
        name: name.to_string(),
        required_units,
    };

    sqlx::query("INSERT INTO set_lists (guid, round_id, name, required_units) VALUES (?, ?, ?, ?)")
        .bind(set_list.guid.to_string())
        .bind(set_list.round_id.to_string())
        .bind(&set_list.name)
        .bind(set_list.required_units)
        .execute(pool)
        .await?;

    Ok(set_list)
}

/// Insert a piece together with its declared exclusion edges
///
/// Edges are stored exactly as declared (one row per direction given); the
/// validator treats the relation as symmetric regardless.
pub async fn insert_piece(
    pool: &SqlitePool,
    set_list_id: Uuid,
    title: &str,
    composer: Option<&str>,
    value_units: i64,
    excludes: &[Uuid],
) -> Result<Piece> {
    let set_list_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM set_lists WHERE guid = ?")
        .bind(set_list_id.to_string())
        .fetch_one(pool)
        .await?;
    if set_list_exists == 0 {
        return Err(Error::NotFound(format!("set list {}", set_list_id)));
    }
    if value_units <= 0 {
        return Err(Error::InvalidInput(
            "piece value must be positive".to_string(),
        ));
    }
    for excluded in excludes {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pieces WHERE guid = ?")
            .bind(excluded.to_string())
            .fetch_one(pool)
            .await?;
        if exists == 0 {
            return Err(Error::NotFound(format!("piece {}", excluded)));
        }
    }

    let piece = Piece {
        guid: Uuid::new_v4(),
        set_list_id,
        title: title.to_string(),
        composer: composer.map(|s| s.to_string()),
        value_units,
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO pieces (guid, set_list_id, title, composer, value_units) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(piece.guid.to_string())
    .bind(piece.set_list_id.to_string())
    .bind(&piece.title)
    .bind(&piece.composer)
    .bind(piece.value_units)
    .execute(&mut *tx)
    .await?;

    for excluded in excludes {
        sqlx::query(
            "INSERT OR IGNORE INTO piece_exclusions (piece_id, excludes_id) VALUES (?, ?)",
        )
        .bind(piece.guid.to_string())
        .bind(excluded.to_string())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(piece)
}

/// Declare an exclusion edge between two existing pieces
pub async fn insert_exclusion(pool: &SqlitePool, piece_id: Uuid, excludes_id: Uuid) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO piece_exclusions (piece_id, excludes_id) VALUES (?, ?)")
        .bind(piece_id.to_string())
        .bind(excludes_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// All set-list guids under an instrument's rounds
pub async fn set_list_ids_for_instrument(
    pool: &SqlitePool,
    instrument_id: Uuid,
) -> Result<Vec<Uuid>> {
    let rows = sqlx::query(
        "SELECT sl.guid
         FROM set_lists sl
         JOIN rounds r ON sl.round_id = r.guid
         WHERE r.instrument_id = ?
         ORDER BY r.name, sl.name",
    )
    .bind(instrument_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(|row| parse_guid(row.get(0))).collect()
}

/// Load one set list as an in-memory catalog snapshot for validation
///
/// The snapshot carries each piece's exclusion adjacency set keyed by piece
/// guid, covering edges declared in either direction.
pub async fn load_set_list_catalog(
    pool: &SqlitePool,
    set_list_id: Uuid,
) -> Result<Option<SetListCatalog>> {
    let header = sqlx::query("SELECT guid, name, required_units FROM set_lists WHERE guid = ?")
        .bind(set_list_id.to_string())
        .fetch_optional(pool)
        .await?;

    let header = match header {
        Some(row) => row,
        None => return Ok(None),
    };

    let piece_rows = sqlx::query(
        "SELECT guid, title, value_units FROM pieces WHERE set_list_id = ? ORDER BY title",
    )
    .bind(set_list_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut pieces = Vec::with_capacity(piece_rows.len());
    let mut excludes: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();

    for row in &piece_rows {
        let guid = parse_guid(row.get(0))?;
        excludes.insert(guid, HashSet::new());
        pieces.push((guid, row.get::<String, _>(1), row.get::<i64, _>(2)));
    }

    // Pull edges for this set list's pieces in both declaration directions
    let edge_rows = sqlx::query(
        "SELECT pe.piece_id, pe.excludes_id
         FROM piece_exclusions pe
         JOIN pieces p ON pe.piece_id = p.guid
         WHERE p.set_list_id = ?",
    )
    .bind(set_list_id.to_string())
    .fetch_all(pool)
    .await?;

    for row in &edge_rows {
        let from = parse_guid(row.get(0))?;
        let to = parse_guid(row.get(1))?;
        if let Some(set) = excludes.get_mut(&from) {
            set.insert(to);
        }
    }

    let catalog_pieces = pieces
        .into_iter()
        .map(|(guid, title, value_units)| CatalogPiece {
            guid,
            title,
            value_units,
            excludes: excludes.remove(&guid).unwrap_or_default(),
        })
        .collect();

    Ok(Some(SetListCatalog {
        guid: parse_guid(header.get(0))?,
        name: header.get(1),
        required_units: header.get(2),
        pieces: catalog_pieces,
    }))
}

/// Full catalog for one instrument, for form rendering: rounds with nested
/// set lists and pieces
pub async fn load_instrument_catalog(
    pool: &SqlitePool,
    instrument_id: Uuid,
) -> Result<Vec<(Round, Vec<SetListCatalog>)>> {
    let round_rows = sqlx::query(
        "SELECT guid, instrument_id, name FROM rounds WHERE instrument_id = ? ORDER BY name",
    )
    .bind(instrument_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut catalog = Vec::with_capacity(round_rows.len());

    for row in &round_rows {
        let round = Round {
            guid: parse_guid(row.get(0))?,
            instrument_id: parse_guid(row.get(1))?,
            name: row.get(2),
        };

        let set_list_rows =
            sqlx::query("SELECT guid FROM set_lists WHERE round_id = ? ORDER BY name")
                .bind(round.guid.to_string())
                .fetch_all(pool)
                .await?;

        let mut set_lists = Vec::with_capacity(set_list_rows.len());
        for sl_row in &set_list_rows {
            let sl_id = parse_guid(sl_row.get(0))?;
            if let Some(snapshot) = load_set_list_catalog(pool, sl_id).await? {
                set_lists.push(snapshot);
            }
        }

        catalog.push((round, set_lists));
    }

    Ok(catalog)
}
