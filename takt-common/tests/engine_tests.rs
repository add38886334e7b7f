//! Integration tests for the repertoire engine against a real SQLite file
//!
//! Covers:
//! - Selection persistence with validity derived on read
//! - Completeness aggregation across selections, recordings and documents
//! - Anonymization registry: collision retry, batch renumbering, lookup

use sqlx::SqlitePool;
use std::collections::HashSet;
use takt_common::db::candidates::{insert_candidate, load_candidate, NewCandidate};
use takt_common::db::models::{Candidate, Gender};
use takt_common::db::{catalog, init_database, recordings, selections};
use takt_common::repertoire::validate;
use takt_common::{anonymize, completeness, Error};
use tempfile::TempDir;
use uuid::Uuid;

async fn setup_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("takt.db"))
        .await
        .expect("Should initialize database");
    (dir, pool)
}

fn new_candidate(instrument_id: Uuid, email: &str) -> NewCandidate {
    NewCandidate {
        instrument_id,
        given_name: "Mara".to_string(),
        surname: "Lindt".to_string(),
        gender: Gender::Female,
        date_of_birth: "2001-03-14".to_string(),
        nationality: "AT".to_string(),
        email: email.to_string(),
        phone: "+43 660 0000000".to_string(),
        education: "Conservatory".to_string(),
        occupation: "Student".to_string(),
        notes: None,
    }
}

async fn seed_candidate(pool: &SqlitePool, instrument_id: Uuid, email: &str) -> Candidate {
    let secret_id = anonymize::assign_secret_id(pool)
        .await
        .expect("Should assign secret id");
    insert_candidate(pool, &new_candidate(instrument_id, email), &secret_id)
        .await
        .expect("Should insert candidate")
}

/// Set list "Group A": required 1.0, pieces X:0.5, Y:0.5, Z:1.0, X excludes Z
async fn seed_group_a(pool: &SqlitePool, instrument_id: Uuid) -> (Uuid, Uuid, Uuid, Uuid) {
    let round = catalog::insert_round(pool, instrument_id, "First Round")
        .await
        .unwrap();
    let set_list = catalog::insert_set_list(pool, round.guid, "Group A", 12)
        .await
        .unwrap();
    let z = catalog::insert_piece(pool, set_list.guid, "Z", None, 12, &[])
        .await
        .unwrap();
    let x = catalog::insert_piece(pool, set_list.guid, "X", None, 6, &[z.guid])
        .await
        .unwrap();
    let y = catalog::insert_piece(pool, set_list.guid, "Y", None, 6, &[])
        .await
        .unwrap();
    (set_list.guid, x.guid, y.guid, z.guid)
}

#[tokio::test]
async fn test_selection_validity_derived_on_read() {
    let (_dir, pool) = setup_db().await;
    let instrument = catalog::insert_instrument(&pool, "Violin").await.unwrap();
    let (set_list_id, x, y, _z) = seed_group_a(&pool, instrument.guid).await;
    let candidate = seed_candidate(&pool, instrument.guid, "mara@example.org").await;

    // An invalid choice is stored anyway
    let short: HashSet<Uuid> = [y].into_iter().collect();
    selections::store_selection(&pool, candidate.guid, set_list_id, &short)
        .await
        .unwrap();

    let snapshot = catalog::load_set_list_catalog(&pool, set_list_id)
        .await
        .unwrap()
        .unwrap();
    let stored = selections::load_selection_pieces(&pool, candidate.guid, set_list_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, short);
    assert!(validate(&snapshot, &stored).is_err());

    // Resubmitting replaces the choice wholesale
    let good: HashSet<Uuid> = [x, y].into_iter().collect();
    selections::store_selection(&pool, candidate.guid, set_list_id, &good)
        .await
        .unwrap();
    let stored = selections::load_selection_pieces(&pool, candidate.guid, set_list_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, good);
    assert!(validate(&snapshot, &stored).is_ok());
}

#[tokio::test]
async fn test_completeness_two_rounds_three_recordings() {
    // Instrument with 2 rounds x 1 set list and 3 required recordings;
    // 1 valid selection and 3 complete recordings leave repertoire open
    let (_dir, pool) = setup_db().await;
    let media = TempDir::new().unwrap();
    let instrument = catalog::insert_instrument(&pool, "Violin").await.unwrap();

    let (set_list_a, x, y, _z) = seed_group_a(&pool, instrument.guid).await;
    let round_two = catalog::insert_round(&pool, instrument.guid, "Second Round")
        .await
        .unwrap();
    let set_list_b = catalog::insert_set_list(&pool, round_two.guid, "Group B", 12)
        .await
        .unwrap();
    let solo = catalog::insert_piece(&pool, set_list_b.guid, "Solo", None, 12, &[])
        .await
        .unwrap();

    for nr in 1..=3 {
        recordings::insert_requirement(&pool, instrument.guid, &format!("Etude {}", nr), "etude", nr)
            .await
            .unwrap();
    }

    let candidate = seed_candidate(&pool, instrument.guid, "mara@example.org").await;

    let good: HashSet<Uuid> = [x, y].into_iter().collect();
    selections::store_selection(&pool, candidate.guid, set_list_a, &good)
        .await
        .unwrap();

    for requirement in recordings::list_requirements(&pool, instrument.guid).await.unwrap() {
        let recording = recordings::get_or_create_recording(&pool, candidate.guid, requirement.guid)
            .await
            .unwrap();
        recordings::mark_complete(&pool, recording.guid).await.unwrap();
    }

    let report = completeness::completeness(&pool, media.path(), &candidate)
        .await
        .unwrap();
    assert!(!report.repertoire_complete);
    assert_eq!(report.set_lists_total, 2);
    assert_eq!(report.set_lists_valid, 1);
    assert_eq!(report.recordings_uploaded, 3);
    assert_eq!(report.recordings_required, 3);

    // One more valid selection flips repertoire completeness, never the reverse
    let whole: HashSet<Uuid> = [solo.guid].into_iter().collect();
    selections::store_selection(&pool, candidate.guid, set_list_b.guid, &whole)
        .await
        .unwrap();

    let report = completeness::completeness(&pool, media.path(), &candidate)
        .await
        .unwrap();
    assert!(report.repertoire_complete);
    assert_eq!(report.set_lists_valid, 2);
}

#[tokio::test]
async fn test_completeness_vacuous_axes() {
    let (_dir, pool) = setup_db().await;
    let media = TempDir::new().unwrap();
    let instrument = catalog::insert_instrument(&pool, "Harp").await.unwrap();
    let candidate = seed_candidate(&pool, instrument.guid, "nobody@example.org").await;

    let report = completeness::completeness(&pool, media.path(), &candidate)
        .await
        .unwrap();
    assert!(report.repertoire_complete);
    assert_eq!(report.recordings_uploaded, 0);
    assert_eq!(report.recordings_required, 0);
    // Documents are still outstanding
    assert_eq!(report.missing_documents.len(), 2);
    assert!(!report.is_complete());
}

#[tokio::test]
async fn test_placeholder_recordings_do_not_count() {
    let (_dir, pool) = setup_db().await;
    let media = TempDir::new().unwrap();
    let instrument = catalog::insert_instrument(&pool, "Cello").await.unwrap();
    let requirement = recordings::insert_requirement(&pool, instrument.guid, "Concerto", "concerto", 1)
        .await
        .unwrap();
    let candidate = seed_candidate(&pool, instrument.guid, "cello@example.org").await;

    recordings::get_or_create_recording(&pool, candidate.guid, requirement.guid)
        .await
        .unwrap();

    let report = completeness::completeness(&pool, media.path(), &candidate)
        .await
        .unwrap();
    assert_eq!(report.recordings_uploaded, 0);
    assert_eq!(report.recordings_required, 1);
}

#[tokio::test]
async fn test_renumber_produces_permutation() {
    let (_dir, pool) = setup_db().await;
    let instrument = catalog::insert_instrument(&pool, "Piano").await.unwrap();

    let mut batch = Vec::new();
    for i in 0..5 {
        let c = seed_candidate(&pool, instrument.guid, &format!("c{}@example.org", i)).await;
        batch.push(c.guid);
    }
    let outsider = seed_candidate(&pool, instrument.guid, "outsider@example.org").await;

    anonymize::renumber(&pool, &batch).await.unwrap();

    let mut ids = Vec::new();
    for guid in &batch {
        let c = load_candidate(&pool, *guid).await.unwrap().unwrap();
        ids.push(c.secret_id);
    }
    ids.sort();
    assert_eq!(ids, vec!["0001", "0002", "0003", "0004", "0005"]);

    let untouched = load_candidate(&pool, outsider.guid).await.unwrap().unwrap();
    assert_eq!(untouched.secret_id, outsider.secret_id);
}

#[tokio::test]
async fn test_renumber_unknown_id_changes_nothing() {
    let (_dir, pool) = setup_db().await;
    let instrument = catalog::insert_instrument(&pool, "Piano").await.unwrap();

    let a = seed_candidate(&pool, instrument.guid, "a@example.org").await;
    let b = seed_candidate(&pool, instrument.guid, "b@example.org").await;

    let batch = vec![a.guid, Uuid::new_v4(), b.guid];
    let err = anonymize::renumber(&pool, &batch).await.unwrap_err();
    assert!(matches!(err, Error::BatchAborted(_)));

    // The whole batch rolled back
    let a_after = load_candidate(&pool, a.guid).await.unwrap().unwrap();
    let b_after = load_candidate(&pool, b.guid).await.unwrap().unwrap();
    assert_eq!(a_after.secret_id, a.secret_id);
    assert_eq!(b_after.secret_id, b.secret_id);
}

#[tokio::test]
async fn test_find_by_secret_id_is_case_sensitive() {
    let (_dir, pool) = setup_db().await;
    let instrument = catalog::insert_instrument(&pool, "Piano").await.unwrap();
    let candidate =
        insert_candidate(&pool, &new_candidate(instrument.guid, "x@example.org"), "abcd1234")
            .await
            .unwrap();

    let hit = anonymize::find_by_secret_id(&pool, "abcd1234").await.unwrap();
    assert_eq!(hit.map(|c| c.guid), Some(candidate.guid));

    let miss = anonymize::find_by_secret_id(&pool, "ABCD1234").await.unwrap();
    assert!(miss.is_none());
}

#[tokio::test]
async fn test_assign_secret_id_retries_on_collision() {
    let (_dir, pool) = setup_db().await;
    let instrument = catalog::insert_instrument(&pool, "Piano").await.unwrap();
    insert_candidate(&pool, &new_candidate(instrument.guid, "y@example.org"), "deadbeef")
        .await
        .unwrap();

    let mut attempts = 0;
    let token = anonymize::assign_secret_id_with(&pool, || {
        attempts += 1;
        if attempts == 1 {
            "deadbeef".to_string()
        } else {
            "deadbee0".to_string()
        }
    })
    .await
    .unwrap();

    assert_eq!(token, "deadbee0");
    assert_eq!(attempts, 2);
}

#[tokio::test]
async fn test_duplicate_secret_ids_reported() {
    let (_dir, pool) = setup_db().await;
    let instrument = catalog::insert_instrument(&pool, "Piano").await.unwrap();
    insert_candidate(&pool, &new_candidate(instrument.guid, "p@example.org"), "cafecafe")
        .await
        .unwrap();
    insert_candidate(&pool, &new_candidate(instrument.guid, "q@example.org"), "cafecafe")
        .await
        .unwrap();

    let duplicates = anonymize::duplicate_secret_ids(&pool).await.unwrap();
    assert_eq!(duplicates, vec!["cafecafe"]);
}
