//! Integration tests for takt-cm API endpoints
//!
//! Each test builds the router over a fresh database in a temp root folder
//! and drives it with `tower::ServiceExt::oneshot`, so the whole stack from
//! routing through the engine to SQLite is exercised without a listener.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::PathBuf;
use takt_cm::{build_router, AppState};
use takt_common::config;
use takt_common::db::init_database;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

struct TestApp {
    _root: TempDir,
    app: Router,
    media_root: PathBuf,
}

async fn setup_app() -> TestApp {
    let root = TempDir::new().expect("Should create temp root");
    config::ensure_root_folder(root.path()).expect("Should create root layout");

    let pool = init_database(&config::database_path(root.path()))
        .await
        .expect("Should initialize database");

    let media_root = config::media_root(root.path());
    let state = AppState::new(pool, media_root.clone());

    TestApp {
        _root: root,
        app: build_router(state),
        media_root,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn request_json(app: &Router, request: Request<Body>, expected: StatusCode) -> Value {
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), expected);
    extract_json(response.into_body()).await
}

/// Create an instrument over the API, returning its guid
async fn create_instrument(app: &Router, name: &str) -> String {
    let body = request_json(
        app,
        send_json("POST", "/api/admin/instruments", json!({"name": name})),
        StatusCode::OK,
    )
    .await;
    body["guid"].as_str().unwrap().to_string()
}

fn registration(instrument_id: &str, email: &str) -> Value {
    json!({
        "instrument_id": instrument_id,
        "given_name": "Mara",
        "surname": "Lindt",
        "gender": "f",
        "date_of_birth": "2001-03-14",
        "nationality": "AT",
        "email": email,
        "phone": "+43 660 0000000",
        "education": "Conservatory",
        "occupation": "Student",
    })
}

async fn register(app: &Router, instrument_id: &str, email: &str) -> Value {
    request_json(
        app,
        send_json("POST", "/api/candidates", registration(instrument_id, email)),
        StatusCode::CREATED,
    )
    .await
}

#[tokio::test]
async fn test_health_endpoint() {
    let t = setup_app().await;

    let body = request_json(&t.app, get("/health"), StatusCode::OK).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "takt-cm");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_registration_assigns_secret_id_and_rejects_duplicate_email() {
    let t = setup_app().await;
    let instrument = create_instrument(&t.app, "Violin").await;

    let candidate = register(&t.app, &instrument, "mara@example.org").await;
    let secret_id = candidate["secret_id"].as_str().unwrap();
    assert_eq!(secret_id.len(), 8);
    assert!(secret_id.chars().all(|c| c.is_ascii_hexdigit()));

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/candidates",
            registration(&instrument, "mara@example.org"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_selection_validation_flow() {
    let t = setup_app().await;
    let instrument = create_instrument(&t.app, "Violin").await;

    let round = request_json(
        &t.app,
        send_json(
            "POST",
            "/api/admin/rounds",
            json!({"instrument_id": instrument, "name": "First Round"}),
        ),
        StatusCode::OK,
    )
    .await;

    let set_list = request_json(
        &t.app,
        send_json(
            "POST",
            "/api/admin/set-lists",
            json!({"round_id": round["guid"], "name": "Group A", "required": 1.0}),
        ),
        StatusCode::OK,
    )
    .await;
    let set_list_id = set_list["guid"].as_str().unwrap();

    let z = request_json(
        &t.app,
        send_json(
            "POST",
            "/api/admin/pieces",
            json!({"set_list_id": set_list_id, "title": "Z", "value": 1.0}),
        ),
        StatusCode::OK,
    )
    .await;
    let x = request_json(
        &t.app,
        send_json(
            "POST",
            "/api/admin/pieces",
            json!({
                "set_list_id": set_list_id,
                "title": "X",
                "value": 0.5,
                "excludes": [z["guid"]],
            }),
        ),
        StatusCode::OK,
    )
    .await;
    let y = request_json(
        &t.app,
        send_json(
            "POST",
            "/api/admin/pieces",
            json!({"set_list_id": set_list_id, "title": "Y", "value": 0.5}),
        ),
        StatusCode::OK,
    )
    .await;

    let candidate = register(&t.app, &instrument, "mara@example.org").await;
    let candidate_id = candidate["guid"].as_str().unwrap();
    let selection_uri = format!(
        "/api/candidates/{}/selections/{}",
        candidate_id, set_list_id
    );

    // {X, Y} sums to the quota and has no conflicts
    let outcome = request_json(
        &t.app,
        send_json("PUT", &selection_uri, json!({"piece_ids": [x["guid"], y["guid"]]})),
        StatusCode::OK,
    )
    .await;
    assert_eq!(outcome["valid"], true);
    assert_eq!(outcome["violations"].as_array().unwrap().len(), 0);

    // {X, Z} breaks the quota AND the exclusion rule; both come back at once
    let outcome = request_json(
        &t.app,
        send_json("PUT", &selection_uri, json!({"piece_ids": [x["guid"], z["guid"]]})),
        StatusCode::OK,
    )
    .await;
    assert_eq!(outcome["valid"], false);
    let violations = outcome["violations"].as_array().unwrap();
    assert!(violations.iter().any(|v| v["kind"] == "quota_mismatch"));
    assert!(violations.iter().any(|v| v["kind"] == "exclusion_conflict"));

    // The rejected choice was still stored, and reads back as invalid
    let statuses = request_json(
        &t.app,
        get(&format!("/api/candidates/{}/selections", candidate_id)),
        StatusCode::OK,
    )
    .await;
    let status = &statuses.as_array().unwrap()[0];
    assert_eq!(status["valid"], false);
    assert_eq!(status["piece_ids"].as_array().unwrap().len(), 2);

    // A piece from another set list is a hard rejection, nothing stored
    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "PUT",
            &selection_uri,
            json!({"piece_ids": [uuid::Uuid::new_v4()]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let statuses = request_json(
        &t.app,
        get(&format!("/api/candidates/{}/selections", candidate_id)),
        StatusCode::OK,
    )
    .await;
    assert_eq!(
        statuses.as_array().unwrap()[0]["piece_ids"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_catalog_listing_is_ordered_and_carries_values() {
    let t = setup_app().await;
    let instrument = create_instrument(&t.app, "Violin").await;

    // Created out of display order on purpose
    for round_name in ["Second Round", "First Round"] {
        let round = request_json(
            &t.app,
            send_json(
                "POST",
                "/api/admin/rounds",
                json!({"instrument_id": instrument, "name": round_name}),
            ),
            StatusCode::OK,
        )
        .await;
        let set_list = request_json(
            &t.app,
            send_json(
                "POST",
                "/api/admin/set-lists",
                json!({"round_id": round["guid"], "name": "Group A", "required": 0.5}),
            ),
            StatusCode::OK,
        )
        .await;
        request_json(
            &t.app,
            send_json(
                "POST",
                "/api/admin/pieces",
                json!({"set_list_id": set_list["guid"], "title": "Sonata", "value": 0.5}),
            ),
            StatusCode::OK,
        )
        .await;
    }

    let catalog = request_json(
        &t.app,
        get(&format!("/api/catalog/{}", instrument)),
        StatusCode::OK,
    )
    .await;

    let rounds = catalog["rounds"].as_array().unwrap();
    assert_eq!(rounds[0]["name"], "First Round");
    assert_eq!(rounds[1]["name"], "Second Round");

    let set_list = &rounds[0]["set_lists"][0];
    assert_eq!(set_list["required_units"], 6);
    assert_eq!(set_list["required"], 0.5);
    assert_eq!(set_list["pieces"][0]["value"], 0.5);
}

#[tokio::test]
async fn test_recording_upload_flow() {
    let t = setup_app().await;
    let instrument = create_instrument(&t.app, "Cello").await;

    let requirement = request_json(
        &t.app,
        send_json(
            "POST",
            "/api/admin/required-recordings",
            json!({"instrument_id": instrument, "name": "Concerto", "slug": "concerto", "nr": 1}),
        ),
        StatusCode::OK,
    )
    .await;
    let requirement_id = requirement["guid"].as_str().unwrap();

    let candidate = register(&t.app, &instrument, "cello@example.org").await;
    let candidate_id = candidate["guid"].as_str().unwrap();
    let upload_uri = format!(
        "/api/candidates/{}/recordings/{}",
        candidate_id, requirement_id
    );

    // Extension allowlist
    let response = t
        .app
        .clone()
        .oneshot(send_json("POST", &upload_uri, json!({"extension": "exe"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let started = request_json(
        &t.app,
        send_json("POST", &upload_uri, json!({"extension": "mp4"})),
        StatusCode::OK,
    )
    .await;
    let recording_id = started["guid"].as_str().unwrap().to_string();
    let upload_path = started["upload_path"].as_str().unwrap().to_string();
    assert!(upload_path.starts_with(&format!("{}/recordings/01_concerto_", candidate_id)));
    assert!(upload_path.ends_with(".mp4"));

    // Completion is refused until the payload actually lands
    let complete_uri = format!("/api/recordings/{}/complete", recording_id);
    let response = t
        .app
        .clone()
        .oneshot(send_json("POST", &complete_uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let report = request_json(
        &t.app,
        get(&format!("/api/candidates/{}/completeness", candidate_id)),
        StatusCode::OK,
    )
    .await;
    assert_eq!(report["recordings_uploaded"], 0);
    assert_eq!(report["recordings_required"], 1);

    // Simulate the storage collaborator writing the payload
    let on_disk = t.media_root.join(&upload_path);
    std::fs::create_dir_all(on_disk.parent().unwrap()).unwrap();
    std::fs::write(&on_disk, b"video bytes").unwrap();

    let completed = request_json(
        &t.app,
        send_json("POST", &complete_uri, json!({})),
        StatusCode::OK,
    )
    .await;
    assert_eq!(completed["is_complete"], true);

    let report = request_json(
        &t.app,
        get(&format!("/api/candidates/{}/completeness", candidate_id)),
        StatusCode::OK,
    )
    .await;
    assert_eq!(report["recordings_uploaded"], 1);

    let statuses = request_json(
        &t.app,
        get(&format!("/api/candidates/{}/recordings", candidate_id)),
        StatusCode::OK,
    )
    .await;
    assert_eq!(statuses.as_array().unwrap()[0]["recording"]["is_complete"], true);
}

#[tokio::test]
async fn test_qualification_gate() {
    let t = setup_app().await;
    // No set lists and no required recordings: repertoire and recordings are
    // vacuously complete, documents still gate qualification
    let instrument = create_instrument(&t.app, "Harp").await;
    let candidate = register(&t.app, &instrument, "harp@example.org").await;
    let candidate_id = candidate["guid"].as_str().unwrap();
    let qualify_uri = format!("/api/candidates/{}/qualify", candidate_id);

    let response = t
        .app
        .clone()
        .oneshot(send_json("POST", &qualify_uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Register document paths and put real files behind them
    for (dir, file) in [("photos", "me.jpg"), ("documents", "passport.pdf")] {
        let path = t.media_root.join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join(file), b"payload").unwrap();
    }
    request_json(
        &t.app,
        send_json(
            "PUT",
            &format!("/api/candidates/{}/documents", candidate_id),
            json!({"photo_path": "photos/me.jpg", "passport_path": "documents/passport.pdf"}),
        ),
        StatusCode::OK,
    )
    .await;

    let qualified = request_json(
        &t.app,
        send_json("POST", &qualify_uri, json!({})),
        StatusCode::OK,
    )
    .await;
    assert_eq!(qualified["is_qualified"], true);

    let detail = request_json(
        &t.app,
        get(&format!("/api/candidates/{}", candidate_id)),
        StatusCode::OK,
    )
    .await;
    assert_eq!(detail["is_qualified"], true);
    assert_eq!(detail["completeness"]["missing_documents"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_renumber_and_lookup() {
    let t = setup_app().await;
    let instrument = create_instrument(&t.app, "Piano").await;

    let mut ids = Vec::new();
    for i in 0..3 {
        let candidate = register(&t.app, &instrument, &format!("c{}@example.org", i)).await;
        ids.push(candidate["guid"].as_str().unwrap().to_string());
    }

    let renumbered = request_json(
        &t.app,
        send_json("POST", "/api/admin/renumber", json!({"candidate_ids": ids})),
        StatusCode::OK,
    )
    .await;
    assert_eq!(renumbered["renumbered"], 3);

    let found = request_json(
        &t.app,
        get("/api/admin/candidates/by-secret-id/0002"),
        StatusCode::OK,
    )
    .await;
    assert_eq!(found["secret_id"], "0002");

    let audit = request_json(&t.app, get("/api/admin/secret-id-audit"), StatusCode::OK).await;
    assert_eq!(audit["duplicates"].as_array().unwrap().len(), 0);

    // A batch containing an unknown id fails whole, nothing changes
    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/admin/renumber",
            json!({"candidate_ids": [uuid::Uuid::new_v4()]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let miss = t
        .app
        .clone()
        .oneshot(get("/api/admin/candidates/by-secret-id/9999"))
        .await
        .unwrap();
    assert_eq!(miss.status(), StatusCode::NOT_FOUND);
}
