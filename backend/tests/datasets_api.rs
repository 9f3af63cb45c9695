use actix_web::http::header::CONTENT_TYPE;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use ingest_backend::analytics::{EventTracker, DATASET_CONFIRMED, DATASET_UPLOADED};
use ingest_backend::config::{IngestLimits, TokenSecret};
use ingest_backend::db::data_rows::rows_by_dataset;
use ingest_backend::db::datasets::dataset_count;
use ingest_backend::db::Database;
use ingest_backend::error::FILE_CHANGED_MESSAGE;
use ingest_backend::integrity::IntegrityTokens;
use ingest_backend::middleware::{Correlation, CORRELATION_HEADER};
use ingest_backend::services::data_sources::csv::confirm::MISSING_TOKEN_MESSAGE;
use ingest_backend::services::data_sources::csv::configure_routes;
use ingest_backend::services::data_sources::csv::upload::NO_FILE_MESSAGE;
use ingest_backend::state::AppState;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const BOUNDARY: &str = "----ingest-test-boundary";
const HAPPY: &str = "date,amount,category\n2025-01-15,1200.00,Revenue\n2025-01-16,450.50,Expenses";

#[derive(Default)]
struct RecordingTracker {
    events: Mutex<Vec<(i64, String, Value)>>,
}

impl RecordingTracker {
    fn names(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(_, name, _)| name.clone()).collect()
    }
}

impl EventTracker for RecordingTracker {
    fn track(&self, org_id: i64, _user_id: i64, event_name: &str, metadata: Value) {
        self.events
            .lock()
            .unwrap()
            .push((org_id, event_name.to_string(), metadata));
    }
}

struct Harness {
    _dir: TempDir,
    state: AppState,
    tracker: Arc<RecordingTracker>,
}

fn harness_with(limits: IngestLimits) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("api.sqlite"));
    db.init().unwrap();
    let tracker = Arc::new(RecordingTracker::default());
    let tokens = IntegrityTokens::new(
        TokenSecret::new(b"an-integration-test-secret-of-32+bytes".to_vec()),
        limits.token_ttl_ms,
    );
    let state = AppState::new(db, limits, tokens, tracker.clone());
    Harness {
        _dir: dir,
        state,
        tracker,
    }
}

fn harness() -> Harness {
    harness_with(IngestLimits::default())
}

enum Part<'a> {
    File {
        name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
    Token(&'a str),
}

fn multipart(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Token(token) => {
                body.extend_from_slice(b"Content-Disposition: form-data; name=\"token\"\r\n\r\n");
                body.extend_from_slice(token.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn csv_file<'a>(name: &'a str, bytes: &'a str) -> Part<'a> {
    Part::File {
        name,
        content_type: "text/csv",
        bytes: bytes.as_bytes(),
    }
}

fn upload_request(path: &str, org_id: i64, parts: &[Part<'_>]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(&format!("/api/data_sources/csv{}", path))
        .insert_header((CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY)))
        .insert_header(("x-org-id", org_id.to_string()))
        .insert_header(("x-user-id", "10"))
        .set_payload(multipart(parts))
}

macro_rules! app {
    ($h:expr) => {
        test::init_service(
            App::new()
                .wrap(Correlation)
                .app_data(web::Data::new($h.state.clone()))
                .service(configure_routes()),
        )
        .await
    };
}

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let res = test::call_service(&$app, $req.to_request()).await;
        let status = res.status();
        let body: Value = test::read_body_json(res).await;
        (status, body)
    }};
}

#[actix_web::test]
async fn preview_then_confirm_commits_every_row() {
    let h = harness();
    let app = app!(h);

    let (status, body) = send!(app, upload_request("/preview", 1, &[csv_file("q1.csv", HAPPY)]));
    assert_eq!(status, StatusCode::OK);
    let preview = &body["data"];
    assert_eq!(preview["rowCount"], 2);
    assert_eq!(preview["validRowCount"], 2);
    assert_eq!(preview["skippedRowCount"], 0);
    assert_eq!(preview["headers"], serde_json::json!(["date", "amount", "category"]));
    assert_eq!(preview["columnTypes"]["amount"], "number");
    assert_eq!(preview["columnTypes"]["date"], "date");
    assert_eq!(preview["sampleRows"][0]["category"], "Revenue");
    assert_eq!(preview["fileName"], "q1.csv");
    let token = preview["integrityToken"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        upload_request("/confirm", 1, &[csv_file("q1.csv", HAPPY), Part::Token(&token)])
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rowCount"], 2);
    let dataset_id = body["data"]["datasetId"].as_i64().unwrap();

    let conn = h.state.db.connect().unwrap();
    let rows = rows_by_dataset(&conn, 1, dataset_id).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].amount, "1200.00");
    assert_eq!(rows[1].category, "Expenses");

    assert_eq!(h.tracker.names(), vec![DATASET_UPLOADED, DATASET_CONFIRMED]);
    let events = h.tracker.events.lock().unwrap();
    assert_eq!(events[1].2["datasetId"], dataset_id);
    assert_eq!(events[1].2["rowCount"], 2);
}

#[actix_web::test]
async fn listing_reflects_committed_dataset() {
    let h = harness();
    let app = app!(h);

    let list = || {
        test::TestRequest::get()
            .uri("/api/data_sources/csv/datasets")
            .insert_header(("x-org-id", "1"))
            .insert_header(("x-user-id", "10"))
    };

    let (status, body) = send!(app, list());
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["demoState"], "empty");
    assert_eq!(body["data"]["datasets"].as_array().unwrap().len(), 0);

    let (_, preview) = send!(app, upload_request("/preview", 1, &[csv_file("q1.csv", HAPPY)]));
    let token = preview["data"]["integrityToken"].as_str().unwrap().to_string();
    let (status, _) = send!(
        app,
        upload_request("/confirm", 1, &[csv_file("q1.csv", HAPPY), Part::Token(&token)])
    );
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send!(app, list());
    assert_eq!(body["data"]["demoState"], "user_only");
    assert_eq!(body["data"]["datasets"][0]["name"], "q1.csv");
    assert_eq!(body["data"]["datasets"][0]["uploadedBy"], 10);
}

#[actix_web::test]
async fn missing_column_is_reported_with_file_name() {
    let h = harness();
    let app = app!(h);

    let (status, body) = send!(
        app,
        upload_request("/preview", 1, &[csv_file("bad.csv", "date,category\n2025-01-15,Revenue")])
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "HEADER_VALIDATION_ERROR");
    let errors = body["error"]["details"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["column"], "amount");
    assert!(errors[0].get("row").is_none());
    assert_eq!(body["error"]["details"]["fileName"], "bad.csv");
    assert!(h.tracker.names().is_empty());
}

#[actix_web::test]
async fn tampered_confirm_creates_nothing() {
    let h = harness();
    let app = app!(h);

    let (_, preview) = send!(app, upload_request("/preview", 1, &[csv_file("fileA.csv", HAPPY)]));
    let token = preview["data"]["integrityToken"].as_str().unwrap().to_string();

    let file_b = "date,amount,category\n2025-01-15,1200.00,Revenue\n2025-01-16,999999.00,Expenses";
    let (status, body) = send!(
        app,
        upload_request("/confirm", 1, &[csv_file("fileA.csv", file_b), Part::Token(&token)])
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INTEGRITY_ERROR");
    assert_eq!(body["error"]["message"], FILE_CHANGED_MESSAGE);

    let conn = h.state.db.connect().unwrap();
    assert_eq!(dataset_count(&conn, 1).unwrap(), 0);
    assert_eq!(h.tracker.names(), vec![DATASET_UPLOADED]);
}

#[actix_web::test]
async fn token_from_another_organization_is_refused() {
    let h = harness();
    let app = app!(h);

    let (_, preview) = send!(app, upload_request("/preview", 1, &[csv_file("q1.csv", HAPPY)]));
    let token = preview["data"]["integrityToken"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        upload_request("/confirm", 2, &[csv_file("q1.csv", HAPPY), Part::Token(&token)])
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], FILE_CHANGED_MESSAGE);

    let conn = h.state.db.connect().unwrap();
    assert_eq!(dataset_count(&conn, 2).unwrap(), 0);
}

#[actix_web::test]
async fn confirm_without_token_is_refused() {
    let h = harness();
    let app = app!(h);

    let (status, body) = send!(app, upload_request("/confirm", 1, &[csv_file("q1.csv", HAPPY)]));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INTEGRITY_ERROR");
    assert_eq!(body["error"]["message"], MISSING_TOKEN_MESSAGE);
}

#[actix_web::test]
async fn rejected_commit_leaves_no_partial_dataset() {
    let h = harness();
    let app = app!(h);

    let (status, preview) = send!(app, upload_request("/preview", 1, &[csv_file("q1.csv", HAPPY)]));
    assert_eq!(status, StatusCode::OK);
    let token = preview["data"]["integrityToken"].as_str().unwrap().to_string();

    // The dataset insert succeeds, then every row insert aborts.
    h.state
        .db
        .connect()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER refuse_rows BEFORE INSERT ON data_rows
             BEGIN SELECT RAISE(ABORT, 'storage unavailable'); END;",
        )
        .unwrap();

    let (status, body) = send!(
        app,
        upload_request("/confirm", 1, &[csv_file("q1.csv", HAPPY), Part::Token(&token)])
    );
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "PERSISTENCE_ERROR");

    let conn = h.state.db.connect().unwrap();
    assert_eq!(dataset_count(&conn, 1).unwrap(), 0);
    assert_eq!(h.tracker.names(), vec![DATASET_UPLOADED]);
}

#[actix_web::test]
async fn over_long_text_past_the_sample_fails_both_phases() {
    let h = harness_with(IngestLimits {
        sample_size: 1,
        ..IngestLimits::default()
    });
    let app = app!(h);

    let csv = format!(
        "date,amount,category\n2025-01-15,1.00,Revenue\n2025-01-16,2.00,{}",
        "x".repeat(300)
    );
    let (status, body) = send!(app, upload_request("/preview", 1, &[csv_file("long.csv", &csv)]));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ROW_VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["errors"][0]["row"], 3);
    assert_eq!(body["error"]["details"]["errors"][0]["column"], "category");

    let token = h.state.tokens.issue(csv.as_bytes(), 1).unwrap().token;
    let (status, body) = send!(
        app,
        upload_request("/confirm", 1, &[csv_file("long.csv", &csv), Part::Token(&token)])
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ROW_VALIDATION_ERROR");

    let conn = h.state.db.connect().unwrap();
    assert_eq!(dataset_count(&conn, 1).unwrap(), 0);
}

#[actix_web::test]
async fn too_many_bad_rows_rejects_the_file() {
    let h = harness();
    let app = app!(h);

    let mut csv = String::from("date,amount,category\n");
    for i in 0..10 {
        csv.push_str(if i < 6 { "soon,1.00,Revenue\n" } else { "2025-01-15,1.00,Revenue\n" });
    }
    let (status, body) = send!(app, upload_request("/preview", 1, &[csv_file("mixed.csv", &csv)]));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ROW_VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["errors"].as_array().unwrap().len(), 6);
}

#[actix_web::test]
async fn skipped_rows_surface_as_warnings() {
    let h = harness();
    let app = app!(h);

    let csv = "date,amount,category\n2025-01-15,1200.00,Revenue\nbad-date,450.50,Expenses\n2025-01-17,800.00,Revenue";
    let (status, body) = send!(app, upload_request("/preview", 1, &[csv_file("q1.csv", csv)]));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["validRowCount"], 2);
    assert_eq!(body["data"]["skippedRowCount"], 1);
    assert_eq!(
        body["data"]["warnings"][0],
        "1 rows skipped: validation errors in rows 3"
    );
}

#[actix_web::test]
async fn non_csv_upload_is_refused() {
    let h = harness();
    let app = app!(h);

    let (status, body) = send!(
        app,
        upload_request(
            "/preview",
            1,
            &[Part::File {
                name: "report.pdf",
                content_type: "application/pdf",
                bytes: b"%PDF-1.7",
            }]
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "STRUCTURAL_ERROR");
    assert_eq!(
        body["error"]["message"],
        "We expected a .csv file, but received a application/pdf file."
    );
}

#[actix_web::test]
async fn csv_extension_overrides_generic_content_type() {
    let h = harness();
    let app = app!(h);

    let (status, _) = send!(
        app,
        upload_request(
            "/preview",
            1,
            &[Part::File {
                name: "q1.csv",
                content_type: "application/octet-stream",
                bytes: HAPPY.as_bytes(),
            }]
        )
    );
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn missing_file_part_is_structural() {
    let h = harness();
    let app = app!(h);

    let (status, body) = send!(app, upload_request("/preview", 1, &[Part::Token("stray")]));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], NO_FILE_MESSAGE);
}

#[actix_web::test]
async fn oversized_upload_is_refused() {
    let h = harness_with(IngestLimits {
        max_file_bytes: 32,
        ..IngestLimits::default()
    });
    let app = app!(h);

    let (status, body) = send!(app, upload_request("/preview", 1, &[csv_file("big.csv", HAPPY)]));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "STRUCTURAL_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("exceeds"));
}

#[actix_web::test]
async fn unauthenticated_requests_get_401() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::get().uri("/api/data_sources/csv/datasets");
    let (status, body) = send!(app, req);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTHENTICATION_ERROR");
}

#[actix_web::test]
async fn correlation_id_is_echoed() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::get()
        .uri("/api/data_sources/csv/datasets")
        .insert_header(("x-org-id", "1"))
        .insert_header(("x-user-id", "10"))
        .insert_header((CORRELATION_HEADER, "trace-42"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.headers().get(CORRELATION_HEADER).unwrap(), "trace-42");
}
