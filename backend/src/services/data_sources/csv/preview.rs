use crate::analytics::DATASET_UPLOADED;
use crate::error::IngestError;
use crate::services::data_sources::csv::ingest::{self, headers::normalize_header, infer};
use crate::services::data_sources::csv::upload::read_upload;
use crate::services::identity::Caller;
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use ingest_common::model::csv::PreviewDocument;
use ingest_common::responses::ApiResponse;
use log::info;
use serde_json::json;

/// Accepted rows echoed back for the review screen.
const SAMPLE_ROWS: usize = 5;

/// HTTP handler: validates an uploaded CSV and returns its preview.
pub async fn process(state: web::Data<AppState>, caller: Caller, payload: Multipart) -> impl Responder {
    let upload = match read_upload(payload, state.limits.max_file_bytes).await {
        Ok(upload) => upload,
        Err(e) => return e.respond(&caller.request_id, None),
    };
    info!(
        "[{}] CSV upload received: org={} user={} file='{}' size={}",
        caller.request_id,
        caller.org_id,
        caller.user_id,
        upload.file_name,
        upload.bytes.len()
    );

    let file_name = upload.file_name.clone();
    let worker_state = state.clone();
    let org_id = caller.org_id;
    let result = web::block(move || {
        parse_preview(
            &worker_state,
            &upload.bytes,
            &upload.file_name,
            org_id,
            Utc::now().timestamp_millis(),
        )
    })
    .await
    .map_err(IngestError::from)
    .and_then(|r| r);

    match result {
        Ok(preview) => {
            state.tracker.track(
                caller.org_id,
                caller.user_id,
                DATASET_UPLOADED,
                json!({ "rowCount": preview.row_count, "fileName": preview.file_name }),
            );
            info!(
                "[{}] CSV validated: org={} file='{}' rows={} valid={}",
                caller.request_id,
                caller.org_id,
                preview.file_name,
                preview.row_count,
                preview.valid_row_count
            );
            HttpResponse::Ok().json(ApiResponse { data: preview })
        }
        Err(e) => e.respond(&caller.request_id, Some(&file_name)),
    }
}

/// Runs the full pipeline on `bytes` and issues the token a later confirm
/// must present. Blocking; nothing is persisted.
pub fn parse_preview(
    state: &AppState,
    bytes: &[u8],
    file_name: &str,
    org_id: i64,
    now_ms: i64,
) -> Result<PreviewDocument, IngestError> {
    let ingested = ingest::run(bytes, &state.limits)?;
    let issued = state.tokens.issue_at(bytes, org_id, now_ms)?;

    let skipped_row_count = ingested.skipped_row_count();
    Ok(PreviewDocument {
        headers: ingested.headers.iter().map(|h| normalize_header(h)).collect(),
        sample_rows: ingested
            .accepted
            .iter()
            .take(SAMPLE_ROWS)
            .map(|row| row.values.clone())
            .collect(),
        row_count: ingested.row_count,
        valid_row_count: ingested.accepted.len(),
        skipped_row_count,
        column_types: infer::infer_column_types(&ingested.accepted, &ingested.headers),
        warnings: ingested.warnings,
        file_name: file_name.to_string(),
        content_fingerprint: issued.fingerprint,
        integrity_token: issued.token,
    })
}
