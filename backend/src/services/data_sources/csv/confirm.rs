//! Second phase of an import: re-derive everything from the uploaded bytes
//! and commit the dataset with its rows in one transaction.
//!
//! The orchestrator moves through
//! `Received → TokenVerified → Reparsed → Normalized → Persisted`; any failure
//! lands in `Rejected`. Nothing from the preview response is trusted except
//! the opaque integrity token.

use crate::analytics::DATASET_CONFIRMED;
use crate::db::data_rows::insert_batch;
use crate::db::datasets::{create_dataset, NewDataset};
use crate::error::IngestError;
use crate::services::data_sources::csv::ingest;
use crate::services::data_sources::csv::upload::read_upload;
use crate::services::identity::Caller;
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use ingest_common::model::dataset::SourceType;
use ingest_common::responses::{ApiResponse, ConfirmReceipt};
use log::{debug, info};
use serde_json::json;

pub const MISSING_TOKEN_MESSAGE: &str =
    "Missing preview token. Preview the file again before confirming.";

const UNTITLED_DATASET: &str = "Untitled upload";
const MAX_NAME_CHARS: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    Received,
    TokenVerified,
    Reparsed,
    Normalized,
    Persisted,
    Rejected,
}

/// One confirm call, as handed over by the transport layer.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmRequest<'a> {
    pub bytes: &'a [u8],
    pub file_name: &'a str,
    pub org_id: i64,
    pub user_id: i64,
    pub token: Option<&'a str>,
}

/// Tracks how far a confirm call got.
#[derive(Debug)]
pub struct Commit {
    org_id: i64,
    stage: CommitStage,
}

impl Commit {
    pub fn new(org_id: i64) -> Self {
        Self {
            org_id,
            stage: CommitStage::Received,
        }
    }

    pub fn stage(&self) -> CommitStage {
        self.stage
    }

    fn advance(&mut self, next: CommitStage) {
        debug!("Commit for org {}: {:?} -> {:?}", self.org_id, self.stage, next);
        self.stage = next;
    }

    fn reject(&mut self, err: IngestError) -> IngestError {
        debug!(
            "Commit for org {} rejected at {:?} [{}]",
            self.org_id,
            self.stage,
            err.code()
        );
        self.stage = CommitStage::Rejected;
        err
    }

    fn drive(&mut self, state: &AppState, req: &ConfirmRequest<'_>) -> Result<ConfirmReceipt, IngestError> {
        let token = req
            .token
            .ok_or_else(|| IngestError::Integrity(MISSING_TOKEN_MESSAGE.to_string()))?;
        if !state.tokens.verify(token, req.bytes, req.org_id) {
            return Err(IngestError::file_changed());
        }
        self.advance(CommitStage::TokenVerified);

        let validated = ingest::validate(req.bytes, &state.limits)?;
        self.advance(CommitStage::Reparsed);

        let ingested = validated.normalize()?;
        self.advance(CommitStage::Normalized);

        let mut conn = state.db.connect()?;
        let tx = conn.transaction()?;
        let dataset = create_dataset(
            &tx,
            req.org_id,
            &NewDataset {
                name: dataset_name(req.file_name),
                source_type: SourceType::Csv,
                uploaded_by: Some(req.user_id),
            },
        )?;
        insert_batch(&tx, req.org_id, dataset.id, &ingested.normalized)?;
        tx.commit()?;
        self.advance(CommitStage::Persisted);

        Ok(ConfirmReceipt {
            dataset_id: dataset.id,
            row_count: ingested.normalized.len(),
        })
    }
}

/// Dataset name derived from the uploaded file name.
pub fn dataset_name(file_name: &str) -> String {
    let trimmed = file_name.trim();
    if trimmed.is_empty() {
        UNTITLED_DATASET.to_string()
    } else {
        trimmed.chars().take(MAX_NAME_CHARS).collect()
    }
}

/// Verifies, re-validates and persists an upload. Blocking.
///
/// On success the organization's cached demo state is dropped and a
/// `dataset.confirmed` event is queued; neither can fail the call.
pub fn confirm(state: &AppState, req: ConfirmRequest<'_>) -> Result<ConfirmReceipt, IngestError> {
    let mut commit = Commit::new(req.org_id);
    let receipt = commit.drive(state, &req).map_err(|e| commit.reject(e))?;

    state.demo_states.invalidate(&req.org_id);
    state.tracker.track(
        req.org_id,
        req.user_id,
        DATASET_CONFIRMED,
        json!({ "datasetId": receipt.dataset_id, "rowCount": receipt.row_count }),
    );
    Ok(receipt)
}

/// HTTP handler for the confirm step.
pub async fn process(state: web::Data<AppState>, caller: Caller, payload: Multipart) -> impl Responder {
    let upload = match read_upload(payload, state.limits.max_file_bytes).await {
        Ok(upload) => upload,
        Err(e) => return e.respond(&caller.request_id, None),
    };

    let file_name = upload.file_name.clone();
    let worker_state = state.clone();
    let (org_id, user_id) = (caller.org_id, caller.user_id);
    let result = web::block(move || {
        confirm(
            &worker_state,
            ConfirmRequest {
                bytes: &upload.bytes,
                file_name: &upload.file_name,
                org_id,
                user_id,
                token: upload.token.as_deref(),
            },
        )
    })
    .await
    .map_err(IngestError::from)
    .and_then(|r| r);

    match result {
        Ok(receipt) => {
            info!(
                "[{}] Dataset {} committed: org={} file='{}' rows={}",
                caller.request_id, receipt.dataset_id, caller.org_id, file_name, receipt.row_count
            );
            HttpResponse::Ok().json(ApiResponse { data: receipt })
        }
        Err(e) => e.respond(&caller.request_id, Some(&file_name)),
    }
}
