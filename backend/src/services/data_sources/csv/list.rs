use crate::db::datasets::datasets_by_org;
use crate::error::IngestError;
use crate::services::identity::Caller;
use crate::state::AppState;
use actix_web::{web, HttpResponse, Responder};
use ingest_common::responses::{ApiResponse, DatasetListing};

/// HTTP handler: the caller's datasets, newest first, and whether the
/// organization is still in demo mode.
pub async fn process(state: web::Data<AppState>, caller: Caller) -> impl Responder {
    let worker_state = state.clone();
    let org_id = caller.org_id;
    let result = web::block(move || list_datasets(&worker_state, org_id))
        .await
        .map_err(IngestError::from)
        .and_then(|r| r);

    match result {
        Ok(listing) => HttpResponse::Ok().json(ApiResponse { data: listing }),
        Err(e) => e.respond(&caller.request_id, None),
    }
}

pub fn list_datasets(state: &AppState, org_id: i64) -> Result<DatasetListing, IngestError> {
    let conn = state.db.connect()?;
    let datasets = datasets_by_org(&conn, org_id)?;
    let demo_state = state.demo_state(org_id)?;
    Ok(DatasetListing {
        datasets,
        demo_state,
    })
}
