//! CSV data source endpoints: two-phase import and listing.
//!
//! The provided routes are:
//! - `POST /api/data_sources/csv/preview`: multipart upload with a `file` part.
//!   Parses and validates the file, returns the preview document and a signed
//!   integrity token. Nothing is stored.
//!
//! - `POST /api/data_sources/csv/confirm`: multipart upload with the same
//!   `file` and the `token` from the preview. Re-validates the bytes and commits
//!   the dataset and its rows in one transaction.
//!
//! - `GET /api/data_sources/csv/datasets`: the organization's datasets and its
//!   demo-mode state.
//!
//! All routes expect the gateway-supplied `X-Org-Id` and `X-User-Id` headers.

use actix_web::web::{get, post, scope};
use actix_web::Scope;

pub mod confirm;
pub mod ingest;
pub mod list;
pub mod preview;
pub mod upload;

pub const API_PATH: &str = "/api/data_sources/csv";

/// Configures and returns the Actix scope for CSV data source routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/preview", post().to(preview::process))
        .route("/confirm", post().to(confirm::process))
        .route("/datasets", get().to(list::process))
}
