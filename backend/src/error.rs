//! Error taxonomy for the ingestion pipeline and its HTTP mapping.
//!
//! Every fatal outcome of a preview or confirm request is one of these
//! variants. Each carries a stable machine-readable code; the JSON body sent to
//! the client is built from [`IngestError::to_envelope`].

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use ingest_common::model::csv::ColumnValidationError;
use ingest_common::responses::{ErrorBody, ErrorDetails, ErrorEnvelope};
use log::{error, warn};
use thiserror::Error;

/// Message used for every integrity failure, whatever check refused the token.
pub const FILE_CHANGED_MESSAGE: &str =
    "This file has changed since it was previewed. Upload it again to refresh the preview.";

#[derive(Debug, Error)]
pub enum IngestError {
    /// Empty file, header-only file, too many rows, oversized upload or wrong
    /// content type. Never partially processed.
    #[error("{0}")]
    Structural(String),

    /// One or more required columns are missing; row checks never ran.
    #[error("CSV validation failed")]
    HeaderValidation { errors: Vec<ColumnValidationError> },

    /// Too many sampled rows failed, or an accepted row could not be
    /// converted for storage.
    #[error("{message}")]
    RowValidation {
        message: String,
        errors: Vec<ColumnValidationError>,
    },

    /// Missing, malformed, expired or mismatched preview token.
    #[error("{0}")]
    Integrity(String),

    /// The storage transaction failed and was rolled back.
    #[error("We couldn't save your data. Nothing was imported; please try again.")]
    Persistence(#[source] rusqlite::Error),

    #[error("Authentication required")]
    Authentication,

    #[error("An unexpected error occurred")]
    Internal(String),
}

impl IngestError {
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Structural(_) => "STRUCTURAL_ERROR",
            IngestError::HeaderValidation { .. } => "HEADER_VALIDATION_ERROR",
            IngestError::RowValidation { .. } => "ROW_VALIDATION_ERROR",
            IngestError::Integrity(_) => "INTEGRITY_ERROR",
            IngestError::Persistence(_) => "PERSISTENCE_ERROR",
            IngestError::Authentication => "AUTHENTICATION_ERROR",
            IngestError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The generic integrity failure. Callers must not add detail to it.
    pub fn file_changed() -> Self {
        IngestError::Integrity(FILE_CHANGED_MESSAGE.to_string())
    }

    pub fn validation_errors(&self) -> Option<&[ColumnValidationError]> {
        match self {
            IngestError::HeaderValidation { errors } | IngestError::RowValidation { errors, .. } => {
                Some(errors)
            }
            _ => None,
        }
    }

    pub fn to_envelope(&self, file_name: Option<&str>) -> ErrorEnvelope {
        let details = self.validation_errors().map(|errors| ErrorDetails {
            errors: errors.to_vec(),
            file_name: file_name.map(str::to_string),
        });
        ErrorEnvelope {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            },
        }
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(e: rusqlite::Error) -> Self {
        IngestError::Persistence(e)
    }
}

impl From<actix_web::error::BlockingError> for IngestError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        IngestError::Internal(format!("blocking task failed: {}", e))
    }
}

impl ResponseError for IngestError {
    fn status_code(&self) -> StatusCode {
        match self {
            IngestError::Structural(_)
            | IngestError::HeaderValidation { .. }
            | IngestError::RowValidation { .. } => StatusCode::BAD_REQUEST,
            IngestError::Integrity(_) => StatusCode::CONFLICT,
            IngestError::Authentication => StatusCode::UNAUTHORIZED,
            IngestError::Persistence(_) | IngestError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.respond("-", None)
    }
}

impl IngestError {
    /// The log line for this failure, tagged with the request's correlation
    /// id. Persistence and internal failures include the underlying cause.
    pub fn log_line(&self, request_id: &str) -> String {
        match self {
            IngestError::Persistence(cause) => {
                format!("[{}] Persistence failure: {}", request_id, cause)
            }
            IngestError::Internal(cause) => format!("[{}] Internal failure: {}", request_id, cause),
            other => format!("[{}] Request rejected [{}]: {}", request_id, other.code(), other),
        }
    }

    /// Logs the failure and builds the JSON error response, attaching the
    /// uploaded file name to validation details when known.
    pub fn respond(&self, request_id: &str, file_name: Option<&str>) -> HttpResponse {
        match self {
            IngestError::Persistence(_) | IngestError::Internal(_) => {
                error!("{}", self.log_line(request_id))
            }
            _ => warn!("{}", self.log_line(request_id)),
        }
        HttpResponse::build(self.status_code()).json(self.to_envelope(file_name))
    }
}
