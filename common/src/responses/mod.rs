use crate::model::csv::ColumnValidationError;
use crate::model::dataset::{Dataset, DemoModeState};
use serde::{Deserialize, Serialize};

/// Success envelope: every 200 response wraps its payload in `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Result of a committed import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmReceipt {
    pub dataset_id: i64,
    pub row_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetListing {
    pub datasets: Vec<Dataset>,
    pub demo_state: DemoModeState,
}

/// Error envelope returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable, machine-readable code such as `HEADER_VALIDATION_ERROR`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<ErrorDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub errors: Vec<ColumnValidationError>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_name: Option<String>,
}
