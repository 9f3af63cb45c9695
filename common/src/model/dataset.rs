use serde::{Deserialize, Serialize};

/// Where the rows of a dataset came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Csv,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Csv => "csv",
        }
    }
}

/// A stored dataset record. Its rows live in `data_rows` and are created in
/// the same transaction as the record itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: i64,
    pub org_id: i64,
    pub name: String,
    pub source_type: SourceType,
    pub is_seed_data: bool,
    pub uploaded_by: Option<i64>,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

/// Whether an organization is still looking at seed data or has imported its
/// own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DemoModeState {
    Empty,
    UserOnly,
}
