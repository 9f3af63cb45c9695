use super::now_rfc3339;
use crate::services::data_sources::csv::ingest::normalizer::NormalizedRow;
use chrono::NaiveDate;
use ingest_common::model::dataset::SourceType;
use log::debug;
use rusqlite::{params, Connection};

/// Rows per progress log line while inserting.
const BATCH_SIZE: usize = 1_000;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inserts `rows` for one dataset through a single cached statement.
///
/// Pass a transaction to make the insert part of a larger atomic unit; a
/// failure part-way leaves the rollback to the caller.
pub fn insert_batch(
    conn: &Connection,
    org_id: i64,
    dataset_id: i64,
    rows: &[NormalizedRow],
) -> rusqlite::Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let created_at = now_rfc3339();
    let mut stmt = conn.prepare_cached(
        "INSERT INTO data_rows
            (org_id, dataset_id, source_type, category, parent_category, date, amount, label, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;

    for (n, chunk) in rows.chunks(BATCH_SIZE).enumerate() {
        for row in chunk {
            let metadata = row.metadata.as_ref().map(|m| m.to_string());
            stmt.execute(params![
                org_id,
                dataset_id,
                SourceType::Csv.as_str(),
                row.category,
                row.parent_category,
                row.date.format(DATE_FORMAT).to_string(),
                row.amount,
                row.label,
                metadata,
                created_at,
            ])?;
        }
        debug!(
            "Dataset {}: inserted chunk {} ({} rows)",
            dataset_id,
            n + 1,
            chunk.len()
        );
    }
    Ok(())
}

/// A stored row as read back, oldest date first.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: i64,
    pub dataset_id: i64,
    pub category: String,
    pub parent_category: Option<String>,
    pub date: NaiveDate,
    pub amount: String,
    pub label: Option<String>,
}

pub fn rows_by_dataset(conn: &Connection, org_id: i64, dataset_id: i64) -> rusqlite::Result<Vec<StoredRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, dataset_id, category, parent_category, date, amount, label
         FROM data_rows WHERE org_id = ?1 AND dataset_id = ?2
         ORDER BY date ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![org_id, dataset_id], |row| {
        let raw_date: String = row.get(4)?;
        let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(StoredRow {
            id: row.get(0)?,
            dataset_id: row.get(1)?,
            category: row.get(2)?,
            parent_category: row.get(3)?,
            date,
            amount: row.get(5)?,
            label: row.get(6)?,
        })
    })?;
    rows.collect()
}
