use super::now_rfc3339;
use ingest_common::model::dataset::{Dataset, DemoModeState, SourceType};
use rusqlite::{params, Connection, Row};

#[derive(Debug, Clone)]
pub struct NewDataset {
    pub name: String,
    pub source_type: SourceType,
    pub uploaded_by: Option<i64>,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Dataset> {
    Ok(Dataset {
        id: row.get(0)?,
        org_id: row.get(1)?,
        name: row.get(2)?,
        // Only CSV imports exist today.
        source_type: SourceType::Csv,
        is_seed_data: row.get::<_, i64>(4)? != 0,
        uploaded_by: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const COLUMNS: &str = "id, org_id, name, source_type, is_seed_data, uploaded_by, created_at";

pub fn create_dataset(conn: &Connection, org_id: i64, data: &NewDataset) -> rusqlite::Result<Dataset> {
    conn.query_row(
        &format!(
            "INSERT INTO datasets (org_id, name, source_type, is_seed_data, uploaded_by, created_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5)
             RETURNING {}",
            COLUMNS
        ),
        params![org_id, data.name, data.source_type.as_str(), data.uploaded_by, now_rfc3339()],
        from_row,
    )
}

/// Newest first.
pub fn datasets_by_org(conn: &Connection, org_id: i64) -> rusqlite::Result<Vec<Dataset>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM datasets WHERE org_id = ?1 ORDER BY created_at DESC, id DESC",
        COLUMNS
    ))?;
    let rows = stmt.query_map(params![org_id], from_row)?;
    rows.collect()
}

pub fn dataset_count(conn: &Connection, org_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM datasets WHERE org_id = ?1",
        params![org_id],
        |row| row.get(0),
    )
}

/// `UserOnly` once the organization has imported any non-seed dataset.
pub fn user_org_demo_state(conn: &Connection, org_id: i64) -> rusqlite::Result<DemoModeState> {
    let has_user_data: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM datasets WHERE org_id = ?1 AND is_seed_data = 0)",
        params![org_id],
        |row| row.get(0),
    )?;
    Ok(if has_user_data {
        DemoModeState::UserOnly
    } else {
        DemoModeState::Empty
    })
}
