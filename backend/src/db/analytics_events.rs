use super::now_rfc3339;
use rusqlite::{params, Connection};

pub fn record_event(
    conn: &Connection,
    org_id: i64,
    user_id: i64,
    event_name: &str,
    metadata: Option<&serde_json::Value>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO analytics_events (org_id, user_id, event_name, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            org_id,
            user_id,
            event_name,
            metadata.map(|m| m.to_string()),
            now_rfc3339()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Event names for an organization, newest first.
pub fn event_names_by_org(conn: &Connection, org_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT event_name FROM analytics_events WHERE org_id = ?1 ORDER BY id DESC")?;
    let names = stmt.query_map(params![org_id], |row| row.get(0))?;
    names.collect()
}
