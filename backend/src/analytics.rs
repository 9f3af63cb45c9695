//! Fire-and-forget product analytics.
//!
//! Request handlers call [`EventTracker::track`] and move on. The SQLite
//! implementation only pushes the event onto a bounded channel; a single
//! background task drains it and writes each event on the blocking pool.
//! Nothing on the request path ever waits for, or fails because of, an
//! analytics write.

use crate::db::{analytics_events, Database};
use log::{debug, error, warn};
use tokio::sync::mpsc;

pub const DATASET_UPLOADED: &str = "dataset.uploaded";
pub const DATASET_CONFIRMED: &str = "dataset.confirmed";

/// Events buffered before new ones are dropped.
const QUEUE_CAPACITY: usize = 256;

pub trait EventTracker: Send + Sync {
    fn track(&self, org_id: i64, user_id: i64, event_name: &str, metadata: serde_json::Value);
}

#[derive(Debug)]
pub struct TrackedEvent {
    pub(crate) org_id: i64,
    pub(crate) user_id: i64,
    pub(crate) event_name: String,
    pub(crate) metadata: serde_json::Value,
}

/// Queues events for [`start_event_writer`].
#[derive(Clone)]
pub struct SqliteEventTracker {
    tx: mpsc::Sender<TrackedEvent>,
}

impl SqliteEventTracker {
    pub fn channel() -> (Self, mpsc::Receiver<TrackedEvent>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        (Self { tx }, rx)
    }
}

impl EventTracker for SqliteEventTracker {
    fn track(&self, org_id: i64, user_id: i64, event_name: &str, metadata: serde_json::Value) {
        let event = TrackedEvent {
            org_id,
            user_id,
            event_name: event_name.to_string(),
            metadata,
        };
        if let Err(e) = self.tx.try_send(event) {
            warn!("Dropping analytics event '{}': {}", event_name, e);
        }
    }
}

/// Long-running task writing queued events. Spawn it once at startup; it ends
/// when every tracker handle has been dropped.
pub async fn start_event_writer(db: Database, mut rx: mpsc::Receiver<TrackedEvent>) {
    while let Some(event) = rx.recv().await {
        let db = db.clone();
        let written = tokio::task::spawn_blocking(move || {
            let conn = db.connect()?;
            analytics_events::record_event(
                &conn,
                event.org_id,
                event.user_id,
                &event.event_name,
                Some(&event.metadata),
            )
            .map(|id| (id, event.event_name))
        })
        .await;

        match written {
            Ok(Ok((id, name))) => debug!("Recorded analytics event {} '{}'", id, name),
            Ok(Err(e)) => error!("Failed to record analytics event: {}", e),
            Err(e) => error!("Analytics writer task failed: {}", e),
        }
    }
}
