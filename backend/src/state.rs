//! Shared application state injected into every handler as `web::Data`.

use crate::analytics::EventTracker;
use crate::cache::ComputeCache;
use crate::config::IngestLimits;
use crate::db::{datasets, Database};
use crate::error::IngestError;
use crate::integrity::IntegrityTokens;
use ingest_common::model::dataset::DemoModeState;
use std::sync::Arc;

/// Everything a request needs, cheap to clone into blocking closures.
///
/// Holds no per-request data: two concurrent previews or confirms never touch
/// the same mutable value except the demo-state cache, which is safe to race.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub limits: IngestLimits,
    pub tokens: IntegrityTokens,
    pub tracker: Arc<dyn EventTracker>,
    /// Per-organization demo-mode state, keyed by organization id.
    pub demo_states: Arc<ComputeCache<i64, DemoModeState>>,
}

impl AppState {
    pub fn new(
        db: Database,
        limits: IngestLimits,
        tokens: IntegrityTokens,
        tracker: Arc<dyn EventTracker>,
    ) -> Self {
        Self {
            db,
            limits,
            tokens,
            tracker,
            demo_states: Arc::new(ComputeCache::new()),
        }
    }

    /// Blocking. Served from the cache unless a commit invalidated it.
    pub fn demo_state(&self, org_id: i64) -> Result<DemoModeState, IngestError> {
        self.demo_states.get_or_try_compute(org_id, || {
            let conn = self.db.connect()?;
            Ok(datasets::user_org_demo_state(&conn, org_id)?)
        })
    }
}
