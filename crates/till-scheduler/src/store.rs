//! # Report Store Seam
//!
//! The registry and pipeline only need a handful of persistence
//! operations. This trait names them so the engine can run against the
//! real repository or an in-memory double in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use till_core::ScheduledReport;
use till_db::ReportRepository;

use crate::error::SchedulerResult;

/// Persistence operations the scheduling engine depends on.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Every active schedule, for startup hydration.
    async fn list_active(&self) -> SchedulerResult<Vec<ScheduledReport>>;

    /// Fresh snapshot of one schedule. Triggers call this at fire time so
    /// a run never uses a stale copy captured at schedule time.
    async fn get(&self, id: &str) -> SchedulerResult<Option<ScheduledReport>>;

    /// Records a completed run's timestamps in one operation.
    async fn update_run_times(
        &self,
        id: &str,
        last_run_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> SchedulerResult<()>;

    /// Updates only the projected next run.
    async fn set_next_run(&self, id: &str, next_run_at: Option<DateTime<Utc>>)
        -> SchedulerResult<()>;
}

// =============================================================================
// SQLite-backed Store
// =============================================================================

#[async_trait]
impl ReportStore for ReportRepository {
    async fn list_active(&self) -> SchedulerResult<Vec<ScheduledReport>> {
        Ok(ReportRepository::list_active(self).await?)
    }

    async fn get(&self, id: &str) -> SchedulerResult<Option<ScheduledReport>> {
        Ok(ReportRepository::get_by_id(self, id).await?)
    }

    async fn update_run_times(
        &self,
        id: &str,
        last_run_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        Ok(ReportRepository::update_run_times(self, id, last_run_at, next_run_at).await?)
    }

    async fn set_next_run(
        &self,
        id: &str,
        next_run_at: Option<DateTime<Utc>>,
    ) -> SchedulerResult<()> {
        Ok(ReportRepository::set_next_run(self, id, next_run_at).await?)
    }
}

// =============================================================================
// In-memory Store (test double)
// =============================================================================

/// In-memory store for engine tests; no database required.
#[derive(Default)]
pub struct MemoryStore {
    reports: RwLock<HashMap<String, ScheduledReport>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a schedule.
    pub async fn put(&self, report: ScheduledReport) {
        self.reports.write().await.insert(report.id.clone(), report);
    }

    /// Removes a schedule.
    pub async fn remove(&self, id: &str) {
        self.reports.write().await.remove(id);
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn list_active(&self) -> SchedulerResult<Vec<ScheduledReport>> {
        Ok(self
            .reports
            .read()
            .await
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> SchedulerResult<Option<ScheduledReport>> {
        Ok(self.reports.read().await.get(id).cloned())
    }

    async fn update_run_times(
        &self,
        id: &str,
        last_run_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        let mut reports = self.reports.write().await;
        let report = reports
            .get_mut(id)
            .ok_or_else(|| crate::error::SchedulerError::NotFound(id.to_string()))?;
        report.last_run_at = Some(last_run_at);
        report.next_run_at = Some(next_run_at);
        report.updated_at = Utc::now();
        Ok(())
    }

    async fn set_next_run(
        &self,
        id: &str,
        next_run_at: Option<DateTime<Utc>>,
    ) -> SchedulerResult<()> {
        let mut reports = self.reports.write().await;
        let report = reports
            .get_mut(id)
            .ok_or_else(|| crate::error::SchedulerError::NotFound(id.to_string()))?;
        report.next_run_at = next_run_at;
        report.updated_at = Utc::now();
        Ok(())
    }
}
