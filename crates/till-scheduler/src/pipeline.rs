//! # Execution Pipeline
//!
//! Runs one report end to end: resolve the date window, fetch the
//! aggregate, export the file, persist run bookkeeping, notify.
//!
//! ## Run Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  execute(report, trigger)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  acquire per-report lock  ← timer fires and manual runs serialize       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  resolve date range (today-anchored)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  provider.fetch(type, range)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  export pipeline → file on disk                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  last_run_at = now, next_run_at = projection (one statement)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  success notification                                                   │
//! │                                                                         │
//! │  Any step failing → high-priority failure notification + Err.           │
//! │  Exception: an unsupported report type is a config defect; it is        │
//! │  logged and returned, not notified.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use till_core::{daterange, nextrun, ScheduledReport};

use crate::error::{SchedulerError, SchedulerResult};
use crate::export::{ExportOutcome, ExportPipeline};
use crate::notify::{Notification, NotificationPublisher};
use crate::provider::{ProviderError, ReportDataProvider};
use crate::store::ReportStore;

// =============================================================================
// Run Trigger
// =============================================================================

/// What caused a run: the timer reaching an occurrence, or a user's
/// explicit "run now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    Scheduled,
    Manual,
}

impl std::fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunTrigger::Scheduled => write!(f, "scheduled"),
            RunTrigger::Manual => write!(f, "manual"),
        }
    }
}

// =============================================================================
// Execution Pipeline
// =============================================================================

/// Executes report runs. One instance is shared by every trigger and by
/// manual "run now" calls; a per-report async lock serializes runs of the
/// same schedule without blocking unrelated ones.
pub struct ExecutionPipeline {
    store: Arc<dyn ReportStore>,
    provider: Arc<dyn ReportDataProvider>,
    publisher: Arc<dyn NotificationPublisher>,
    exporter: ExportPipeline,

    /// Per-report run locks, created lazily on first run.
    run_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ExecutionPipeline {
    pub fn new(
        store: Arc<dyn ReportStore>,
        provider: Arc<dyn ReportDataProvider>,
        publisher: Arc<dyn NotificationPublisher>,
        exporter: ExportPipeline,
    ) -> Self {
        ExecutionPipeline {
            store,
            provider,
            publisher,
            exporter,
            run_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Runs one report to completion.
    pub async fn execute(
        &self,
        report: &ScheduledReport,
        trigger: RunTrigger,
    ) -> SchedulerResult<ExportOutcome> {
        let lock = self.run_lock(&report.id);
        let _guard = lock.lock().await;

        info!(
            report_id = %report.id,
            name = %report.name,
            report_type = %report.report_type,
            trigger = %trigger,
            "Running report"
        );

        let today = Local::now().date_naive();
        let range = daterange::resolve(report.date_range_type, &report.date_range_config, today);

        let aggregate = match self.provider.fetch(report.report_type, &range).await {
            Ok(aggregate) => aggregate,
            Err(ProviderError::UnsupportedReportType(report_type)) => {
                // Config defect: the schedule asks for something the host
                // can't answer. Logged for the operator, not notified.
                error!(
                    report_id = %report.id,
                    report_type = %report_type,
                    "Provider does not support this report type"
                );
                return Err(SchedulerError::UnsupportedReportType {
                    id: report.id.clone(),
                    report_type: report_type.to_string(),
                });
            }
            Err(e) => {
                let err = SchedulerError::DataFetchFailed {
                    id: report.id.clone(),
                    reason: e.to_string(),
                };
                self.notify_failure(report, &err).await;
                return Err(err);
            }
        };

        let outcome = match self.exporter.export(report, &range, &aggregate).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.notify_failure(report, &e).await;
                return Err(e);
            }
        };

        let last_run = Utc::now();
        let next_run = local_to_utc(nextrun::next_run(
            report.schedule_type,
            &report.schedule_config,
            Local::now().naive_local(),
        ));

        if let Err(e) = self
            .store
            .update_run_times(&report.id, last_run, next_run)
            .await
        {
            self.notify_failure(report, &e).await;
            return Err(e);
        }

        info!(
            report_id = %report.id,
            path = %outcome.path.display(),
            next_run = %next_run,
            "Report run complete"
        );

        self.publish_quietly(Notification::success(
            report,
            &outcome.path.display().to_string(),
        ))
        .await;

        Ok(outcome)
    }

    /// Per-report lock, created on first use.
    fn run_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.run_locks
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Drops the run lock for a report that no longer needs one (deleted
    /// or unscheduled). A lock still held by an in-flight run is kept.
    pub(crate) fn forget_run_lock(&self, id: &str) {
        let mut locks = self.run_locks.lock().unwrap();
        if let Some(lock) = locks.get(id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(id);
            }
        }
    }

    async fn notify_failure(&self, report: &ScheduledReport, err: &SchedulerError) {
        error!(
            report_id = %report.id,
            name = %report.name,
            error = %err,
            "Report run failed"
        );
        self.publish_quietly(Notification::failure(report, &err.to_string()))
            .await;
    }

    /// Publishes a notification; delivery failure is logged and never
    /// changes the run outcome.
    async fn publish_quietly(&self, notification: Notification) {
        if let Err(e) = self.publisher.publish(notification).await {
            warn!(error = %e, "Notification delivery failed");
        }
    }
}

/// Maps a local projection instant to UTC for persistence. A DST gap
/// (the local time doesn't exist) advances one day instead.
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        chrono::LocalResult::None => Utc::now() + chrono::Duration::days(1),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use till_core::{
        DateRange, DateRangeConfig, DateRangeType, ExportFormat, ReportAggregate, ReportType,
        SalesSummary, ScheduleConfig, ScheduleType,
    };
    use uuid::Uuid;

    use crate::notify::NotificationPriority;
    use crate::provider::EmptyDataProvider;
    use crate::store::MemoryStore;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("till-pipeline-test-{}", Uuid::new_v4()))
    }

    fn sample_report() -> ScheduledReport {
        ScheduledReport {
            id: Uuid::new_v4().to_string(),
            name: "Daily Sales".to_string(),
            report_type: ReportType::Sales,
            schedule_type: ScheduleType::Daily,
            schedule_config: ScheduleConfig::default(),
            date_range_type: DateRangeType::Relative,
            date_range_config: DateRangeConfig::default(),
            export_format: ExportFormat::Csv,
            export_path: None,
            is_active: true,
            last_run_at: None,
            next_run_at: None,
            created_by_id: "user-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<Notification>>,
    }

    impl RecordingPublisher {
        fn sent(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationPublisher for RecordingPublisher {
        async fn publish(&self, notification: Notification) -> SchedulerResult<()> {
            self.sent.lock().unwrap().push(notification);
            Ok(())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ReportDataProvider for FailingProvider {
        async fn fetch(
            &self,
            _report_type: ReportType,
            _range: &DateRange,
        ) -> Result<ReportAggregate, ProviderError> {
            Err(ProviderError::QueryFailed("db locked".to_string()))
        }
    }

    struct UnsupportedProvider;

    #[async_trait]
    impl ReportDataProvider for UnsupportedProvider {
        async fn fetch(
            &self,
            report_type: ReportType,
            _range: &DateRange,
        ) -> Result<ReportAggregate, ProviderError> {
            Err(ProviderError::UnsupportedReportType(report_type))
        }
    }

    fn pipeline_with(
        store: Arc<MemoryStore>,
        provider: Arc<dyn ReportDataProvider>,
        publisher: Arc<RecordingPublisher>,
    ) -> ExecutionPipeline {
        ExecutionPipeline::new(
            store,
            provider,
            publisher,
            ExportPipeline::new(temp_dir()),
        )
    }

    #[tokio::test]
    async fn test_successful_run_persists_and_notifies() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let report = sample_report();
        store.put(report.clone()).await;

        let pipeline = pipeline_with(store.clone(), Arc::new(EmptyDataProvider), publisher.clone());
        let outcome = pipeline
            .execute(&report, RunTrigger::Scheduled)
            .await
            .unwrap();

        assert!(outcome.path.exists());

        let persisted = store.get(&report.id).await.unwrap().unwrap();
        assert!(persisted.last_run_at.is_some());
        assert!(persisted.next_run_at.unwrap() > Utc::now());

        let sent = publisher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].priority, NotificationPriority::Normal);
        assert_eq!(sent[0].user_id, "user-1");
    }

    #[tokio::test]
    async fn test_fetch_failure_notifies_high_priority() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let report = sample_report();
        store.put(report.clone()).await;

        let pipeline = pipeline_with(store.clone(), Arc::new(FailingProvider), publisher.clone());
        let err = pipeline
            .execute(&report, RunTrigger::Scheduled)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::DataFetchFailed { .. }));

        // Run times untouched on failure
        let persisted = store.get(&report.id).await.unwrap().unwrap();
        assert!(persisted.last_run_at.is_none());

        let sent = publisher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].priority, NotificationPriority::High);
        assert_eq!(sent[0].user_id, "user-1");
    }

    #[tokio::test]
    async fn test_unsupported_type_errors_without_notification() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let report = sample_report();
        store.put(report.clone()).await;

        let pipeline =
            pipeline_with(store.clone(), Arc::new(UnsupportedProvider), publisher.clone());
        let err = pipeline
            .execute(&report, RunTrigger::Manual)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::UnsupportedReportType { .. }));
        assert!(publisher.sent().is_empty());
    }

    /// Provider that records how many fetches overlap.
    struct OverlapProbe {
        current: AtomicUsize,
        max_seen: AtomicUsize,
        inner: EmptyDataProvider,
    }

    #[async_trait]
    impl ReportDataProvider for OverlapProbe {
        async fn fetch(
            &self,
            report_type: ReportType,
            range: &DateRange,
        ) -> Result<ReportAggregate, ProviderError> {
            let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            self.inner.fetch(report_type, range).await
        }
    }

    #[tokio::test]
    async fn test_same_report_runs_serialize() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let report = sample_report();
        store.put(report.clone()).await;

        let probe = Arc::new(OverlapProbe {
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
            inner: EmptyDataProvider,
        });

        let pipeline = Arc::new(pipeline_with(store, probe.clone(), publisher));

        let a = pipeline.execute(&report, RunTrigger::Scheduled);
        let b = pipeline.execute(&report, RunTrigger::Manual);
        let (ra, rb) = tokio::join!(a, b);
        ra.unwrap();
        rb.unwrap();

        assert_eq!(probe.max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forget_run_lock_evicts_idle_entry() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let report = sample_report();
        store.put(report.clone()).await;

        let pipeline = pipeline_with(store, Arc::new(EmptyDataProvider), publisher);
        pipeline
            .execute(&report, RunTrigger::Manual)
            .await
            .unwrap();
        assert_eq!(pipeline.run_locks.lock().unwrap().len(), 1);

        pipeline.forget_run_lock(&report.id);
        assert!(pipeline.run_locks.lock().unwrap().is_empty());

        // Unknown ids are a no-op
        pipeline.forget_run_lock("no-such-id");

        // A lock still referenced by an in-flight run is kept
        let held = pipeline.run_lock(&report.id);
        pipeline.forget_run_lock(&report.id);
        assert_eq!(pipeline.run_locks.lock().unwrap().len(), 1);
        drop(held);
    }
}
