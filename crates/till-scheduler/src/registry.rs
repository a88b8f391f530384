//! # Schedule Registry
//!
//! Owns the live triggers: exactly one per active schedule, zero for
//! inactive or unschedulable ones.
//!
//! ## Registry Invariants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  • At most one live trigger per report id                               │
//! │  • schedule() atomically replaces any existing trigger for the id       │
//! │  • A fire works from a fresh store snapshot, never the copy captured    │
//! │    at schedule time; deleted or deactivated reports are skipped         │
//! │  • schedule()/unschedule()/start() log failures instead of raising:     │
//! │    one broken schedule never takes the engine down                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use till_core::{recurrence, ScheduledReport};

use crate::error::{SchedulerError, SchedulerResult};
use crate::export::ExportOutcome;
use crate::pipeline::{ExecutionPipeline, RunTrigger};
use crate::store::ReportStore;
use crate::trigger::{FireCallback, TriggerEngine, TriggerHandle};

/// Live trigger bookkeeping for every active schedule.
pub struct ScheduleRegistry {
    engine: Arc<dyn TriggerEngine>,
    store: Arc<dyn ReportStore>,
    pipeline: Arc<ExecutionPipeline>,

    /// One handle per scheduled report id.
    triggers: Mutex<HashMap<String, TriggerHandle>>,

    started: AtomicBool,
}

impl std::fmt::Debug for ScheduleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleRegistry")
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl ScheduleRegistry {
    pub fn new(
        engine: Arc<dyn TriggerEngine>,
        store: Arc<dyn ReportStore>,
        pipeline: Arc<ExecutionPipeline>,
    ) -> Self {
        ScheduleRegistry {
            engine,
            store,
            pipeline,
            triggers: Mutex::new(HashMap::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Hydrates triggers for every active schedule. Idempotent: a second
    /// call is logged and ignored.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Schedule registry already started, ignoring");
            return;
        }

        let reports = match self.store.list_active().await {
            Ok(reports) => reports,
            Err(e) => {
                error!(error = %e, "Failed to load active schedules");
                return;
            }
        };

        info!(count = reports.len(), "Starting schedule registry");
        for report in &reports {
            self.schedule(report).await;
        }
    }

    /// Stops every trigger and forgets them. The registry can be started
    /// again afterwards.
    pub async fn stop(&self) {
        let handles: Vec<(String, TriggerHandle)> =
            self.triggers.lock().unwrap().drain().collect();

        info!(count = handles.len(), "Stopping schedule registry");
        for (id, handle) in handles {
            debug!(report_id = %id, "Stopping trigger");
            handle.stop();
        }
        self.started.store(false, Ordering::SeqCst);
    }

    /// Creates (or replaces) the trigger for one schedule.
    ///
    /// An inactive report tears its trigger down; an unschedulable config
    /// is logged, clears `next_run_at`, and holds no trigger. Neither
    /// case raises: a broken schedule must not take callers down.
    pub async fn schedule(&self, report: &ScheduledReport) {
        if !report.is_active {
            self.unschedule(&report.id);
            return;
        }

        let spec = match recurrence::compile(report.schedule_type, &report.schedule_config) {
            Ok(spec) => spec,
            Err(e) => {
                warn!(
                    report_id = %report.id,
                    name = %report.name,
                    error = %e,
                    "Schedule is unschedulable, no trigger created"
                );
                self.unschedule(&report.id);
                if let Err(e) = self.store.set_next_run(&report.id, None).await {
                    warn!(report_id = %report.id, error = %e, "Failed to clear next run");
                }
                return;
            }
        };

        debug!(
            report_id = %report.id,
            name = %report.name,
            recurrence = %spec.describe(),
            "Scheduling report"
        );

        // Cancel any existing trigger before arming the replacement, so
        // two live triggers never coexist for one id
        if let Some(old) = self.triggers.lock().unwrap().remove(&report.id) {
            debug!(report_id = %report.id, "Replacing existing trigger");
            old.stop();
        }

        let callback = self.fire_callback(&report.id);
        let handle = self.engine.create(&report.id, spec, callback);
        self.triggers
            .lock()
            .unwrap()
            .insert(report.id.clone(), handle);
    }

    /// Removes and stops the trigger for a report id, if one exists.
    /// Safe to call for ids that were never scheduled.
    pub fn unschedule(&self, id: &str) {
        if let Some(handle) = self.triggers.lock().unwrap().remove(id) {
            debug!(report_id = %id, "Unscheduled report");
            handle.stop();
        }
        self.pipeline.forget_run_lock(id);
    }

    /// Runs a report immediately, outside its timer. Serialized against
    /// timer fires of the same report by the pipeline's per-report lock.
    pub async fn run_now(&self, id: &str) -> SchedulerResult<ExportOutcome> {
        let report = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;

        self.pipeline.execute(&report, RunTrigger::Manual).await
    }

    /// Number of live triggers.
    pub fn active_count(&self) -> usize {
        self.triggers.lock().unwrap().len()
    }

    /// Builds the fire callback for a report id: fetch a fresh snapshot,
    /// skip if gone or inactive, otherwise run the pipeline.
    fn fire_callback(&self, id: &str) -> FireCallback {
        let store = self.store.clone();
        let pipeline = self.pipeline.clone();
        let id = id.to_string();

        Arc::new(move || {
            let store = store.clone();
            let pipeline = pipeline.clone();
            let id = id.clone();

            Box::pin(async move {
                match store.get(&id).await {
                    Ok(Some(snapshot)) if snapshot.is_active => {
                        // Pipeline handles its own failure notification
                        let _ = pipeline.execute(&snapshot, RunTrigger::Scheduled).await;
                    }
                    Ok(Some(_)) => {
                        debug!(report_id = %id, "Report inactive at fire time, skipping");
                    }
                    Ok(None) => {
                        debug!(report_id = %id, "Report deleted before fire, skipping");
                    }
                    Err(e) => {
                        error!(report_id = %id, error = %e, "Snapshot fetch failed at fire time");
                    }
                }
            })
        })
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

use till_db::{Database, DbConfig};

use crate::config::SchedulerConfig;
use crate::export::{ArtifactRenderer, ExportPipeline};
use crate::notify::{LogPublisher, NotificationPublisher};
use crate::provider::ReportDataProvider;
use crate::trigger::TokioTriggerEngine;

/// Builder wiring a full engine: database, store, pipeline, registry.
///
/// The data provider is the one piece the host must supply; everything
/// else has a default (log publisher, tokio triggers, config paths).
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    provider: Option<Arc<dyn ReportDataProvider>>,
    publisher: Option<Arc<dyn NotificationPublisher>>,
    spreadsheet: Option<Arc<dyn ArtifactRenderer>>,
    document: Option<Arc<dyn ArtifactRenderer>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given config.
    pub fn new(config: SchedulerConfig) -> Self {
        SchedulerBuilder {
            config,
            provider: None,
            publisher: None,
            spreadsheet: None,
            document: None,
        }
    }

    /// Sets the report data provider (required).
    pub fn with_provider(mut self, provider: Arc<dyn ReportDataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the notification publisher (default: log publisher).
    pub fn with_publisher(mut self, publisher: Arc<dyn NotificationPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Wires in a spreadsheet renderer.
    pub fn with_spreadsheet_renderer(mut self, renderer: Arc<dyn ArtifactRenderer>) -> Self {
        self.spreadsheet = Some(renderer);
        self
    }

    /// Wires in a document renderer.
    pub fn with_document_renderer(mut self, renderer: Arc<dyn ArtifactRenderer>) -> Self {
        self.document = Some(renderer);
        self
    }

    /// Opens the database and assembles the registry. The returned
    /// registry is not started; call [`ScheduleRegistry::start`] after
    /// the host finishes its own startup.
    pub async fn build(self) -> SchedulerResult<(ScheduleRegistry, Database)> {
        let provider = self
            .provider
            .ok_or_else(|| SchedulerError::InvalidConfig("Data provider required".into()))?;
        let publisher = self
            .publisher
            .unwrap_or_else(|| Arc::new(LogPublisher) as Arc<dyn NotificationPublisher>);

        self.config.validate()?;

        let db = Database::new(DbConfig::new(self.config.database.path.clone())).await?;
        let store = Arc::new(db.reports());

        let mut exporter = ExportPipeline::new(self.config.exports.dir.clone());
        if let Some(renderer) = self.spreadsheet {
            exporter = exporter.with_spreadsheet_renderer(renderer);
        }
        if let Some(renderer) = self.document {
            exporter = exporter.with_document_renderer(renderer);
        }

        let pipeline = Arc::new(ExecutionPipeline::new(
            store.clone(),
            provider,
            publisher,
            exporter,
        ));

        let registry = ScheduleRegistry::new(Arc::new(TokioTriggerEngine::new()), store, pipeline);

        Ok((registry, db))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use till_core::{
        DateRangeConfig, DateRangeType, ExportFormat, ReportType, ScheduleConfig, ScheduleType,
    };
    use uuid::Uuid;

    use crate::export::ExportPipeline;
    use crate::notify::LogPublisher;
    use crate::provider::EmptyDataProvider;
    use crate::store::MemoryStore;
    use crate::trigger::ManualTriggerEngine;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("till-registry-test-{}", Uuid::new_v4()))
    }

    fn sample_report(name: &str) -> ScheduledReport {
        ScheduledReport {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
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

    struct Harness {
        engine: Arc<ManualTriggerEngine>,
        store: Arc<MemoryStore>,
        registry: ScheduleRegistry,
    }

    fn harness() -> Harness {
        let engine = Arc::new(ManualTriggerEngine::new());
        let store = Arc::new(MemoryStore::new());
        let pipeline = Arc::new(ExecutionPipeline::new(
            store.clone(),
            Arc::new(EmptyDataProvider),
            Arc::new(LogPublisher),
            ExportPipeline::new(temp_dir()),
        ));
        let registry = ScheduleRegistry::new(engine.clone(), store.clone(), pipeline);
        Harness {
            engine,
            store,
            registry,
        }
    }

    /// Lets manual-engine retirement tasks run.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_schedule_same_id_twice_keeps_one_trigger() {
        let h = harness();
        let report = sample_report("Daily Sales");
        h.store.put(report.clone()).await;

        h.registry.schedule(&report).await;
        h.registry.schedule(&report).await;
        settle().await;

        assert_eq!(h.registry.active_count(), 1);
        assert_eq!(h.engine.active_count(), 1);
    }

    /// Provider counting how many runs reached it.
    struct CountingProvider {
        fetches: Arc<AtomicUsize>,
        inner: EmptyDataProvider,
    }

    #[async_trait::async_trait]
    impl crate::provider::ReportDataProvider for CountingProvider {
        async fn fetch(
            &self,
            report_type: ReportType,
            range: &till_core::DateRange,
        ) -> Result<till_core::ReportAggregate, crate::provider::ProviderError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(report_type, range).await
        }
    }

    #[tokio::test]
    async fn test_replaced_schedule_fires_exactly_once() {
        let engine = Arc::new(ManualTriggerEngine::new());
        let store = Arc::new(MemoryStore::new());
        let fetches = Arc::new(AtomicUsize::new(0));
        let pipeline = Arc::new(ExecutionPipeline::new(
            store.clone(),
            Arc::new(CountingProvider {
                fetches: fetches.clone(),
                inner: EmptyDataProvider,
            }),
            Arc::new(LogPublisher),
            ExportPipeline::new(temp_dir()),
        ));
        let registry = ScheduleRegistry::new(engine.clone(), store.clone(), pipeline);

        let report = sample_report("Daily Sales");
        store.put(report.clone()).await;

        // Replace the trigger; the cancelled one must not fire again
        registry.schedule(&report).await;
        registry.schedule(&report).await;
        settle().await;

        engine.fire(&report.id).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(engine.active_count(), 1);
    }

    #[tokio::test]
    async fn test_start_hydrates_active_schedules_once() {
        let h = harness();
        h.store.put(sample_report("A")).await;
        h.store.put(sample_report("B")).await;

        let mut paused = sample_report("Paused");
        paused.is_active = false;
        h.store.put(paused).await;

        h.registry.start().await;
        assert_eq!(h.registry.active_count(), 2);

        // Second start is ignored
        h.registry.start().await;
        assert_eq!(h.registry.active_count(), 2);
    }

    #[tokio::test]
    async fn test_fire_runs_pipeline_from_fresh_snapshot() {
        let h = harness();
        let report = sample_report("Daily Sales");
        h.store.put(report.clone()).await;

        h.registry.schedule(&report).await;
        h.engine.fire(&report.id).await;

        let persisted = h.store.get(&report.id).await.unwrap().unwrap();
        assert!(persisted.last_run_at.is_some());
    }

    #[tokio::test]
    async fn test_fire_skips_deactivated_snapshot() {
        let h = harness();
        let report = sample_report("Daily Sales");
        h.store.put(report.clone()).await;
        h.registry.schedule(&report).await;

        // Deactivate behind the trigger's back
        let mut deactivated = report.clone();
        deactivated.is_active = false;
        h.store.put(deactivated).await;

        h.engine.fire(&report.id).await;

        let persisted = h.store.get(&report.id).await.unwrap().unwrap();
        assert!(persisted.last_run_at.is_none());
    }

    #[tokio::test]
    async fn test_unschedule_stops_trigger() {
        let h = harness();
        let report = sample_report("Daily Sales");
        h.store.put(report.clone()).await;
        h.registry.schedule(&report).await;

        h.registry.unschedule(&report.id);
        settle().await;

        assert_eq!(h.registry.active_count(), 0);
        assert_eq!(h.engine.active_count(), 0);

        // Firing after removal is a no-op
        h.engine.fire(&report.id).await;
        let persisted = h.store.get(&report.id).await.unwrap().unwrap();
        assert!(persisted.last_run_at.is_none());
    }

    #[tokio::test]
    async fn test_unschedulable_config_holds_no_trigger() {
        let h = harness();
        let mut report = sample_report("Broken");
        report.schedule_type = ScheduleType::Custom;
        report.schedule_config.cron_expression = Some("not a cron".to_string());
        h.store.put(report.clone()).await;

        h.registry.schedule(&report).await;
        assert_eq!(h.registry.active_count(), 0);

        let persisted = h.store.get(&report.id).await.unwrap().unwrap();
        assert!(persisted.next_run_at.is_none());
    }

    #[tokio::test]
    async fn test_builder_requires_provider() {
        let err = SchedulerBuilder::new(crate::config::SchedulerConfig::default())
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_run_now_executes_and_persists() {
        let h = harness();
        let report = sample_report("Manual Run");
        h.store.put(report.clone()).await;

        let outcome = h.registry.run_now(&report.id).await.unwrap();
        assert!(outcome.path.exists());

        let persisted = h.store.get(&report.id).await.unwrap().unwrap();
        assert!(persisted.last_run_at.is_some());

        let missing = h.registry.run_now("no-such-id").await;
        assert!(matches!(missing, Err(SchedulerError::NotFound(_))));
    }
}
