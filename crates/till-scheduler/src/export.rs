//! # Export Pipeline
//!
//! Turns a run's aggregate into a file on disk.
//!
//! ## Format Dispatch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  csv          rendered natively by till-core's CSV layout               │
//! │  spreadsheet  wired-in renderer required; error when absent             │
//! │  document     wired-in renderer; falls back to CSV when the renderer    │
//! │               is absent or fails (exactly one file either way)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## File Naming
//! `{sanitized_name}_{YYYYMMDD_HHMMSS}.{ext}` inside the schedule's
//! `export_path` override, or the configured exports directory.

use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use till_core::{csv, DateRange, ExportFormat, ReportAggregate, ScheduledReport};

use crate::error::{SchedulerError, SchedulerResult};

// =============================================================================
// Renderer Seam
// =============================================================================

/// Renders an aggregate into format-specific bytes (xlsx, pdf). The host
/// wires implementations in; CSV needs none.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(
        &self,
        report: &ScheduledReport,
        range: &DateRange,
        aggregate: &ReportAggregate,
    ) -> SchedulerResult<Vec<u8>>;
}

// =============================================================================
// Outcome
// =============================================================================

/// What the export actually produced. `format` can differ from the
/// schedule's requested format when the document fallback engaged.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub format: ExportFormat,
}

// =============================================================================
// Export Pipeline
// =============================================================================

/// Writes one artifact per run.
pub struct ExportPipeline {
    /// Destination when a schedule has no `export_path` override.
    default_dir: PathBuf,

    /// Spreadsheet (xlsx) renderer, if the host wired one.
    spreadsheet: Option<Arc<dyn ArtifactRenderer>>,

    /// Document (pdf) renderer, if the host wired one.
    document: Option<Arc<dyn ArtifactRenderer>>,
}

impl ExportPipeline {
    /// Creates a pipeline with no external renderers; only CSV (and the
    /// document fallback) are available.
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        ExportPipeline {
            default_dir: default_dir.into(),
            spreadsheet: None,
            document: None,
        }
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

    /// Exports one run's aggregate, returning the written file.
    pub async fn export(
        &self,
        report: &ScheduledReport,
        range: &DateRange,
        aggregate: &ReportAggregate,
    ) -> SchedulerResult<ExportOutcome> {
        let dir = report
            .export_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_dir.clone());

        match report.export_format {
            ExportFormat::Csv => {
                let bytes = csv::render(&report.name, range, aggregate).into_bytes();
                let path = self.write(&dir, report, ExportFormat::Csv, &bytes).await?;
                Ok(ExportOutcome {
                    path,
                    format: ExportFormat::Csv,
                })
            }

            ExportFormat::Spreadsheet => {
                let renderer = self.spreadsheet.as_ref().ok_or_else(|| {
                    SchedulerError::RendererUnavailable {
                        format: ExportFormat::Spreadsheet.to_string(),
                    }
                })?;
                let bytes = renderer.render(report, range, aggregate).await?;
                let path = self
                    .write(&dir, report, ExportFormat::Spreadsheet, &bytes)
                    .await?;
                Ok(ExportOutcome {
                    path,
                    format: ExportFormat::Spreadsheet,
                })
            }

            ExportFormat::Document => {
                // Renderer absent or failing degrades to CSV; the run
                // still produces exactly one file.
                let rendered = match self.document.as_ref() {
                    Some(renderer) => match renderer.render(report, range, aggregate).await {
                        Ok(bytes) => Some(bytes),
                        Err(e) => {
                            warn!(
                                report_id = %report.id,
                                error = %e,
                                "Document renderer failed, falling back to CSV"
                            );
                            None
                        }
                    },
                    None => None,
                };

                match rendered {
                    Some(bytes) => {
                        let path = self
                            .write(&dir, report, ExportFormat::Document, &bytes)
                            .await?;
                        Ok(ExportOutcome {
                            path,
                            format: ExportFormat::Document,
                        })
                    }
                    None => {
                        let bytes = csv::render(&report.name, range, aggregate).into_bytes();
                        let path = self.write(&dir, report, ExportFormat::Csv, &bytes).await?;
                        Ok(ExportOutcome {
                            path,
                            format: ExportFormat::Csv,
                        })
                    }
                }
            }
        }
    }

    async fn write(
        &self,
        dir: &Path,
        report: &ScheduledReport,
        format: ExportFormat,
        bytes: &[u8],
    ) -> SchedulerResult<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| SchedulerError::WriteFailed {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!(
            "{}_{}.{}",
            report.sanitized_name(),
            timestamp,
            format.extension()
        );
        let path = dir.join(filename);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| SchedulerError::WriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        info!(
            report_id = %report.id,
            path = %path.display(),
            bytes = bytes.len(),
            "Export written"
        );

        Ok(path)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use till_core::{
        DateRangeConfig, DateRangeType, ReportType, SalesSummary, ScheduleConfig, ScheduleType,
    };
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("till-export-test-{}", Uuid::new_v4()))
    }

    fn sample_report(format: ExportFormat) -> ScheduledReport {
        ScheduledReport {
            id: Uuid::new_v4().to_string(),
            name: "Weekly Sales".to_string(),
            report_type: ReportType::Sales,
            schedule_type: ScheduleType::Weekly,
            schedule_config: ScheduleConfig::default(),
            date_range_type: DateRangeType::Relative,
            date_range_config: DateRangeConfig::default(),
            export_format: format,
            export_path: None,
            is_active: true,
            last_run_at: None,
            next_run_at: None,
            created_by_id: "user-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        )
    }

    struct FailingRenderer;

    #[async_trait]
    impl ArtifactRenderer for FailingRenderer {
        async fn render(
            &self,
            report: &ScheduledReport,
            _range: &DateRange,
            _aggregate: &ReportAggregate,
        ) -> SchedulerResult<Vec<u8>> {
            Err(SchedulerError::ExportFailed {
                id: report.id.clone(),
                reason: "renderer broken".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_csv_export_writes_named_file() {
        let dir = temp_dir();
        let pipeline = ExportPipeline::new(&dir);
        let report = sample_report(ExportFormat::Csv);
        let aggregate = ReportAggregate::Sales(SalesSummary::default());

        let outcome = pipeline
            .export(&report, &sample_range(), &aggregate)
            .await
            .unwrap();

        assert_eq!(outcome.format, ExportFormat::Csv);
        let name = outcome.path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Weekly_Sales_"));
        assert!(name.ends_with(".csv"));

        let contents = tokio::fs::read_to_string(&outcome.path).await.unwrap();
        assert!(contents.starts_with("Report,Weekly Sales"));
    }

    #[tokio::test]
    async fn test_document_without_renderer_falls_back_to_csv() {
        let dir = temp_dir();
        let pipeline = ExportPipeline::new(&dir);
        let report = sample_report(ExportFormat::Document);
        let aggregate = ReportAggregate::Sales(SalesSummary::default());

        let outcome = pipeline
            .export(&report, &sample_range(), &aggregate)
            .await
            .unwrap();

        assert_eq!(outcome.format, ExportFormat::Csv);

        // Exactly one file produced
        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_failing_document_renderer_falls_back_to_csv() {
        let dir = temp_dir();
        let pipeline =
            ExportPipeline::new(&dir).with_document_renderer(Arc::new(FailingRenderer));
        let report = sample_report(ExportFormat::Document);
        let aggregate = ReportAggregate::Sales(SalesSummary::default());

        let outcome = pipeline
            .export(&report, &sample_range(), &aggregate)
            .await
            .unwrap();

        assert_eq!(outcome.format, ExportFormat::Csv);
        assert!(outcome.path.extension().unwrap() == "csv");
    }

    #[tokio::test]
    async fn test_spreadsheet_without_renderer_errors() {
        let dir = temp_dir();
        let pipeline = ExportPipeline::new(&dir);
        let report = sample_report(ExportFormat::Spreadsheet);
        let aggregate = ReportAggregate::Sales(SalesSummary::default());

        let err = pipeline
            .export(&report, &sample_range(), &aggregate)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::RendererUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_export_path_override() {
        let override_dir = temp_dir();
        let pipeline = ExportPipeline::new(temp_dir());

        let mut report = sample_report(ExportFormat::Csv);
        report.export_path = Some(override_dir.display().to_string());
        let aggregate = ReportAggregate::Sales(SalesSummary::default());

        let outcome = pipeline
            .export(&report, &sample_range(), &aggregate)
            .await
            .unwrap();

        assert!(outcome.path.starts_with(&override_dir));
    }
}
