//! # Report Repository
//!
//! Database operations for scheduled reports.
//!
//! ## Row Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Config Blob Boundary                                │
//! │                                                                         │
//! │  scheduled_reports row                                                  │
//! │       │  schedule_config / date_range_config are raw JSON TEXT          │
//! │       ▼                                                                 │
//! │  ReportRow (FromRow)                                                    │
//! │       │  serde_json parse + per-variant validation                      │
//! │       ▼                                                                 │
//! │  ScheduledReport (typed) ──► registry / pipeline                        │
//! │                                                                         │
//! │  A malformed blob surfaces as DbError::InvalidConfig here; untyped      │
//! │  maps never travel past this module.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use till_core::validation;
use till_core::{
    DateRangeConfig, DateRangeType, ExportFormat, ReportType, ScheduleConfig, ScheduleType,
    ScheduledReport,
};

// =============================================================================
// Rows
// =============================================================================

/// Raw database row for a scheduled report. Config blobs are still
/// unparsed JSON text at this stage.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ReportRow {
    id: String,
    name: String,
    report_type: ReportType,
    schedule_type: ScheduleType,
    schedule_config: String,
    date_range_type: DateRangeType,
    date_range_config: String,
    export_format: ExportFormat,
    export_path: Option<String>,
    is_active: bool,
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: Option<DateTime<Utc>>,
    created_by_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for ScheduledReport {
    type Error = DbError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let schedule_config: ScheduleConfig = serde_json::from_str(&row.schedule_config)
            .map_err(|e| DbError::invalid_config(&row.id, format!("schedule_config: {e}")))?;
        let date_range_config: DateRangeConfig = serde_json::from_str(&row.date_range_config)
            .map_err(|e| DbError::invalid_config(&row.id, format!("date_range_config: {e}")))?;

        validation::validate_schedule_config(row.schedule_type, &schedule_config)
            .map_err(|e| DbError::invalid_config(&row.id, e.to_string()))?;
        validation::validate_date_range_config(row.date_range_type, &date_range_config)
            .map_err(|e| DbError::invalid_config(&row.id, e.to_string()))?;

        Ok(ScheduledReport {
            id: row.id,
            name: row.name,
            report_type: row.report_type,
            schedule_type: row.schedule_type,
            schedule_config,
            date_range_type: row.date_range_type,
            date_range_config,
            export_format: row.export_format,
            export_path: row.export_path,
            is_active: row.is_active,
            last_run_at: row.last_run_at,
            next_run_at: row.next_run_at,
            created_by_id: row.created_by_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, name, report_type, schedule_type, schedule_config,
        date_range_type, date_range_config, export_format, export_path,
        is_active, last_run_at, next_run_at,
        created_by_id, created_at, updated_at
    FROM scheduled_reports
"#;

// =============================================================================
// New Report
// =============================================================================

/// Fields supplied by the caller when creating a schedule; the repository
/// fills in the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub name: String,
    pub report_type: ReportType,
    pub schedule_type: ScheduleType,
    pub schedule_config: ScheduleConfig,
    pub date_range_type: DateRangeType,
    pub date_range_config: DateRangeConfig,
    pub export_format: ExportFormat,
    pub export_path: Option<String>,
    pub is_active: bool,
    /// Projected first fire, computed by the caller from the schedule.
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_by_id: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for scheduled report database operations.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Inserts a new scheduled report.
    ///
    /// Config blobs are validated before any SQL runs; an invalid config
    /// never reaches the table.
    pub async fn insert(&self, new: NewReport) -> DbResult<ScheduledReport> {
        let id = Uuid::new_v4().to_string();

        validation::validate_schedule_config(new.schedule_type, &new.schedule_config)
            .map_err(|e| DbError::invalid_config(&id, e.to_string()))?;
        validation::validate_date_range_config(new.date_range_type, &new.date_range_config)
            .map_err(|e| DbError::invalid_config(&id, e.to_string()))?;

        let now = Utc::now();
        let report = ScheduledReport {
            id: id.clone(),
            name: new.name,
            report_type: new.report_type,
            schedule_type: new.schedule_type,
            schedule_config: new.schedule_config,
            date_range_type: new.date_range_type,
            date_range_config: new.date_range_config,
            export_format: new.export_format,
            export_path: new.export_path,
            is_active: new.is_active,
            last_run_at: None,
            next_run_at: new.next_run_at,
            created_by_id: new.created_by_id,
            created_at: now,
            updated_at: now,
        };

        validation::validate_report(&report)
            .map_err(|e| DbError::invalid_config(&id, e.to_string()))?;

        debug!(id = %report.id, name = %report.name, "Inserting scheduled report");

        let schedule_config = serde_json::to_string(&report.schedule_config)
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let date_range_config = serde_json::to_string(&report.date_range_config)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO scheduled_reports (
                id, name, report_type, schedule_type, schedule_config,
                date_range_type, date_range_config, export_format, export_path,
                is_active, last_run_at, next_run_at,
                created_by_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&report.id)
        .bind(&report.name)
        .bind(report.report_type)
        .bind(report.schedule_type)
        .bind(&schedule_config)
        .bind(report.date_range_type)
        .bind(&date_range_config)
        .bind(report.export_format)
        .bind(&report.export_path)
        .bind(report.is_active)
        .bind(report.last_run_at)
        .bind(report.next_run_at)
        .bind(&report.created_by_id)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(report)
    }

    /// Gets a scheduled report by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ScheduledReport>> {
        let row: Option<ReportRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(ScheduledReport::try_from).transpose()
    }

    /// Lists every active schedule, ordered by next projected run.
    ///
    /// Used at startup to hydrate the registry and by triggers that want
    /// the full active set.
    pub async fn list_active(&self) -> DbResult<Vec<ScheduledReport>> {
        let rows: Vec<ReportRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE is_active = 1 ORDER BY next_run_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ScheduledReport::try_from).collect()
    }

    /// Lists schedules (active and inactive) with pagination, newest first.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<ScheduledReport>> {
        let rows: Vec<ReportRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ScheduledReport::try_from).collect()
    }

    /// Updates the mutable fields of a schedule.
    ///
    /// The id, created_at, and created_by_id are immutable; run times
    /// change through [`Self::update_run_times`] instead so a concurrent
    /// run never clobbers a config edit.
    pub async fn update(&self, report: &ScheduledReport) -> DbResult<()> {
        validation::validate_report(report)
            .map_err(|e| DbError::invalid_config(&report.id, e.to_string()))?;

        debug!(id = %report.id, "Updating scheduled report");

        let schedule_config = serde_json::to_string(&report.schedule_config)
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let date_range_config = serde_json::to_string(&report.date_range_config)
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE scheduled_reports SET
                name = ?2,
                report_type = ?3,
                schedule_type = ?4,
                schedule_config = ?5,
                date_range_type = ?6,
                date_range_config = ?7,
                export_format = ?8,
                export_path = ?9,
                is_active = ?10,
                next_run_at = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(&report.id)
        .bind(&report.name)
        .bind(report.report_type)
        .bind(report.schedule_type)
        .bind(&schedule_config)
        .bind(report.date_range_type)
        .bind(&date_range_config)
        .bind(report.export_format)
        .bind(&report.export_path)
        .bind(report.is_active)
        .bind(report.next_run_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Scheduled report", &report.id));
        }

        Ok(())
    }

    /// Records a completed run: sets `last_run_at` and the recomputed
    /// `next_run_at` in one statement.
    pub async fn update_run_times(
        &self,
        id: &str,
        last_run_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE scheduled_reports SET
                last_run_at = ?2,
                next_run_at = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(last_run_at)
        .bind(next_run_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Scheduled report", id));
        }

        Ok(())
    }

    /// Updates only the projected next run (config changes, reactivation).
    pub async fn set_next_run(&self, id: &str, next_run_at: Option<DateTime<Utc>>) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE scheduled_reports SET
                next_run_at = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(next_run_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Scheduled report", id));
        }

        Ok(())
    }

    /// Activates or deactivates a schedule.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE scheduled_reports SET
                is_active = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Scheduled report", id));
        }

        Ok(())
    }

    /// Deletes a schedule.
    ///
    /// The caller must stop the schedule's trigger before the row goes
    /// away; the registry handles that ordering.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting scheduled report");

        let result = sqlx::query("DELETE FROM scheduled_reports WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Scheduled report", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
