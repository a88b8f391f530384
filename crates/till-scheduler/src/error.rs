//! # Scheduler Error Types
//!
//! Error types for scheduling, execution, and export.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Scheduler Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐  │
//! │  │  Configuration  │  │    Execution    │  │       Export            │  │
//! │  │                 │  │                 │  │                         │  │
//! │  │  InvalidConfig  │  │  DataFetch      │  │  ExportFailed           │  │
//! │  │  Unschedulable  │  │  Unsupported    │  │  RendererUnavailable    │  │
//! │  │  ConfigLoad     │  │    ReportType   │  │  WriteFailed            │  │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘  │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                               │
//! │  │    Database     │  │  Notification   │                               │
//! │  │                 │  │                 │                               │
//! │  │  Database       │  │  NotifyFailed   │                               │
//! │  │  NotFound       │  │  (never masks   │                               │
//! │  │                 │  │   run outcome)  │                               │
//! │  └─────────────────┘  └─────────────────┘                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler error type covering trigger, execution, and export failures.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Errors are categorized: config defects vs transient run failures
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum SchedulerError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scheduler configuration.
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    /// A report's recurrence config cannot produce a trigger.
    #[error("Report {id} is unschedulable: {reason}")]
    Unschedulable { id: String, reason: String },

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Execution Errors
    // =========================================================================
    /// The data provider failed to produce an aggregate.
    #[error("Data fetch failed for report {id}: {reason}")]
    DataFetchFailed { id: String, reason: String },

    /// The data provider does not know this report type. A persisted row
    /// asking for it is a config defect, not a transient failure.
    #[error("Unsupported report type '{report_type}' for report {id}")]
    UnsupportedReportType { id: String, report_type: String },

    /// Scheduled report not found.
    #[error("Scheduled report not found: {0}")]
    NotFound(String),

    // =========================================================================
    // Export Errors
    // =========================================================================
    /// Export pipeline failure.
    #[error("Export failed for report {id}: {reason}")]
    ExportFailed { id: String, reason: String },

    /// No renderer is wired for the requested format.
    #[error("No renderer available for format '{format}'")]
    RendererUnavailable { format: String },

    /// Writing the artifact to disk failed.
    #[error("Failed to write export file {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    // =========================================================================
    // Notification Errors
    // =========================================================================
    /// Notification delivery failed. Callers log this and carry on; a
    /// failed notification never changes a run's outcome.
    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal scheduler error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<till_core::CoreError> for SchedulerError {
    fn from(err: till_core::CoreError) -> Self {
        match err {
            till_core::CoreError::Unschedulable { reason } => SchedulerError::Unschedulable {
                id: "unknown".to_string(),
                reason,
            },
            other => SchedulerError::InvalidConfig(other.to_string()),
        }
    }
}

impl From<till_db::DbError> for SchedulerError {
    fn from(err: till_db::DbError) -> Self {
        match err {
            till_db::DbError::NotFound { entity: _, id } => SchedulerError::NotFound(id),
            till_db::DbError::InvalidConfig { id, reason } => {
                SchedulerError::InvalidConfig(format!("report {id}: {reason}"))
            }
            other => SchedulerError::Database(other.to_string()),
        }
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(err: std::io::Error) -> Self {
        SchedulerError::Internal(err.to_string())
    }
}

impl From<toml::de::Error> for SchedulerError {
    fn from(err: toml::de::Error) -> Self {
        SchedulerError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SchedulerError {
    fn from(err: toml::ser::Error) -> Self {
        SchedulerError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SchedulerError {
    /// Returns true if this error points at a schedule's configuration
    /// rather than a transient run failure. Config errors need an operator
    /// to edit the schedule; retrying won't help.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SchedulerError::InvalidConfig(_)
                | SchedulerError::Unschedulable { .. }
                | SchedulerError::UnsupportedReportType { .. }
                | SchedulerError::ConfigLoadFailed(_)
                | SchedulerError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if the next scheduled run may succeed without any
    /// config change.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SchedulerError::DataFetchFailed { .. }
                | SchedulerError::ExportFailed { .. }
                | SchedulerError::WriteFailed { .. }
                | SchedulerError::Database(_)
                | SchedulerError::NotifyFailed(_)
        )
    }
}
