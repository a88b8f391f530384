//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Scheduling domain errors                       │
//! │  └── ValidationError  - Config validation failures                     │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  till-scheduler errors (separate crate)                                │
//! │  └── SchedulerError   - Execution / export / notify failures           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → SchedulerError          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (report id, field, raw value)
//! 3. Errors are enum variants, never String
//! 4. An unschedulable recurrence is a *value*, not a panic - callers must
//!    be able to log it and keep the report persisted but inert

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Scheduling domain errors.
///
/// These errors represent configuration defects or domain rule violations.
/// They should be caught at the repository/registry boundary and logged;
/// none of them may surface into a trigger loop.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The schedule configuration cannot produce trigger times.
    ///
    /// ## When This Occurs
    /// - A `custom` schedule with a missing or unparseable cron expression
    /// - A malformed `time` value (not HH:mm)
    /// - A day-of-week or day-of-month outside its valid range
    ///
    /// ## Contract
    /// The report stays persisted but holds no live trigger, and the
    /// condition is logged - never silently ignored.
    #[error("Schedule cannot be compiled: {reason}")]
    Unschedulable { reason: String },

    /// A report type string did not match any known report.
    ///
    /// ## When This Occurs
    /// - A persisted row carries a report type this build does not know
    ///
    /// This is a configuration defect, not a transient failure: the run
    /// ends without export or notification.
    #[error("Unknown report type: '{0}'")]
    UnknownReportType(String),

    /// A schedule type string did not match daily/weekly/monthly/custom.
    #[error("Unknown schedule type: '{0}'")]
    UnknownScheduleType(String),

    /// An export format string did not match csv/spreadsheet/document.
    #[error("Unknown export format: '{0}'")]
    UnknownExportFormat(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an Unschedulable error from any displayable reason.
    pub fn unschedulable(reason: impl Into<String>) -> Self {
        CoreError::Unschedulable {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Config validation errors.
///
/// These occur when a schedule or date-range config blob doesn't meet the
/// per-variant requirements. Used at the repository boundary, before any
/// untyped data reaches the pipeline.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., bad HH:mm time, bad cron expression).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A fixed date range whose end precedes its start.
    #[error("end_date {end} is before start_date {start}")]
    EndBeforeStart { start: String, end: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::unschedulable("custom schedule has no cron expression");
        assert_eq!(
            err.to_string(),
            "Schedule cannot be compiled: custom schedule has no cron expression"
        );

        let err = CoreError::UnknownReportType("margins".to_string());
        assert_eq!(err.to_string(), "Unknown report type: 'margins'");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "cron_expression".to_string(),
        };
        assert_eq!(err.to_string(), "cron_expression is required");

        let err = ValidationError::OutOfRange {
            field: "day_of_week".to_string(),
            min: 0,
            max: 6,
        };
        assert_eq!(err.to_string(), "day_of_week must be between 0 and 6");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "start_date".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
