//! # till-core: Pure Scheduling Logic for Till Reports
//!
//! This crate is the **heart** of the recurring report scheduler. It contains
//! every pure calculation the engine depends on, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Till Reports Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                till-scheduler (Engine Layer)                    │   │
//! │  │    Registry ──► Triggers ──► Execution Pipeline ──► Export     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ till-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │recurrence │  │ daterange │  │  nextrun  │  │    csv    │  │   │
//! │  │   │ compile() │  │ resolve() │  │ next_run()│  │  render() │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  │           SQLite queries, migrations, report repository         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (ScheduledReport, ReportAggregate, etc.)
//! - [`error`] - Domain error types
//! - [`recurrence`] - Recurrence Compiler: schedule config -> RecurrenceSpec
//! - [`daterange`] - Date Range Resolver: config + today -> concrete window
//! - [`nextrun`] - Next-Run Calculator: schedule config + now -> next instant
//! - [`csv`] - CSV text layout for report aggregates
//! - [`validation`] - Structured config validation (repository boundary)
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every calculator takes "now"/"today" as a parameter
//! 2. **No I/O**: database, network, file system, and clocks are FORBIDDEN here
//! 3. **Integer Money**: monetary values are cents (i64), never floats
//! 4. **Explicit Errors**: malformed schedules become a typed `Unschedulable`
//!    result, never a panic - callers log and continue

// =============================================================================
// Module Declarations
// =============================================================================

pub mod csv;
pub mod daterange;
pub mod error;
pub mod nextrun;
pub mod recurrence;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use till_core::ScheduledReport` instead of
// `use till_core::types::ScheduledReport`

pub use error::{CoreError, CoreResult, ValidationError};
pub use recurrence::RecurrenceSpec;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default fire time for schedules that do not configure one (HH:mm).
///
/// ## Why 09:00?
/// Reports are meant to land before the store opens; 9am local is the
/// conventional "morning report" slot carried over from the settings UI.
pub const DEFAULT_RUN_TIME: &str = "09:00";

/// Default day of week for weekly schedules (0 = Sunday .. 6 = Saturday).
/// 1 = Monday, so a bare weekly schedule produces a Monday-morning report.
pub const DEFAULT_DAY_OF_WEEK: u8 = 1;

/// Default day of month for monthly schedules (1-31).
pub const DEFAULT_DAY_OF_MONTH: u8 = 1;

/// Maximum length of a report display name.
pub const MAX_REPORT_NAME_LEN: usize = 120;
