//! # Domain Types
//!
//! Core domain types for the recurring report scheduler.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │ ScheduledReport  │   │  ScheduleConfig  │   │ DateRangeConfig  │    │
//! │  │  ──────────────  │   │  ──────────────  │   │  ──────────────  │    │
//! │  │  id (UUID)       │   │  time "HH:mm"    │   │  start_date      │    │
//! │  │  report_type     │   │  day_of_week     │   │  end_date        │    │
//! │  │  schedule_type   │   │  day_of_month    │   │  relative_type   │    │
//! │  │  export_format   │   │  cron_expression │   └──────────────────┘    │
//! │  │  is_active       │   └──────────────────┘                           │
//! │  │  next_run_at     │                                                  │
//! │  └──────────────────┘   ┌──────────────────┐   ┌──────────────────┐    │
//! │                         │    DateRange     │   │ ReportAggregate  │    │
//! │                         │  [start, end]    │   │  one shape per   │    │
//! │                         │  date-granular   │   │  report type     │    │
//! │                         └──────────────────┘   └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Config Blob Pattern
//! `schedule_config` and `date_range_config` are persisted as JSON blobs.
//! They deserialize into the typed structs below *at the repository
//! boundary*, with per-variant validation - untyped maps never travel
//! through the pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_DAY_OF_MONTH, DEFAULT_DAY_OF_WEEK, DEFAULT_RUN_TIME};

// =============================================================================
// Report Type
// =============================================================================

/// The kind of report a schedule produces.
///
/// Each type maps to one aggregate shape from the report-data provider
/// (see [`ReportAggregate`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    /// Sales totals, transaction counts, top products.
    Sales,
    /// Stock levels, valuation, low/out-of-stock lists.
    Inventory,
    /// Revenue, cost, profit, tax, payment method breakdown.
    Financial,
    /// Per-product performance over the window.
    Product,
    /// Purchase orders and supplier spend.
    Purchase,
    /// Supplier balances and activity.
    Supplier,
}

impl ReportType {
    /// All known report types, in display order.
    pub const ALL: [ReportType; 6] = [
        ReportType::Sales,
        ReportType::Inventory,
        ReportType::Financial,
        ReportType::Product,
        ReportType::Purchase,
        ReportType::Supplier,
    ];
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportType::Sales => write!(f, "sales"),
            ReportType::Inventory => write!(f, "inventory"),
            ReportType::Financial => write!(f, "financial"),
            ReportType::Product => write!(f, "product"),
            ReportType::Purchase => write!(f, "purchase"),
            ReportType::Supplier => write!(f, "supplier"),
        }
    }
}

impl std::str::FromStr for ReportType {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sales" => Ok(ReportType::Sales),
            "inventory" => Ok(ReportType::Inventory),
            "financial" => Ok(ReportType::Financial),
            "product" => Ok(ReportType::Product),
            "purchase" => Ok(ReportType::Purchase),
            "supplier" => Ok(ReportType::Supplier),
            other => Err(crate::CoreError::UnknownReportType(other.to_string())),
        }
    }
}

// =============================================================================
// Schedule Type
// =============================================================================

/// The recurrence family of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    /// Once per day at `time`.
    Daily,
    /// Once per week on `day_of_week` at `time`.
    Weekly,
    /// Once per month on `day_of_month` at `time`.
    Monthly,
    /// Per the caller-supplied cron expression, verbatim.
    Custom,
}

impl std::fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleType::Daily => write!(f, "daily"),
            ScheduleType::Weekly => write!(f, "weekly"),
            ScheduleType::Monthly => write!(f, "monthly"),
            ScheduleType::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for ScheduleType {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(ScheduleType::Daily),
            "weekly" => Ok(ScheduleType::Weekly),
            "monthly" => Ok(ScheduleType::Monthly),
            "custom" => Ok(ScheduleType::Custom),
            other => Err(crate::CoreError::UnknownScheduleType(other.to_string())),
        }
    }
}

// =============================================================================
// Schedule Config
// =============================================================================

/// Structured recurrence parameters.
///
/// Only the fields relevant to the schedule type are consulted:
/// `time` for all built-in types, `day_of_week` for weekly, `day_of_month`
/// for monthly, and `cron_expression` for custom. Absent fields take the
/// crate-level defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Fire time in local HH:mm (default "09:00").
    #[serde(default = "default_run_time")]
    pub time: String,

    /// Day of week, 0 = Sunday .. 6 = Saturday (default 1 = Monday).
    /// Only consulted for weekly schedules.
    #[serde(default = "default_day_of_week")]
    pub day_of_week: u8,

    /// Day of month, 1-31 (default 1). Only consulted for monthly
    /// schedules. Days past the end of a month clamp to its last day.
    #[serde(default = "default_day_of_month")]
    pub day_of_month: u8,

    /// Raw cron expression. Only consulted for custom schedules; a custom
    /// schedule without a parseable expression is unschedulable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
}

fn default_run_time() -> String {
    DEFAULT_RUN_TIME.to_string()
}

fn default_day_of_week() -> u8 {
    DEFAULT_DAY_OF_WEEK
}

fn default_day_of_month() -> u8 {
    DEFAULT_DAY_OF_MONTH
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            time: default_run_time(),
            day_of_week: default_day_of_week(),
            day_of_month: default_day_of_month(),
            cron_expression: None,
        }
    }
}

// =============================================================================
// Date Range
// =============================================================================

/// How a report's date window is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DateRangeType {
    /// Explicit start/end dates.
    Fixed,
    /// A window computed relative to "today" at fire time.
    Relative,
}

impl std::fmt::Display for DateRangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateRangeType::Fixed => write!(f, "fixed"),
            DateRangeType::Relative => write!(f, "relative"),
        }
    }
}

impl std::str::FromStr for DateRangeType {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(DateRangeType::Fixed),
            "relative" => Ok(DateRangeType::Relative),
            other => Err(crate::CoreError::Validation(
                crate::ValidationError::InvalidFormat {
                    field: "date_range_type".to_string(),
                    reason: format!("'{}' is not fixed or relative", other),
                },
            )),
        }
    }
}

/// Named relative windows, all anchored at today (local midnight).
///
/// An unknown value in a persisted blob deserializes as `Last30Days`
/// so stale rows stay runnable (hand-written serde impls below).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelativeRange {
    Last7Days,
    #[default]
    Last30Days,
    Last90Days,
    ThisMonth,
    LastMonth,
    ThisYear,
}

impl RelativeRange {
    /// Wire name, matching the settings UI's stored values.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelativeRange::Last7Days => "last7days",
            RelativeRange::Last30Days => "last30days",
            RelativeRange::Last90Days => "last90days",
            RelativeRange::ThisMonth => "thisMonth",
            RelativeRange::LastMonth => "lastMonth",
            RelativeRange::ThisYear => "thisYear",
        }
    }

    /// Parses a wire name; anything unknown becomes `Last30Days`.
    pub fn from_name(s: &str) -> Self {
        match s {
            "last7days" => RelativeRange::Last7Days,
            "last30days" => RelativeRange::Last30Days,
            "last90days" => RelativeRange::Last90Days,
            "thisMonth" => RelativeRange::ThisMonth,
            "lastMonth" => RelativeRange::LastMonth,
            "thisYear" => RelativeRange::ThisYear,
            _ => RelativeRange::Last30Days,
        }
    }
}

impl Serialize for RelativeRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RelativeRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(RelativeRange::from_name(&s))
    }
}

/// Date window parameters.
///
/// For `fixed` ranges both dates are expected; a missing bound falls back
/// to "today" at resolve time. For `relative` ranges only `relative_type`
/// is consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeConfig {
    /// Fixed range start (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Fixed range end (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Relative window name (default last30days when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_type: Option<RelativeRange>,
}

/// A concrete, resolved date window. Both bounds are date-granularity
/// (time-of-day truncated to local midnight) and `end >= start` holds for
/// every resolver branch by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Compact label used in log lines and file content headers.
    pub fn label(&self) -> String {
        format!("{} to {}", self.start, self.end)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

// =============================================================================
// Export Format
// =============================================================================

/// The document format a report is exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Plain comma-separated text, laid out by till-core itself.
    Csv,
    /// Spreadsheet bytes, produced by an external renderer.
    Spreadsheet,
    /// Document (e.g., PDF) bytes, produced by an external renderer.
    /// Falls back to CSV if the renderer fails.
    Document,
}

impl ExportFormat {
    /// File extension for the produced artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Spreadsheet => "xlsx",
            ExportFormat::Document => "pdf",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Spreadsheet => write!(f, "spreadsheet"),
            ExportFormat::Document => write!(f, "document"),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "spreadsheet" | "xlsx" | "excel" => Ok(ExportFormat::Spreadsheet),
            "document" | "pdf" => Ok(ExportFormat::Document),
            other => Err(crate::CoreError::UnknownExportFormat(other.to_string())),
        }
    }
}

// =============================================================================
// Scheduled Report
// =============================================================================

/// A persisted report schedule.
///
/// ## Lifecycle
/// ```text
/// create (is_active=true, next_run_at computed)
///    │
///    ▼
/// update schedule fields ──► registry atomically replaces the trigger
///    │
///    ▼
/// each run ──► last_run_at = now, next_run_at recomputed
///    │
///    ▼
/// delete ──► trigger stopped and removed before the row goes away
/// ```
///
/// ## Invariants
/// - At most one live trigger exists per id, zero when `is_active` is false
/// - `next_run_at` is either None (inactive/unschedulable) or strictly in
///   the future relative to the last computation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledReport {
    /// Unique identifier (UUID v4), stable for the report's lifetime.
    pub id: String,

    /// Display label; also derives exported file names.
    pub name: String,

    /// What data the report aggregates.
    pub report_type: ReportType,

    /// Recurrence family.
    pub schedule_type: ScheduleType,

    /// Structured recurrence parameters.
    pub schedule_config: ScheduleConfig,

    /// How the date window is declared.
    pub date_range_type: DateRangeType,

    /// Date window parameters.
    pub date_range_config: DateRangeConfig,

    /// Export format for produced files.
    pub export_format: ExportFormat,

    /// Optional override directory; None means the configured reports folder.
    pub export_path: Option<String>,

    /// Whether this report holds a live trigger.
    pub is_active: bool,

    /// Instant of the last successful run.
    pub last_run_at: Option<DateTime<Utc>>,

    /// Projected next fire instant.
    pub next_run_at: Option<DateTime<Utc>>,

    /// Owning user.
    pub created_by_id: String,

    /// Row creation time.
    pub created_at: DateTime<Utc>,

    /// Last row update time.
    pub updated_at: DateTime<Utc>,
}

impl ScheduledReport {
    /// The report name with every non-alphanumeric character replaced by
    /// `_`, safe to embed in an exported file name.
    pub fn sanitized_name(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

// =============================================================================
// Report Aggregates
// =============================================================================
// One typed shape per report type. These are produced by the external
// report-data provider and consumed by the export pipeline; this crate
// only needs them to be passable and layout-able as CSV.

/// The typed result of running a report query for a given type and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "report_type", rename_all = "snake_case")]
pub enum ReportAggregate {
    Sales(SalesSummary),
    Inventory(InventorySummary),
    Financial(FinancialSummary),
    Product(ProductSummary),
    Purchase(PurchaseSummary),
    Supplier(SupplierSummary),
}

impl ReportAggregate {
    /// The report type this aggregate belongs to.
    pub fn report_type(&self) -> ReportType {
        match self {
            ReportAggregate::Sales(_) => ReportType::Sales,
            ReportAggregate::Inventory(_) => ReportType::Inventory,
            ReportAggregate::Financial(_) => ReportType::Financial,
            ReportAggregate::Product(_) => ReportType::Product,
            ReportAggregate::Purchase(_) => ReportType::Purchase,
            ReportAggregate::Supplier(_) => ReportType::Supplier,
        }
    }
}

/// Sales report aggregate: totals plus a top-products breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_sales_cents: i64,
    pub transaction_count: i64,
    pub average_sale_cents: i64,
    pub top_products: Vec<ProductSalesLine>,
}

/// One product's sales over the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSalesLine {
    pub sku: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

/// Inventory report aggregate: valuation plus low-stock lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_products: i64,
    pub total_stock_value_cents: i64,
    pub out_of_stock_count: i64,
    pub low_stock: Vec<StockLine>,
}

/// One product's stock position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLine {
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub reorder_level: i64,
}

/// Financial report aggregate: profit and payment method breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub revenue_cents: i64,
    pub cost_cents: i64,
    pub gross_profit_cents: i64,
    pub tax_collected_cents: i64,
    pub payments: Vec<PaymentBreakdownLine>,
}

/// Amount taken through one payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentBreakdownLine {
    pub method: String,
    pub amount_cents: i64,
    pub count: i64,
}

/// Product performance report aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub active_products: i64,
    pub products: Vec<ProductPerformanceLine>,
}

/// One product's performance over the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPerformanceLine {
    pub sku: String,
    pub name: String,
    pub units_sold: i64,
    pub revenue_cents: i64,
}

/// Purchase report aggregate: order totals and supplier spend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseSummary {
    pub total_purchases_cents: i64,
    pub order_count: i64,
    pub by_supplier: Vec<SupplierSpendLine>,
}

/// Spend routed through one supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierSpendLine {
    pub supplier: String,
    pub amount_cents: i64,
    pub order_count: i64,
}

/// Supplier report aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierSummary {
    pub supplier_count: i64,
    pub suppliers: Vec<SupplierLine>,
}

/// One supplier's balance and activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierLine {
    pub name: String,
    pub outstanding_cents: i64,
    pub last_order_date: Option<NaiveDate>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_roundtrip() {
        for rt in ReportType::ALL {
            let parsed: ReportType = rt.to_string().parse().unwrap();
            assert_eq!(parsed, rt);
        }
        assert!("margins".parse::<ReportType>().is_err());
    }

    #[test]
    fn test_schedule_type_parsing() {
        assert_eq!("daily".parse::<ScheduleType>().unwrap(), ScheduleType::Daily);
        assert_eq!("WEEKLY".parse::<ScheduleType>().unwrap(), ScheduleType::Weekly);
        assert!("fortnightly".parse::<ScheduleType>().is_err());
    }

    #[test]
    fn test_schedule_config_defaults() {
        let config: ScheduleConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.time, "09:00");
        assert_eq!(config.day_of_week, 1);
        assert_eq!(config.day_of_month, 1);
        assert!(config.cron_expression.is_none());
    }

    #[test]
    fn test_relative_range_unknown_defaults_to_last30days() {
        let config: DateRangeConfig =
            serde_json::from_str(r#"{"relative_type": "lastDecade"}"#).unwrap();
        assert_eq!(config.relative_type, Some(RelativeRange::Last30Days));

        let config: DateRangeConfig =
            serde_json::from_str(r#"{"relative_type": "thisMonth"}"#).unwrap();
        assert_eq!(config.relative_type, Some(RelativeRange::ThisMonth));
    }

    #[test]
    fn test_sanitized_name() {
        let mut report = sample_report();
        report.name = "Weekly Sales (EU) #3".to_string();
        assert_eq!(report.sanitized_name(), "Weekly_Sales__EU___3");
    }

    #[test]
    fn test_export_format_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Spreadsheet.extension(), "xlsx");
        assert_eq!(ExportFormat::Document.extension(), "pdf");
    }

    fn sample_report() -> ScheduledReport {
        ScheduledReport {
            id: "r-1".to_string(),
            name: "Sample".to_string(),
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
            created_by_id: "u-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
