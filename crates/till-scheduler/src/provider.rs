//! # Report Data Provider
//!
//! The seam between the scheduler and whatever answers report queries.
//! The pipeline only needs "give me the aggregate for this type over this
//! window"; the host wires in a provider backed by its transaction store.

use async_trait::async_trait;
use thiserror::Error;

use till_core::{
    DateRange, FinancialSummary, InventorySummary, ProductSummary, PurchaseSummary,
    ReportAggregate, ReportType, SalesSummary, SupplierSummary,
};

/// Errors a data provider can report back to the pipeline.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider has no query for this report type. Treated as a
    /// config defect by the pipeline, not a transient failure.
    #[error("Unsupported report type: {0}")]
    UnsupportedReportType(ReportType),

    /// The underlying query failed.
    #[error("Report query failed: {0}")]
    QueryFailed(String),

    /// The backing store is unreachable.
    #[error("Data source unavailable: {0}")]
    Unavailable(String),
}

/// Produces the typed aggregate for a report type over a resolved window.
#[async_trait]
pub trait ReportDataProvider: Send + Sync {
    async fn fetch(
        &self,
        report_type: ReportType,
        range: &DateRange,
    ) -> Result<ReportAggregate, ProviderError>;
}

/// Provider returning empty aggregates for every type (for testing and
/// for hosts that wire real queries incrementally).
pub struct EmptyDataProvider;

#[async_trait]
impl ReportDataProvider for EmptyDataProvider {
    async fn fetch(
        &self,
        report_type: ReportType,
        _range: &DateRange,
    ) -> Result<ReportAggregate, ProviderError> {
        Ok(match report_type {
            ReportType::Sales => ReportAggregate::Sales(SalesSummary::default()),
            ReportType::Inventory => ReportAggregate::Inventory(InventorySummary::default()),
            ReportType::Financial => ReportAggregate::Financial(FinancialSummary::default()),
            ReportType::Product => ReportAggregate::Product(ProductSummary::default()),
            ReportType::Purchase => ReportAggregate::Purchase(PurchaseSummary::default()),
            ReportType::Supplier => ReportAggregate::Supplier(SupplierSummary::default()),
        })
    }
}
