//! # CSV Layout
//!
//! Renders a [`ReportAggregate`] into CSV text: a small header block, a
//! summary section of metric/value pairs, then one breakdown table per
//! aggregate shape. This is the native export format and the fallback when
//! a document renderer is unavailable.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Report,Weekly Sales                                                    │
//! │  Period,2024-03-08 to 2024-03-15                                        │
//! │                                                                         │
//! │  Metric,Value                                                           │
//! │  Total Sales,1234.50                                                    │
//! │  ...                                                                    │
//! │                                                                         │
//! │  SKU,Product,Quantity Sold,Revenue          <- per-type breakdown       │
//! │  ...                                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fields containing a comma, double quote, or newline are wrapped in
//! double quotes with embedded quotes doubled. Money columns are rendered
//! as decimal units with two places (cents / 100).

use crate::types::{DateRange, ReportAggregate};

/// Escapes a single CSV field.
///
/// Plain fields pass through untouched; a field containing `,`, `"`, or a
/// newline is quote-wrapped with inner quotes doubled.
pub fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Formats a cent amount as decimal units with two places.
pub fn fmt_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

fn row(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders a full report document.
pub fn render(name: &str, range: &DateRange, aggregate: &ReportAggregate) -> String {
    let mut lines = Vec::new();
    lines.push(row(&["Report", name]));
    lines.push(row(&["Period", &range.label()]));
    lines.push(String::new());

    match aggregate {
        ReportAggregate::Sales(s) => {
            lines.push(row(&["Metric", "Value"]));
            lines.push(row(&["Total Sales", &fmt_cents(s.total_sales_cents)]));
            lines.push(row(&["Transactions", &s.transaction_count.to_string()]));
            lines.push(row(&["Average Sale", &fmt_cents(s.average_sale_cents)]));

            if !s.top_products.is_empty() {
                lines.push(String::new());
                lines.push(row(&["SKU", "Product", "Quantity Sold", "Revenue"]));
                for p in &s.top_products {
                    lines.push(row(&[
                        &p.sku,
                        &p.name,
                        &p.quantity_sold.to_string(),
                        &fmt_cents(p.revenue_cents),
                    ]));
                }
            }
        }

        ReportAggregate::Inventory(inv) => {
            lines.push(row(&["Metric", "Value"]));
            lines.push(row(&["Total Products", &inv.total_products.to_string()]));
            lines.push(row(&[
                "Stock Value",
                &fmt_cents(inv.total_stock_value_cents),
            ]));
            lines.push(row(&["Out of Stock", &inv.out_of_stock_count.to_string()]));

            if !inv.low_stock.is_empty() {
                lines.push(String::new());
                lines.push(row(&["SKU", "Product", "Quantity", "Reorder Level"]));
                for line in &inv.low_stock {
                    lines.push(row(&[
                        &line.sku,
                        &line.name,
                        &line.quantity.to_string(),
                        &line.reorder_level.to_string(),
                    ]));
                }
            }
        }

        ReportAggregate::Financial(fin) => {
            lines.push(row(&["Metric", "Value"]));
            lines.push(row(&["Revenue", &fmt_cents(fin.revenue_cents)]));
            lines.push(row(&["Cost", &fmt_cents(fin.cost_cents)]));
            lines.push(row(&["Gross Profit", &fmt_cents(fin.gross_profit_cents)]));
            lines.push(row(&["Tax Collected", &fmt_cents(fin.tax_collected_cents)]));

            if !fin.payments.is_empty() {
                lines.push(String::new());
                lines.push(row(&["Payment Method", "Amount", "Count"]));
                for p in &fin.payments {
                    lines.push(row(&[
                        &p.method,
                        &fmt_cents(p.amount_cents),
                        &p.count.to_string(),
                    ]));
                }
            }
        }

        ReportAggregate::Product(prod) => {
            lines.push(row(&["Metric", "Value"]));
            lines.push(row(&["Active Products", &prod.active_products.to_string()]));

            if !prod.products.is_empty() {
                lines.push(String::new());
                lines.push(row(&["SKU", "Product", "Units Sold", "Revenue"]));
                for p in &prod.products {
                    lines.push(row(&[
                        &p.sku,
                        &p.name,
                        &p.units_sold.to_string(),
                        &fmt_cents(p.revenue_cents),
                    ]));
                }
            }
        }

        ReportAggregate::Purchase(pur) => {
            lines.push(row(&["Metric", "Value"]));
            lines.push(row(&[
                "Total Purchases",
                &fmt_cents(pur.total_purchases_cents),
            ]));
            lines.push(row(&["Orders", &pur.order_count.to_string()]));

            if !pur.by_supplier.is_empty() {
                lines.push(String::new());
                lines.push(row(&["Supplier", "Amount", "Orders"]));
                for s in &pur.by_supplier {
                    lines.push(row(&[
                        &s.supplier,
                        &fmt_cents(s.amount_cents),
                        &s.order_count.to_string(),
                    ]));
                }
            }
        }

        ReportAggregate::Supplier(sup) => {
            lines.push(row(&["Metric", "Value"]));
            lines.push(row(&["Suppliers", &sup.supplier_count.to_string()]));

            if !sup.suppliers.is_empty() {
                lines.push(String::new());
                lines.push(row(&["Supplier", "Outstanding", "Last Order"]));
                for s in &sup.suppliers {
                    let last_order = s
                        .last_order_date
                        .map(|d| d.to_string())
                        .unwrap_or_default();
                    lines.push(row(&[
                        &s.name,
                        &fmt_cents(s.outstanding_cents),
                        &last_order,
                    ]));
                }
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProductSalesLine, SalesSummary};
    use chrono::NaiveDate;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,\"b\""), "\"a,\"\"b\"\"\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_field("no quotes needed"), "no quotes needed");
    }

    #[test]
    fn test_fmt_cents() {
        assert_eq!(fmt_cents(123450), "1234.50");
        assert_eq!(fmt_cents(5), "0.05");
        assert_eq!(fmt_cents(0), "0.00");
        assert_eq!(fmt_cents(-1999), "-19.99");
    }

    #[test]
    fn test_sales_layout() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        );
        let aggregate = ReportAggregate::Sales(SalesSummary {
            total_sales_cents: 123450,
            transaction_count: 42,
            average_sale_cents: 2939,
            top_products: vec![ProductSalesLine {
                sku: "SKU-1".to_string(),
                name: "Beans, baked \"premium\"".to_string(),
                quantity_sold: 12,
                revenue_cents: 3600,
            }],
        });

        let csv = render("Weekly Sales", &range, &aggregate);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Report,Weekly Sales");
        assert_eq!(lines[1], "Period,2024-03-08 to 2024-03-15");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "Metric,Value");
        assert_eq!(lines[4], "Total Sales,1234.50");
        // Product name with comma and quotes gets wrapped and doubled
        assert!(lines
            .iter()
            .any(|l| l.contains("\"Beans, baked \"\"premium\"\"\"")));
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_empty_breakdown_omits_table() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        );
        let aggregate = ReportAggregate::Sales(SalesSummary::default());
        let csv = render("Empty", &range, &aggregate);
        assert!(!csv.contains("SKU"));
    }
}
