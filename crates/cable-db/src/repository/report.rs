//! # Report Repository
//!
//! Read-only listings and summaries over the ledger.
//!
//! Reports never fail the caller. A query error is logged with `error!`
//! and the method returns an empty list, `None`, or a zeroed report, so a
//! broken report screen cannot take down posting.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, error};

use cable_core::{DocumentKind, InvoiceHeader, StockKind};

use crate::error::DbResult;
use crate::repository::ledger::fetch_header;

// =============================================================================
// Report Rows
// =============================================================================

/// One row of the stock valuation view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StockRow {
    pub stock_kind: String,
    pub stock_id: String,
    pub item: String,
    pub brand: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub total_cost_cents: i64,
    pub sale_price_cents: Option<i64>,
}

/// Header-level listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct InvoiceSummary {
    pub id: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub counterparty: Option<String>,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub paid_cents: i64,
    pub line_count: i64,
}

/// A line joined with its item and brand names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DetailLine {
    pub stock_id: String,
    pub item: String,
    pub brand: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub unit_cost_cents: i64,
}

/// Everything needed to print one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceDetail {
    pub kind: DocumentKind,
    pub header: InvoiceHeader,
    pub counterparty: Option<String>,
    pub original_invoice_number: Option<String>,
    pub lines: Vec<DetailLine>,
    /// Raw materials consumed; only production runs have these.
    pub materials: Vec<DetailLine>,
}

/// Sales profitability over a date range.
///
/// ```text
/// gross profit = revenue - discounts - returns
///              - (cost of goods sold - cost of goods returned)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfitReport {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub revenue_cents: i64,
    pub discount_cents: i64,
    pub returns_cents: i64,
    pub cost_of_goods_sold_cents: i64,
    pub cost_of_goods_returned_cents: i64,
    pub gross_profit_cents: i64,
}

/// Totals for one document kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub kind: DocumentKind,
    pub prefix: &'static str,
    pub count: i64,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub paid_cents: i64,
}

/// Quantity and revenue sold per brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BrandSales {
    pub brand_id: String,
    pub brand: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for read-only reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Current quantities and valuation of one stock family, by item name.
    pub async fn stock_listing(&self, kind: StockKind) -> Vec<StockRow> {
        let result = sqlx::query_as(
            r#"
            SELECT stock_kind, stock_id, item, brand, category, unit, quantity,
                   unit_cost_cents, total_cost_cents, sale_price_cents
            FROM v_stock_valuation
            WHERE stock_kind = ?1
            ORDER BY item, brand
            "#,
        )
        .bind(kind.key())
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into);
        fail_soft("stock_listing", result)
    }

    /// Items at or below `threshold`.
    pub async fn low_stock(&self, kind: StockKind, threshold: i64) -> Vec<StockRow> {
        let result = sqlx::query_as(
            r#"
            SELECT stock_kind, stock_id, item, brand, category, unit, quantity,
                   unit_cost_cents, total_cost_cents, sale_price_cents
            FROM v_stock_valuation
            WHERE stock_kind = ?1 AND quantity <= ?2
            ORDER BY quantity, item
            "#,
        )
        .bind(kind.key())
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into);
        fail_soft("low_stock", result)
    }

    /// Headers of one kind dated within `[from, to]`, oldest first.
    pub async fn invoices(&self, kind: DocumentKind, from: NaiveDate, to: NaiveDate) -> Vec<InvoiceSummary> {
        let (counterparty, join) = match kind.counterparty() {
            Some(role) => (
                "p.name",
                format!("LEFT JOIN {} p ON p.id = h.{}", role.table(), role.column()),
            ),
            None => ("NULL", String::new()),
        };
        let sql = format!(
            r#"
            SELECT h.id, h.invoice_number, h.invoice_date,
                   {counterparty} AS counterparty,
                   h.total_cents, h.discount_cents, h.paid_cents,
                   (SELECT COUNT(*) FROM {items} i WHERE i.invoice_id = h.id) AS line_count
            FROM {header} h
            {join}
            WHERE h.invoice_date BETWEEN ?1 AND ?2
            ORDER BY h.invoice_date, h.invoice_number
            "#,
            items = kind.item_table(),
            header = kind.header_table(),
        );

        let result = sqlx::query_as(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into);
        fail_soft("invoices", result)
    }

    /// Header and named lines of one document.
    pub async fn invoice_detail(&self, kind: DocumentKind, id: &str) -> Option<InvoiceDetail> {
        fail_soft("invoice_detail", self.load_detail(kind, id).await)
    }

    /// Sales profitability within `[from, to]`.
    pub async fn profit_report(&self, from: NaiveDate, to: NaiveDate) -> ProfitReport {
        fail_soft("profit_report", self.load_profit(from, to).await)
    }

    /// Count and totals per document kind within `[from, to]`.
    ///
    /// Every kind is present, with zeros when nothing was posted.
    pub async fn summary_report(&self, from: NaiveDate, to: NaiveDate) -> Vec<KindSummary> {
        fail_soft("summary_report", self.load_summary(from, to).await)
    }

    /// Sales per brand within `[from, to]`, best-selling first.
    pub async fn brand_sales(&self, from: NaiveDate, to: NaiveDate) -> Vec<BrandSales> {
        let result = sqlx::query_as(
            r#"
            SELECT brand_id, brand,
                   SUM(quantity) AS quantity,
                   SUM(line_total_cents) AS revenue_cents
            FROM v_sales_lines
            WHERE invoice_date BETWEEN ?1 AND ?2
            GROUP BY brand_id, brand
            ORDER BY revenue_cents DESC, brand
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into);
        fail_soft("brand_sales", result)
    }

    // =========================================================================
    // Loaders
    // =========================================================================

    async fn load_detail(&self, kind: DocumentKind, id: &str) -> DbResult<Option<InvoiceDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(header) = fetch_header(&mut conn, kind, id).await? else {
            return Ok(None);
        };

        let counterparty = match (kind.counterparty(), &header.counterparty_id) {
            (Some(role), Some(party_id)) => {
                let sql = format!("SELECT name FROM {} WHERE id = ?1", role.table());
                sqlx::query_scalar(&sql)
                    .bind(party_id)
                    .fetch_optional(&mut *conn)
                    .await?
            }
            _ => None,
        };

        let original_invoice_number = match (kind.returns_against(), &header.original_invoice_id) {
            (Some(against), Some(original_id)) => {
                let sql = format!("SELECT invoice_number FROM {} WHERE id = ?1", against.header_table());
                sqlx::query_scalar(&sql)
                    .bind(original_id)
                    .fetch_optional(&mut *conn)
                    .await?
            }
            _ => None,
        };

        let lines_sql = format!(
            r#"
            SELECT i.stock_id, s.name AS item, b.name AS brand, i.quantity,
                   i.unit_price_cents, i.line_total_cents, i.unit_cost_cents
            FROM {items} i
            JOIN {stock} s ON s.id = i.stock_id
            JOIN brands b ON b.id = s.brand_id
            WHERE i.invoice_id = ?1
            ORDER BY i.rowid
            "#,
            items = kind.item_table(),
            stock = kind.stock_kind().table(),
        );
        let lines: Vec<DetailLine> = sqlx::query_as(&lines_sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

        let materials: Vec<DetailLine> = if kind == DocumentKind::Production {
            sqlx::query_as(
                r#"
                SELECT m.stock_id, r.name AS item, b.name AS brand, m.quantity,
                       0 AS unit_price_cents, m.line_cost_cents AS line_total_cents,
                       m.unit_cost_cents
                FROM production_material_items m
                JOIN raw_stock r ON r.id = m.stock_id
                JOIN brands b ON b.id = r.brand_id
                WHERE m.invoice_id = ?1
                ORDER BY m.rowid
                "#,
            )
            .bind(id)
            .fetch_all(&mut *conn)
            .await?
        } else {
            Vec::new()
        };

        debug!(kind = kind.prefix(), id = %id, lines = lines.len(), "Invoice detail loaded");
        Ok(Some(InvoiceDetail {
            kind,
            header,
            counterparty,
            original_invoice_number,
            lines,
            materials,
        }))
    }

    async fn load_profit(&self, from: NaiveDate, to: NaiveDate) -> DbResult<ProfitReport> {
        let (revenue, cogs): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(i.line_total_cents), 0),
                   COALESCE(SUM(i.quantity * i.unit_cost_cents), 0)
            FROM sales_invoice_items i
            JOIN sales_invoices h ON h.id = i.invoice_id
            WHERE h.invoice_date BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let discount: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(discount_cents), 0) FROM sales_invoices WHERE invoice_date BETWEEN ?1 AND ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let (returns, returned_cost): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(i.line_total_cents), 0),
                   COALESCE(SUM(i.quantity * i.unit_cost_cents), 0)
            FROM sales_return_invoice_items i
            JOIN sales_return_invoices h ON h.id = i.invoice_id
            WHERE h.invoice_date BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProfitReport {
            from: Some(from),
            to: Some(to),
            revenue_cents: revenue,
            discount_cents: discount,
            returns_cents: returns,
            cost_of_goods_sold_cents: cogs,
            cost_of_goods_returned_cents: returned_cost,
            gross_profit_cents: revenue - discount - returns - (cogs - returned_cost),
        })
    }

    async fn load_summary(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<KindSummary>> {
        let mut summary = Vec::with_capacity(DocumentKind::ALL.len());
        for kind in DocumentKind::ALL {
            let sql = format!(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(total_cents), 0),
                       COALESCE(SUM(discount_cents), 0),
                       COALESCE(SUM(paid_cents), 0)
                FROM {}
                WHERE invoice_date BETWEEN ?1 AND ?2
                "#,
                kind.header_table()
            );
            let (count, total, discount, paid): (i64, i64, i64, i64) = sqlx::query_as(&sql)
                .bind(from)
                .bind(to)
                .fetch_one(&self.pool)
                .await?;

            summary.push(KindSummary {
                kind,
                prefix: kind.prefix(),
                count,
                total_cents: total,
                discount_cents: discount,
                paid_cents: paid,
            });
        }
        Ok(summary)
    }
}

/// Logs a failed report and substitutes its empty value.
fn fail_soft<T: Default>(report: &str, result: DbResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!(report = %report, error = %e, "Report query failed");
            T::default()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cable_core::NewStockItem;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[tokio::test]
    async fn test_reports_on_empty_store() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let reports = db.reports();

        assert!(reports.stock_listing(StockKind::Raw).await.is_empty());
        assert!(reports.invoices(DocumentKind::Sales, day(1), day(31)).await.is_empty());
        assert!(reports.invoice_detail(DocumentKind::Sales, "missing").await.is_none());
        assert!(reports.brand_sales(day(1), day(31)).await.is_empty());

        let profit = reports.profit_report(day(1), day(31)).await;
        assert_eq!(profit.gross_profit_cents, 0);

        let summary = reports.summary_report(day(1), day(31)).await;
        assert_eq!(summary.len(), DocumentKind::ALL.len());
        assert!(summary.iter().all(|s| s.count == 0));
    }

    #[tokio::test]
    async fn test_low_stock_threshold() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let maker = db.catalog().add_manufacturer("Fast Group", None).await.unwrap();
        let brand = db.catalog().add_brand("Fast", &maker).await.unwrap();
        db.catalog()
            .add_stock_item(StockKind::Raw, &NewStockItem::new("PVC Granules", &brand))
            .await
            .unwrap();

        let low = db.reports().low_stock(StockKind::Raw, 5).await;
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].item, "PVC Granules");
        assert_eq!(low[0].brand, "Fast");
        assert!(db.reports().low_stock(StockKind::Production, 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_report_is_empty() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        sqlx::query("DROP VIEW v_stock_valuation")
            .execute(db.pool())
            .await
            .unwrap();

        assert!(db.reports().stock_listing(StockKind::Raw).await.is_empty());
    }
}
