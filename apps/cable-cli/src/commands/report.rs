//! # Report Commands
//!
//! Read-only views. The store answers with empty results when a report
//! query fails, so these commands only fail on bad arguments.

use chrono::NaiveDate;
use clap::Subcommand;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use cable_core::{DocumentKind, StockKind};
use cable_db::Database;

use super::{to_json, CommandResult};
use crate::config::CliConfig;
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Stock on hand with cost, by kind (raw or production)
    Stock { kind: StockKind },

    /// Items at or below a quantity threshold
    LowStock {
        kind: StockKind,
        #[arg(long, default_value_t = 10)]
        threshold: i64,
    },

    /// Documents of one kind in a date range
    Invoices {
        kind: DocumentKind,
        from: NaiveDate,
        to: NaiveDate,
    },

    /// One document with lines, by invoice number
    Invoice { kind: DocumentKind, number: String },

    /// Revenue, returns, cost of goods and gross profit
    Profit { from: NaiveDate, to: NaiveDate },

    /// Count and totals per document kind
    Summary { from: NaiveDate, to: NaiveDate },

    /// Quantity and revenue sold per brand
    BrandSales { from: NaiveDate, to: NaiveDate },
}

pub async fn run(db: &Database, config: &CliConfig, command: ReportCommand) -> CommandResult<serde_json::Value> {
    debug!(?command, "report command");
    let reports = db.reports();

    match command {
        ReportCommand::Stock { kind } => to_json(&reports.stock_listing(kind).await),
        ReportCommand::LowStock { kind, threshold } => to_json(&reports.low_stock(kind, threshold).await),
        ReportCommand::Invoices { kind, from, to } => {
            check_range(from, to)?;
            to_json(&reports.invoices(kind, from, to).await)
        }
        ReportCommand::Invoice { kind, number } => {
            let header = db
                .ledger()
                .invoice_by_number(kind, &number)
                .await?
                .ok_or_else(|| ApiError::not_found(kind.label(), &number))?;
            let detail = reports
                .invoice_detail(kind, &header.id)
                .await
                .ok_or_else(|| ApiError::not_found(kind.label(), &number))?;
            to_json(&detail)
        }
        ReportCommand::Profit { from, to } => {
            check_range(from, to)?;
            let profit = reports.profit_report(from, to).await;
            to_json(&Displayed {
                display: json!({
                    "revenue": config.format_currency(profit.revenue_cents),
                    "returns": config.format_currency(profit.returns_cents),
                    "grossProfit": config.format_currency(profit.gross_profit_cents),
                }),
                report: profit,
            })
        }
        ReportCommand::Summary { from, to } => {
            check_range(from, to)?;
            to_json(&reports.summary_report(from, to).await)
        }
        ReportCommand::BrandSales { from, to } => {
            check_range(from, to)?;
            to_json(&reports.brand_sales(from, to).await)
        }
    }
}

/// A report plus operator-facing formatted amounts.
#[derive(Serialize)]
struct Displayed<T: Serialize> {
    #[serde(flatten)]
    report: T,
    display: serde_json::Value,
}

fn check_range(from: NaiveDate, to: NaiveDate) -> CommandResult<()> {
    if from > to {
        return Err(ApiError::validation(format!("date range is reversed: {} > {}", from, to)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cable_core::{InvoiceDraft, LineDraft, NewParty, PartyRef, ProductionDraft, StockRef};
    use cable_db::DbConfig;
    use crate::error::ErrorCode;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn config() -> CliConfig {
        CliConfig::from_lookup(|key| (key == "CABLE_DB_PATH").then(|| ":memory:".to_string())).unwrap()
    }

    async fn traded() -> Database {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let maker = catalog.add_manufacturer("Fast Cables Ltd", None).await.unwrap();
        catalog.add_brand("Fast", &maker).await.unwrap();
        catalog.add_customer(&NewParty::named("Ali Traders")).await.unwrap();

        let wire = || StockRef::named("House Wire", "Fast");
        db.ledger()
            .create_production_invoice(&ProductionDraft::new(date(1)).with_output(LineDraft::new(wire(), 10, 1500)))
            .await
            .unwrap();
        db.ledger()
            .create_sales_invoice(
                &InvoiceDraft::new(date(2))
                    .with_counterparty(PartyRef::name("Ali Traders"))
                    .with_line(LineDraft::new(wire(), 4, 2500)),
            )
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_profit_with_display() {
        let db = traded().await;
        let value = run(&db, &config(), ReportCommand::Profit { from: date(1), to: date(31) })
            .await
            .unwrap();
        assert_eq!(value["revenue_cents"], 10_000);
        assert_eq!(value["gross_profit_cents"], 10_000 - 6_000);
        assert_eq!(value["display"]["revenue"], "Rs 100.00");
    }

    #[tokio::test]
    async fn test_invoice_by_number() {
        let db = traded().await;
        let value = run(
            &db,
            &config(),
            ReportCommand::Invoice {
                kind: DocumentKind::Sales,
                number: "SIN-000001".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(value["counterparty"], "Ali Traders");
        assert_eq!(value["lines"][0]["quantity"], 4);

        let err = run(
            &db,
            &config(),
            ReportCommand::Invoice {
                kind: DocumentKind::Sales,
                number: "SIN-000002".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_reversed_range_rejected() {
        let db = traded().await;
        let err = run(&db, &config(), ReportCommand::Summary { from: date(9), to: date(1) })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
