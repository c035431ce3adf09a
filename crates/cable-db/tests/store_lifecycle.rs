//! Numbering, settlement and file-backed store behavior.

mod common;

use cable_core::{
    BankTxKind, CashTxKind, DocumentKind, InvoiceDraft, LineDraft, Money, Settlement, StockKind,
};
use cable_db::{schema, Database, DbConfig, DbError};

use common::*;

#[tokio::test]
async fn test_numbering_continues_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cable.db");

    let db = seeded(DbConfig::new(&path)).await;
    for _ in 0..2 {
        db.ledger()
            .create_raw_purchase_invoice(&purchase("Copper 10mm", 5, 100))
            .await
            .unwrap();
    }
    db.disconnect().await;

    let reopened = Database::connect(DbConfig::new(&path)).await.unwrap();
    let third = reopened
        .ledger()
        .create_raw_purchase_invoice(&purchase("Copper 10mm", 5, 100))
        .await
        .unwrap();
    assert_eq!(third.invoice_number, "RPI-000003");
    assert_eq!(stock(&reopened, StockKind::Raw, "Copper 10mm").await.quantity, 15);
}

#[tokio::test]
async fn test_numbering_follows_existing_headers() {
    let db = store().await;
    db.ledger()
        .create_raw_purchase_invoice(&purchase("Copper 10mm", 10, 100))
        .await
        .unwrap();

    // headers written before the counter existed
    for n in 1..=2 {
        sqlx::query(
            r#"
            INSERT INTO raw_use_invoices (id, invoice_number, invoice_date, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(format!("legacy-{}", n))
        .bind(format!("RUI-{:06}", n))
        .bind(date(1))
        .bind(chrono::Utc::now())
        .execute(db.pool())
        .await
        .unwrap();
    }

    let used = InvoiceDraft::new(date(2)).with_line(LineDraft::new(item("Copper 10mm"), 1, 0));
    let posted = db.ledger().create_raw_use_invoice(&used).await.unwrap();
    assert_eq!(posted.invoice_number, "RUI-000003");
}

#[tokio::test]
async fn test_prefixes_count_independently() {
    let db = store().await;
    produce(&db, "House Wire", 10, 15).await;
    produce(&db, "House Wire", 10, 15).await;

    let sold = db
        .ledger()
        .create_sales_invoice(&sale("House Wire", 1, 20))
        .await
        .unwrap();
    assert_eq!(sold.invoice_number, "SIN-000001");

    let header = db
        .ledger()
        .invoice_by_number(DocumentKind::Production, "PRD-000002")
        .await
        .unwrap();
    assert!(header.is_some());
}

#[tokio::test]
async fn test_cash_settlement_recorded_with_invoice() {
    let db = store().await;
    produce(&db, "House Wire", 10, 15).await;

    let posted = db
        .ledger()
        .create_sales_invoice(&sale("House Wire", 5, 100).with_paid(300))
        .await
        .unwrap();

    assert_eq!(db.cashbook().cash_balance().await.unwrap(), Money::from_cents(300));
    let rows = db.cashbook().cash_transactions(date(1), date(31)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, CashTxKind::CashIn);
    assert_eq!(rows[0].invoice_number.as_deref(), Some(posted.invoice_number.as_str()));

    let header = db
        .ledger()
        .invoice(DocumentKind::Sales, &posted.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.balance_due(), Money::from_cents(200));
}

#[tokio::test]
async fn test_bank_settlement_is_signed() {
    let db = store().await;
    let bank = db.catalog().add_bank("Meezan Bank", None, None).await.unwrap();

    let mut draft = purchase("Copper 10mm", 10, 100).with_paid(1000);
    draft.settlement = Settlement::Bank { bank_id: bank.clone() };
    db.ledger().create_raw_purchase_invoice(&draft).await.unwrap();

    assert_eq!(db.cashbook().bank_balance(&bank).await.unwrap(), Money::from_cents(-1000));
    assert_eq!(db.cashbook().cash_balance().await.unwrap(), Money::zero());

    let rows = db.cashbook().bank_transactions(&bank, date(1), date(31)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, BankTxKind::InvoicePayment);
}

#[tokio::test]
async fn test_unknown_bank_rolls_back_document() {
    let db = store().await;

    let mut draft = purchase("Copper 10mm", 10, 100).with_paid(1000);
    draft.settlement = Settlement::Bank {
        bank_id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
    };
    let err = db.ledger().create_raw_purchase_invoice(&draft).await.unwrap_err();

    assert!(matches!(err, DbError::ReferenceNotFound { .. }));
    assert_eq!(row_count(&db, "raw_purchase_invoices").await, 0);
    assert_eq!(row_count(&db, "raw_stock").await, 0);
}

#[tokio::test]
async fn test_schema_init_is_idempotent_on_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cable.db");

    let db = Database::connect(DbConfig::new(&path)).await.unwrap();
    let first = schema::object_names(db.pool()).await.unwrap();
    db.disconnect().await;

    for _ in 0..3 {
        let db = Database::connect(DbConfig::new(&path)).await.unwrap();
        assert_eq!(schema::object_names(db.pool()).await.unwrap(), first);
        db.disconnect().await;
    }
}

#[tokio::test]
async fn test_reports_reflect_postings() {
    let db = store().await;
    produce(&db, "House Wire", 10, 15).await;
    let sold = db
        .ledger()
        .create_sales_invoice(&sale("House Wire", 4, 25))
        .await
        .unwrap();
    db.ledger()
        .create_sales_return_invoice(&sale("House Wire", 1, 25).against(sold.id.clone()))
        .await
        .unwrap();

    let reports = db.reports();
    let listing = reports.stock_listing(StockKind::Production).await;
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].quantity, 7);

    let profit = reports.profit_report(date(1), date(31)).await;
    assert_eq!(profit.revenue_cents, 100);
    assert_eq!(profit.returns_cents, 25);
    assert_eq!(profit.cost_of_goods_sold_cents, 60);
    assert_eq!(profit.cost_of_goods_returned_cents, 15);
    assert_eq!(profit.gross_profit_cents, 100 - 25 - (60 - 15));

    let detail = reports.invoice_detail(DocumentKind::Sales, &sold.id).await.unwrap();
    assert_eq!(detail.counterparty.as_deref(), Some(CUSTOMER));
    assert_eq!(detail.lines[0].item, "House Wire");
    assert_eq!(detail.lines[0].brand, BRAND);

    let invoices = reports.invoices(DocumentKind::Sales, date(1), date(31)).await;
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].line_count, 1);

    let brands = reports.brand_sales(date(1), date(31)).await;
    assert_eq!(brands.len(), 1);
    assert_eq!((brands[0].quantity, brands[0].revenue_cents), (4, 100));

    let summary = reports.summary_report(date(1), date(31)).await;
    let sales = summary.iter().find(|s| s.kind == DocumentKind::Sales).unwrap();
    assert_eq!((sales.count, sales.total_cents), (1, 100));
}
