//! End-to-end posting flows against an in-memory store.

mod common;

use cable_core::{
    CoreError, DocumentKind, InvoiceDraft, LineDraft, MaterialDraft, Money, PartyRef,
    ProductionDraft, StockKind, ValidationError,
};
use cable_db::DbError;

use common::*;

#[tokio::test]
async fn test_purchase_adds_quantity_and_exact_cost() {
    let db = store().await;
    register(&db, StockKind::Raw, "Copper 10mm", 100).await;

    let posted = db
        .ledger()
        .create_raw_purchase_invoice(&purchase("Copper 10mm", 50, 100))
        .await
        .unwrap();
    assert_eq!(posted.invoice_number, "RPI-000001");

    let copper = stock(&db, StockKind::Raw, "Copper 10mm").await;
    assert_eq!(copper.quantity, 50);
    assert_eq!(copper.total_cost_cents, 5000);
    assert_eq!(copper.unit_cost_cents, 100);
    assert!(copper.cost_is_consistent());
}

#[tokio::test]
async fn test_purchase_registers_unknown_item() {
    let db = store().await;
    db.ledger()
        .create_raw_purchase_invoice(&purchase("PVC Granules", 20, 250))
        .await
        .unwrap();

    let pvc = stock(&db, StockKind::Raw, "PVC Granules").await;
    assert_eq!(pvc.quantity, 20);
    assert_eq!(pvc.total_cost_cents, 5000);
}

#[tokio::test]
async fn test_oversold_sale_writes_nothing() {
    let db = store().await;
    produce(&db, "House Wire", 5, 15).await;

    let err = db
        .ledger()
        .create_sales_invoice(&sale("House Wire", 10, 20))
        .await
        .unwrap_err();

    match &err {
        DbError::Core(core @ CoreError::InsufficientStock { available, requested, .. }) => {
            assert_eq!((*available, *requested), (5, 10));
            assert_eq!(core.shortfall(), Some(5));
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    assert_eq!(row_count(&db, "sales_invoices").await, 0);
    assert_eq!(row_count(&db, "sales_invoice_items").await, 0);
    assert_eq!(stock(&db, StockKind::Production, "House Wire").await.quantity, 5);

    // the failed attempt did not burn a number
    let posted = db
        .ledger()
        .create_sales_invoice(&sale("House Wire", 5, 20))
        .await
        .unwrap();
    assert_eq!(posted.invoice_number, "SIN-000001");
}

#[tokio::test]
async fn test_lines_on_same_item_are_checked_together() {
    let db = store().await;
    produce(&db, "House Wire", 5, 15).await;

    let draft = sale("House Wire", 3, 20).with_line(LineDraft::new(item("House Wire"), 3, 20));
    let err = db.ledger().create_sales_invoice(&draft).await.unwrap_err();

    assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { requested: 6, .. })));
    assert_eq!(stock(&db, StockKind::Production, "House Wire").await.quantity, 5);
}

#[tokio::test]
async fn test_sale_then_partial_return() {
    let db = store().await;
    produce(&db, "House Wire", 10, 15).await;

    let sold = db
        .ledger()
        .create_sales_invoice(&sale("House Wire", 3, 20))
        .await
        .unwrap();
    assert_eq!(stock(&db, StockKind::Production, "House Wire").await.quantity, 7);

    let back = sale("House Wire", 1, 20).against(sold.id.clone());
    let returned = db.ledger().create_sales_return_invoice(&back).await.unwrap();
    assert_eq!(returned.invoice_number, "SRI-000001");

    let wire = stock(&db, StockKind::Production, "House Wire").await;
    assert_eq!(wire.quantity, 8);
    assert_eq!(wire.total_cost_cents, 8 * 15);

    let header = db
        .ledger()
        .invoice(DocumentKind::SalesReturn, &returned.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.original_invoice_id, Some(sold.id));
}

#[tokio::test]
async fn test_returns_capped_by_original() {
    let db = store().await;
    produce(&db, "House Wire", 10, 15).await;
    let sold = db
        .ledger()
        .create_sales_invoice(&sale("House Wire", 3, 20))
        .await
        .unwrap();

    db.ledger()
        .create_sales_return_invoice(&sale("House Wire", 2, 20).against(sold.id.clone()))
        .await
        .unwrap();

    let err = db
        .ledger()
        .create_sales_return_invoice(&sale("House Wire", 2, 20).against(sold.id.clone()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::ReturnExceedsOriginal { original: 3, returned: 2, requested: 2, .. })
    ));
    assert_eq!(stock(&db, StockKind::Production, "House Wire").await.quantity, 9);
}

#[tokio::test]
async fn test_return_against_missing_invoice() {
    let db = store().await;
    produce(&db, "House Wire", 10, 15).await;

    let draft = sale("House Wire", 1, 20).against("550e8400-e29b-41d4-a716-446655440000");
    let err = db.ledger().create_sales_return_invoice(&draft).await.unwrap_err();
    assert!(matches!(err, DbError::ReferenceNotFound { .. }));
}

#[tokio::test]
async fn test_return_must_name_original_party() {
    let db = store().await;
    db.catalog()
        .add_customer(&cable_core::NewParty::named("Madina Traders"))
        .await
        .unwrap();
    produce(&db, "House Wire", 10, 15).await;
    let sold = db
        .ledger()
        .create_sales_invoice(&sale("House Wire", 3, 20))
        .await
        .unwrap();

    let mut draft = sale("House Wire", 1, 20).against(sold.id);
    draft.counterparty = Some(PartyRef::name("Madina Traders"));
    let err = db.ledger().create_sales_return_invoice(&draft).await.unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
}

#[tokio::test]
async fn test_sale_of_unknown_item_is_rejected() {
    let db = store().await;
    let err = db
        .ledger()
        .create_sales_invoice(&sale("Ghost Cable", 1, 20))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ReferenceNotFound { .. }));
    assert_eq!(row_count(&db, "production_stock").await, 0);
}

#[tokio::test]
async fn test_unknown_supplier_is_rejected() {
    let db = store().await;
    let draft = InvoiceDraft::new(date(1))
        .with_counterparty(PartyRef::name("Nobody"))
        .with_line(LineDraft::new(item("Copper 10mm"), 1, 100));

    let err = db.ledger().create_raw_purchase_invoice(&draft).await.unwrap_err();
    assert!(matches!(err, DbError::ReferenceNotFound { .. }));
    assert_eq!(row_count(&db, "raw_stock").await, 0);
}

#[tokio::test]
async fn test_production_consumes_materials() {
    let db = store().await;
    db.ledger()
        .create_raw_purchase_invoice(
            &purchase("Copper 10mm", 50, 100).with_line(LineDraft::new(item("PVC Granules"), 30, 40)),
        )
        .await
        .unwrap();

    let run = ProductionDraft::new(date(3))
        .with_output(LineDraft::new(item("House Wire"), 10, 900))
        .with_material(MaterialDraft::new(item("Copper 10mm"), 20))
        .with_material(MaterialDraft::new(item("PVC Granules"), 15));
    let posted = db.ledger().create_production_invoice(&run).await.unwrap();
    assert_eq!(posted.invoice_number, "PRD-000001");

    let copper = stock(&db, StockKind::Raw, "Copper 10mm").await;
    assert_eq!((copper.quantity, copper.total_cost_cents), (30, 3000));
    let pvc = stock(&db, StockKind::Raw, "PVC Granules").await;
    assert_eq!((pvc.quantity, pvc.total_cost_cents), (15, 600));
    let wire = stock(&db, StockKind::Production, "House Wire").await;
    assert_eq!((wire.quantity, wire.total_cost_cents), (10, 9000));

    let materials = db.ledger().material_lines(&posted.id).await.unwrap();
    assert_eq!(materials.len(), 2);
    assert_eq!(materials[0], (copper.id, 20, 2000));
}

#[tokio::test]
async fn test_production_short_of_material_writes_nothing() {
    let db = store().await;
    db.ledger()
        .create_raw_purchase_invoice(&purchase("Copper 10mm", 5, 100))
        .await
        .unwrap();

    let run = ProductionDraft::new(date(3))
        .with_output(LineDraft::new(item("House Wire"), 10, 900))
        .with_material(MaterialDraft::new(item("Copper 10mm"), 6));
    let err = db.ledger().create_production_invoice(&run).await.unwrap_err();
    assert_eq!(err.kind(), cable_db::ErrorKind::InsufficientStock);

    assert_eq!(row_count(&db, "production_invoices").await, 0);
    assert_eq!(row_count(&db, "production_material_items").await, 0);
    // the output item registered inside the transaction is gone too
    assert_eq!(row_count(&db, "production_stock").await, 0);
    assert_eq!(stock(&db, StockKind::Raw, "Copper 10mm").await.quantity, 5);
}

#[tokio::test]
async fn test_raw_use_and_production_return() {
    let db = store().await;
    db.ledger()
        .create_raw_purchase_invoice(&purchase("Copper 10mm", 10, 100))
        .await
        .unwrap();
    produce(&db, "House Wire", 4, 50).await;

    let used = InvoiceDraft::new(date(4)).with_line(LineDraft::new(item("Copper 10mm"), 4, 0));
    let posted = db.ledger().create_raw_use_invoice(&used).await.unwrap();
    assert_eq!(posted.invoice_number, "RUI-000001");
    assert_eq!(stock(&db, StockKind::Raw, "Copper 10mm").await.quantity, 6);

    let taken_back = InvoiceDraft::new(date(4)).with_line(LineDraft::new(item("House Wire"), 1, 0));
    db.ledger().create_production_return_invoice(&taken_back).await.unwrap();
    assert_eq!(stock(&db, StockKind::Production, "House Wire").await.quantity, 3);

    // raw use has no party and settles no money
    let with_party = used.clone().with_counterparty(PartyRef::name(SUPPLIER));
    let err = db.ledger().create_raw_use_invoice(&with_party).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::Validation(ValidationError::NotAllowed { .. }))
    ));
}

#[tokio::test]
async fn test_purchase_return_to_supplier() {
    let db = store().await;
    let bought = db
        .ledger()
        .create_raw_purchase_invoice(&purchase("Copper 10mm", 10, 100))
        .await
        .unwrap();

    let back = InvoiceDraft::new(date(5))
        .with_counterparty(PartyRef::name(SUPPLIER))
        .with_line(LineDraft::new(item("Copper 10mm"), 4, 100))
        .against(bought.id)
        .with_paid(400);
    let posted = db.ledger().create_raw_purchase_return_invoice(&back).await.unwrap();
    assert_eq!(posted.invoice_number, "RPR-000001");

    let copper = stock(&db, StockKind::Raw, "Copper 10mm").await;
    assert_eq!((copper.quantity, copper.total_cost_cents), (6, 600));
    // the supplier refunded us in cash
    assert_eq!(db.cashbook().cash_balance().await.unwrap(), Money::from_cents(400));
}

#[tokio::test]
async fn test_cost_stays_consistent_across_mixed_prices() {
    let db = store().await;
    let ledger = db.ledger();

    produce(&db, "House Wire", 3, 100).await;
    produce(&db, "House Wire", 4, 175).await;
    ledger.create_sales_invoice(&sale("House Wire", 2, 300)).await.unwrap();
    produce(&db, "House Wire", 1, 333).await;
    ledger.create_sales_invoice(&sale("House Wire", 5, 300)).await.unwrap();

    let wire = stock(&db, StockKind::Production, "House Wire").await;
    assert_eq!(wire.quantity, 1);
    assert!(wire.cost_is_consistent(), "{:?}", wire);

    ledger.create_sales_invoice(&sale("House Wire", 1, 300)).await.unwrap();
    let wire = stock(&db, StockKind::Production, "House Wire").await;
    assert_eq!((wire.quantity, wire.total_cost_cents), (0, 0));
    // average survives an empty row
    assert!(wire.unit_cost_cents > 0);
}

#[tokio::test]
async fn test_lines_snapshot_unit_cost() {
    let db = store().await;
    produce(&db, "House Wire", 4, 150).await;
    let sold = db
        .ledger()
        .create_sales_invoice(&sale("House Wire", 2, 300))
        .await
        .unwrap();

    let lines = db.ledger().invoice_lines(DocumentKind::Sales, &sold.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].unit_cost_cents, 150);
    assert_eq!(lines[0].line_total_cents, 600);

    let by_number = db
        .ledger()
        .invoice_by_number(DocumentKind::Sales, &sold.invoice_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_number.id, sold.id);
    assert_eq!(by_number.total_cents, 600);
}

#[tokio::test]
async fn test_empty_document_is_rejected() {
    let db = store().await;
    let draft = InvoiceDraft::new(date(1)).with_counterparty(PartyRef::name(SUPPLIER));

    let err = db.ledger().create_raw_purchase_invoice(&draft).await.unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::EmptyDocument { .. })));
    assert_eq!(err.kind(), cable_db::ErrorKind::Validation);
}

#[tokio::test]
async fn test_production_goes_through_its_own_operation() {
    let db = store().await;
    let draft = InvoiceDraft::new(date(1)).with_line(LineDraft::new(item("House Wire"), 1, 1));

    let err = db
        .ledger()
        .create_invoice(DocumentKind::Production, &draft)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
}

#[tokio::test]
async fn test_oversized_price_is_rejected_before_posting() {
    let db = store().await;
    let draft = purchase("Copper 10mm", 100, i64::MAX / 10);

    let err = db.ledger().create_raw_purchase_invoice(&draft).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
    ));
    assert_eq!(err.kind(), cable_db::ErrorKind::Validation);
    assert!(db
        .catalog()
        .find_stock_id(StockKind::Raw, "Copper 10mm", BRAND)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_lines_share_header_timestamp() {
    let db = store().await;
    let draft = purchase("Copper 10mm", 10, 100)
        .with_line(LineDraft::new(item("PVC Granules"), 5, 40))
        .with_line(LineDraft::new(item("Aluminium 7mm"), 2, 300));
    let posted = db.ledger().create_raw_purchase_invoice(&draft).await.unwrap();

    let header = db
        .ledger()
        .invoice(DocumentKind::RawPurchase, &posted.id)
        .await
        .unwrap()
        .unwrap();
    let lines = db
        .ledger()
        .invoice_lines(DocumentKind::RawPurchase, &posted.id)
        .await
        .unwrap();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|line| line.created_at == header.created_at));
}
