//! Several connections posting at once against one file-backed store.

mod common;

use cable_core::{InvoiceDraft, LineDraft, Money, StockKind};
use cable_db::DbConfig;

use common::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_postings_all_commit() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded(DbConfig::new(dir.path().join("cable.db")).max_connections(5)).await;

    for name in ["Copper 10mm", "PVC Granules"] {
        db.ledger()
            .create_raw_purchase_invoice(&purchase(name, 1000, 100))
            .await
            .unwrap();
    }

    let mut tasks = Vec::new();
    for n in 0..8 {
        let db = db.clone();
        let name = if n % 2 == 0 { "Copper 10mm" } else { "PVC Granules" };
        tasks.push(tokio::spawn(async move {
            let used = InvoiceDraft::new(date(2)).with_line(LineDraft::new(item(name), 1, 0));
            db.ledger().create_raw_use_invoice(&used).await
        }));
    }

    let mut numbers = Vec::new();
    for task in tasks {
        numbers.push(task.await.unwrap().unwrap().invoice_number);
    }
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 8);

    assert_eq!(stock(&db, StockKind::Raw, "Copper 10mm").await.quantity, 996);
    assert_eq!(stock(&db, StockKind::Raw, "PVC Granules").await.quantity, 996);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cash_transfers_all_commit() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded(DbConfig::new(dir.path().join("cable.db")).max_connections(5)).await;
    let bank = db.catalog().add_bank("Meezan Bank", None, None).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..6 {
        let db = db.clone();
        let bank = bank.clone();
        tasks.push(tokio::spawn(async move {
            db.cashbook()
                .transfer_cash_to_bank(&bank, Money::from_cents(1_000), date(3), None)
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(db.cashbook().cash_balance().await.unwrap().cents(), -6_000);
    assert_eq!(db.cashbook().bank_balance(&bank).await.unwrap().cents(), 6_000);
}
