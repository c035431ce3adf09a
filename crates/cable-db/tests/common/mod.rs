//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;

use cable_core::{
    InvoiceDraft, LineDraft, NewParty, NewStockItem, PartyRef, ProductionDraft, StockItem,
    StockKind, StockRef,
};
use cable_db::{Database, DbConfig};

pub const SUPPLIER: &str = "Punjab Copper";
pub const CUSTOMER: &str = "Ali Traders";
pub const BRAND: &str = "Fast";

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

/// Opens a schema-initialized store with one brand and one party of each kind.
pub async fn seeded(config: DbConfig) -> Database {
    let db = Database::connect(config).await.unwrap();
    let catalog = db.catalog();
    let maker = catalog.add_manufacturer("Fast Group", None).await.unwrap();
    catalog.add_brand(BRAND, &maker).await.unwrap();
    catalog.add_supplier(&NewParty::named(SUPPLIER)).await.unwrap();
    catalog.add_customer(&NewParty::named(CUSTOMER)).await.unwrap();
    db
}

pub async fn store() -> Database {
    seeded(DbConfig::in_memory()).await
}

pub fn item(name: &str) -> StockRef {
    StockRef::named(name, BRAND)
}

pub fn purchase(name: &str, qty: i64, price: i64) -> InvoiceDraft {
    InvoiceDraft::new(date(1))
        .with_counterparty(PartyRef::name(SUPPLIER))
        .with_line(LineDraft::new(item(name), qty, price))
}

pub fn sale(name: &str, qty: i64, price: i64) -> InvoiceDraft {
    InvoiceDraft::new(date(2))
        .with_counterparty(PartyRef::name(CUSTOMER))
        .with_line(LineDraft::new(item(name), qty, price))
}

/// Puts `qty` finished units of `name` on hand at `unit_cost` each.
pub async fn produce(db: &Database, name: &str, qty: i64, unit_cost: i64) {
    let run = ProductionDraft::new(date(1)).with_output(LineDraft::new(item(name), qty, unit_cost));
    db.ledger().create_production_invoice(&run).await.unwrap();
}

pub async fn register(db: &Database, kind: StockKind, name: &str, unit_cost: i64) -> StockItem {
    let brand = db
        .catalog()
        .find_id(cable_db::CatalogEntity::Brand, BRAND)
        .await
        .unwrap()
        .unwrap();
    db.catalog()
        .add_stock_item(kind, &NewStockItem::new(name, brand).with_unit_cost(unit_cost))
        .await
        .unwrap()
}

pub async fn stock(db: &Database, kind: StockKind, name: &str) -> StockItem {
    let id = db
        .catalog()
        .find_stock_id(kind, name, BRAND)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("{} not in stock", name));
    db.catalog().stock_item(kind, &id).await.unwrap().unwrap()
}

pub async fn row_count(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(db.pool())
        .await
        .unwrap()
}
