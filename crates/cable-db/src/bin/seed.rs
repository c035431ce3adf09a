//! # Seed Data Generator
//!
//! Populates a database with a small cable business for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./cable_dev.db with 30 days of trading
//! cargo run -p cable-db --bin seed
//!
//! # More days, other file
//! cargo run -p cable-db --bin seed -- --days 90 --db ./data/cable.db
//! ```
//!
//! ## Generated Data
//! - Locations, a manufacturer with two brands, units and categories
//! - Suppliers, customers and one bank account
//! - Per day: a raw purchase, a production run consuming it, and a sale
//!   of part of the output

use chrono::{Duration, NaiveDate};
use std::env;

use cable_core::{
    InvoiceDraft, LineDraft, MaterialDraft, NewParty, PartyRef, ProductionDraft, Settlement,
    StockRef,
};
use cable_db::{Database, DbConfig};

/// Raw materials: (name, brand, price per unit in paisa).
const RAW_MATERIALS: &[(&str, &str, i64)] = &[
    ("Copper Rod 8mm", "Fast", 145_000),
    ("PVC Compound", "Fast", 32_000),
    ("Aluminium Rod", "Pak", 61_000),
];

/// Finished cables: (name, brand, copper used, pvc used, sale price).
const CABLES: &[(&str, &str, i64, i64, i64)] = &[
    ("House Wire 3/29", "Fast", 2, 1, 980_000),
    ("Twin Flat 7/36", "Fast", 3, 2, 1_450_000),
    ("Service Cable 2C", "Pak", 1, 1, 610_000),
];

const SUPPLIERS: &[&str] = &["Punjab Copper Works", "Karachi Polymers"];
const CUSTOMERS: &[&str] = &["Ali Electric Store", "Madina Traders", "Hafiz Builders"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 30;
    let mut db_path = String::from("./cable_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(30);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cable Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Days of trading to generate (default: 30)");
                println!("  -d, --db <PATH>    Database file path (default: ./cable_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Cable Ledger Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Days:     {}", days);
    println!();

    let db = Database::connect(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, schema ready");

    let catalog = db.catalog();
    if !catalog.stock_items(cable_core::StockKind::Raw).await?.is_empty() {
        println!("⚠ Database already has stock items");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // ----- master data -----
    let punjab = catalog.add_province("Punjab").await?;
    let lahore = catalog.add_district(&punjab, "Lahore").await?;
    let tehsil = catalog.add_tehsil(&lahore, "Lahore City").await?;
    let maker = catalog.add_manufacturer("Fast Cables Ltd", Some(&tehsil)).await?;
    catalog.add_brand("Fast", &maker).await?;
    catalog.add_brand("Pak", &maker).await?;
    catalog.add_unit("Coil").await?;
    catalog.add_category("Copper Cable").await?;

    for name in SUPPLIERS {
        catalog
            .add_supplier(&NewParty {
                tehsil_id: Some(tehsil.clone()),
                ..NewParty::named(*name)
            })
            .await?;
    }
    for name in CUSTOMERS {
        catalog
            .add_customer(&NewParty {
                tehsil_id: Some(tehsil.clone()),
                ..NewParty::named(*name)
            })
            .await?;
    }
    let bank = catalog.add_bank("Meezan Bank", Some("0101-2345678"), Some("Mall Road")).await?;
    println!("✓ Master data created");

    // ----- trading days -----
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid start date")?;
    let ledger = db.ledger();
    let mut posted = 0;

    for day in 0..days {
        let date = start + Duration::days(day);
        let seed = day as usize;

        let mut purchase = InvoiceDraft::new(date)
            .with_counterparty(PartyRef::name(SUPPLIERS[seed % SUPPLIERS.len()]));
        for (name, brand, price) in RAW_MATERIALS {
            purchase = purchase.with_line(LineDraft::new(StockRef::named(*name, *brand), 20, *price));
        }
        if seed % 3 == 0 {
            purchase.paid_cents = purchase.gross_total().cents() / 2;
            purchase.settlement = Settlement::Bank { bank_id: bank.clone() };
        }
        ledger.create_raw_purchase_invoice(&purchase).await?;

        let (cable, brand, copper, pvc, price) = CABLES[seed % CABLES.len()];
        let (conductor, conductor_brand) = if brand == "Pak" {
            ("Aluminium Rod", "Pak")
        } else {
            ("Copper Rod 8mm", "Fast")
        };
        let run = ProductionDraft::new(date)
            .with_output(LineDraft::new(StockRef::named(cable, brand), 10, price * 6 / 10))
            .with_material(MaterialDraft::new(StockRef::named(conductor, conductor_brand), copper * 5))
            .with_material(MaterialDraft::new(StockRef::named("PVC Compound", "Fast"), pvc * 5));
        ledger.create_production_invoice(&run).await?;

        let sale = InvoiceDraft::new(date)
            .with_counterparty(PartyRef::name(CUSTOMERS[seed % CUSTOMERS.len()]))
            .with_line(LineDraft::new(StockRef::named(cable, brand), 4, price))
            .with_paid(price * 2);
        ledger.create_sales_invoice(&sale).await?;

        posted += 3;
        if (day + 1) % 10 == 0 {
            println!("  Posted {} days...", day + 1);
        }
    }

    println!();
    println!("✓ Posted {} documents", posted);

    let end = start + Duration::days(days.max(1) - 1);
    let profit = db.reports().profit_report(start, end).await;
    println!("  Revenue:      {}", profit.revenue_cents);
    println!("  Gross profit: {}", profit.gross_profit_cents);
    println!("  Cash balance: {}", db.cashbook().cash_balance().await?);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
