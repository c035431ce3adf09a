//! # Schema Initializer
//!
//! Creates every table, index and reporting view of the store.
//!
//! ## How Initialization Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Schema Initialization                              │
//! │                                                                         │
//! │  Database::connect                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │       │                                                                 │
//! │       ├── CREATE TABLE IF NOT EXISTS  (catalog, stock, documents,      │
//! │       │                                cash/bank, payroll, users)      │
//! │       ├── CREATE INDEX IF NOT EXISTS                                   │
//! │       ├── DROP VIEW IF EXISTS + CREATE VIEW  (reporting views)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT  ── connect returns only after this                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tables are never altered or dropped, so running this on every start is
//! safe. Views hold no state and are rebuilt so their column shape always
//! matches the code reading them.

use sqlx::SqlitePool;
use tracing::{debug, info};

use cable_core::{CounterpartyRole, DocumentKind};

use crate::error::{DbError, DbResult};

// =============================================================================
// Static Tables
// =============================================================================

const CATALOG_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS provinces (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS districts (
        id           TEXT PRIMARY KEY,
        province_id  TEXT NOT NULL REFERENCES provinces(id),
        name         TEXT NOT NULL,
        created_at   TEXT NOT NULL,
        UNIQUE (province_id, name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tehsils (
        id           TEXT PRIMARY KEY,
        district_id  TEXT NOT NULL REFERENCES districts(id),
        name         TEXT NOT NULL,
        created_at   TEXT NOT NULL,
        UNIQUE (district_id, name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS manufacturers (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        tehsil_id   TEXT REFERENCES tehsils(id),
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS brands (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL UNIQUE,
        manufacturer_id  TEXT NOT NULL REFERENCES manufacturers(id),
        created_at       TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS units (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        phone       TEXT,
        address     TEXT,
        tehsil_id   TEXT REFERENCES tehsils(id),
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS suppliers (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        phone       TEXT,
        address     TEXT,
        tehsil_id   TEXT REFERENCES tehsils(id),
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS banks (
        id              TEXT PRIMARY KEY,
        name            TEXT NOT NULL UNIQUE,
        account_number  TEXT,
        branch          TEXT,
        created_at      TEXT NOT NULL
    )
    "#,
];

const LEDGER_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS invoice_sequences (
        prefix      TEXT PRIMARY KEY,
        last_value  INTEGER NOT NULL CHECK (last_value >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS production_material_items (
        id               TEXT PRIMARY KEY,
        invoice_id       TEXT NOT NULL REFERENCES production_invoices(id),
        stock_id         TEXT NOT NULL REFERENCES raw_stock(id),
        quantity         INTEGER NOT NULL CHECK (quantity > 0),
        unit_cost_cents  INTEGER NOT NULL,
        line_cost_cents  INTEGER NOT NULL,
        created_at       TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cash_transactions (
        id              TEXT PRIMARY KEY,
        tx_date         TEXT NOT NULL,
        kind            TEXT NOT NULL CHECK (kind IN
                            ('cash_in', 'cash_out', 'transfer_to_bank', 'transfer_from_bank')),
        amount_cents    INTEGER NOT NULL,
        description     TEXT,
        bank_id         TEXT REFERENCES banks(id),
        invoice_number  TEXT,
        created_at      TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bank_transactions (
        id                    TEXT PRIMARY KEY,
        bank_id               TEXT NOT NULL REFERENCES banks(id),
        tx_date               TEXT NOT NULL,
        kind                  TEXT NOT NULL CHECK (kind IN
                                  ('deposit', 'withdraw', 'transfer_in', 'transfer_out', 'invoice_payment')),
        amount_cents          INTEGER NOT NULL,
        description           TEXT,
        counterparty_bank_id  TEXT REFERENCES banks(id),
        invoice_number        TEXT,
        created_at            TEXT NOT NULL
    )
    "#,
];

const PAYROLL_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id                    TEXT PRIMARY KEY,
        name                  TEXT NOT NULL,
        designation           TEXT,
        phone                 TEXT,
        monthly_salary_cents  INTEGER NOT NULL CHECK (monthly_salary_cents >= 0),
        joined_on             TEXT NOT NULL,
        is_active             INTEGER NOT NULL DEFAULT 1,
        created_at            TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id               TEXT PRIMARY KEY,
        employee_id      TEXT NOT NULL REFERENCES employees(id),
        attendance_date  TEXT NOT NULL,
        status           TEXT NOT NULL CHECK (status IN ('present', 'absent', 'leave')),
        created_at       TEXT NOT NULL,
        UNIQUE (employee_id, attendance_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS advances (
        id            TEXT PRIMARY KEY,
        employee_id   TEXT NOT NULL REFERENCES employees(id),
        advance_date  TEXT NOT NULL,
        amount_cents  INTEGER NOT NULL CHECK (amount_cents > 0),
        description   TEXT,
        created_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS loans (
        id            TEXT PRIMARY KEY,
        employee_id   TEXT NOT NULL REFERENCES employees(id),
        loan_date     TEXT NOT NULL,
        amount_cents  INTEGER NOT NULL CHECK (amount_cents > 0),
        description   TEXT,
        created_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS loan_repayments (
        id              TEXT PRIMARY KEY,
        employee_id     TEXT NOT NULL REFERENCES employees(id),
        repayment_date  TEXT NOT NULL,
        amount_cents    INTEGER NOT NULL CHECK (amount_cents > 0),
        created_at      TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id             TEXT PRIMARY KEY,
        username       TEXT NOT NULL UNIQUE,
        password_hash  TEXT NOT NULL,
        created_at     TEXT NOT NULL,
        updated_at     TEXT NOT NULL
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_cash_transactions_date ON cash_transactions(tx_date)",
    "CREATE INDEX IF NOT EXISTS idx_bank_transactions_bank_date ON bank_transactions(bank_id, tx_date)",
    "CREATE INDEX IF NOT EXISTS idx_material_items_invoice ON production_material_items(invoice_id)",
    "CREATE INDEX IF NOT EXISTS idx_attendance_employee_date ON attendance(employee_id, attendance_date)",
];

// =============================================================================
// Generated Tables
// =============================================================================

/// DDL for one stock table. Both stock families share a shape.
fn stock_table(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id                TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            brand_id          TEXT NOT NULL REFERENCES brands(id),
            category_id       TEXT REFERENCES categories(id),
            unit_id           TEXT REFERENCES units(id),
            quantity          INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            unit_cost_cents   INTEGER NOT NULL DEFAULT 0,
            total_cost_cents  INTEGER NOT NULL DEFAULT 0,
            sale_price_cents  INTEGER,
            version           INTEGER NOT NULL DEFAULT 0,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL,
            UNIQUE (name, brand_id)
        )
        "#
    )
}

/// DDL for the header, item table and date index of one document kind.
fn document_tables(kind: DocumentKind) -> [String; 3] {
    let header = kind.header_table();
    let items = kind.item_table();
    let stock = kind.stock_kind().table();

    let counterparty = match kind.counterparty() {
        Some(CounterpartyRole::Supplier) => {
            "supplier_id TEXT NOT NULL REFERENCES suppliers(id),".to_string()
        }
        Some(CounterpartyRole::Customer) => {
            "customer_id TEXT NOT NULL REFERENCES customers(id),".to_string()
        }
        None => String::new(),
    };
    let original = match kind.returns_against() {
        Some(original) => format!(
            "original_invoice_id TEXT REFERENCES {}(id),",
            original.header_table()
        ),
        None => String::new(),
    };

    [
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {header} (
                id              TEXT PRIMARY KEY,
                invoice_number  TEXT NOT NULL UNIQUE,
                {counterparty}
                {original}
                invoice_date    TEXT NOT NULL,
                total_cents     INTEGER NOT NULL DEFAULT 0,
                discount_cents  INTEGER NOT NULL DEFAULT 0,
                paid_cents      INTEGER NOT NULL DEFAULT 0,
                notes           TEXT,
                created_at      TEXT NOT NULL
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {items} (
                id                TEXT PRIMARY KEY,
                invoice_id        TEXT NOT NULL REFERENCES {header}(id),
                stock_id          TEXT NOT NULL REFERENCES {stock}(id),
                quantity          INTEGER NOT NULL CHECK (quantity > 0),
                unit_price_cents  INTEGER NOT NULL,
                line_total_cents  INTEGER NOT NULL,
                unit_cost_cents   INTEGER NOT NULL,
                created_at        TEXT NOT NULL
            )
            "#
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{header}_date ON {header}(invoice_date)"),
    ]
}

// =============================================================================
// Views
// =============================================================================

/// Reporting views as `(name, select)`.
const VIEWS: &[(&str, &str)] = &[
    (
        "v_stock_valuation",
        r#"
        SELECT 'raw' AS stock_kind, s.id AS stock_id, s.name AS item, b.name AS brand,
               c.name AS category, u.name AS unit, s.quantity,
               s.unit_cost_cents, s.total_cost_cents, s.sale_price_cents
        FROM raw_stock s
        JOIN brands b ON b.id = s.brand_id
        LEFT JOIN categories c ON c.id = s.category_id
        LEFT JOIN units u ON u.id = s.unit_id
        UNION ALL
        SELECT 'production' AS stock_kind, s.id, s.name, b.name,
               c.name, u.name, s.quantity,
               s.unit_cost_cents, s.total_cost_cents, s.sale_price_cents
        FROM production_stock s
        JOIN brands b ON b.id = s.brand_id
        LEFT JOIN categories c ON c.id = s.category_id
        LEFT JOIN units u ON u.id = s.unit_id
        "#,
    ),
    (
        "v_sales_lines",
        r#"
        SELECT h.id AS invoice_id, h.invoice_number, h.invoice_date,
               cu.id AS customer_id, cu.name AS customer,
               i.stock_id, p.name AS item, b.id AS brand_id, b.name AS brand,
               i.quantity, i.unit_price_cents, i.line_total_cents, i.unit_cost_cents
        FROM sales_invoice_items i
        JOIN sales_invoices h ON h.id = i.invoice_id
        JOIN customers cu ON cu.id = h.customer_id
        JOIN production_stock p ON p.id = i.stock_id
        JOIN brands b ON b.id = p.brand_id
        "#,
    ),
    (
        "v_purchase_lines",
        r#"
        SELECT h.id AS invoice_id, h.invoice_number, h.invoice_date,
               su.id AS supplier_id, su.name AS supplier,
               i.stock_id, r.name AS item, b.id AS brand_id, b.name AS brand,
               i.quantity, i.unit_price_cents, i.line_total_cents, i.unit_cost_cents
        FROM raw_purchase_invoice_items i
        JOIN raw_purchase_invoices h ON h.id = i.invoice_id
        JOIN suppliers su ON su.id = h.supplier_id
        JOIN raw_stock r ON r.id = i.stock_id
        JOIN brands b ON b.id = r.brand_id
        "#,
    ),
];

/// Every `CREATE TABLE` / `CREATE INDEX` statement, in dependency order.
fn table_statements() -> Vec<String> {
    let mut statements: Vec<String> = CATALOG_TABLES.iter().map(|s| s.to_string()).collect();

    statements.push(stock_table("raw_stock"));
    statements.push(stock_table("production_stock"));

    for kind in DocumentKind::ALL {
        statements.extend(document_tables(kind));
    }

    statements.extend(LEDGER_TABLES.iter().map(|s| s.to_string()));
    statements.extend(PAYROLL_TABLES.iter().map(|s| s.to_string()));
    statements.extend(INDEXES.iter().map(|s| s.to_string()));
    statements
}

// =============================================================================
// Public API
// =============================================================================

/// Creates all tables, indexes and views.
///
/// ## Safety
/// - Idempotent: safe to run on every start
/// - Transactional: either the whole schema is in place or nothing changed
///
/// ## Example
/// ```rust,ignore
/// schema::initialize(&pool).await?;
/// ```
pub async fn initialize(pool: &SqlitePool) -> DbResult<()> {
    info!("Initializing schema");

    let mut tx = pool
        .begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| DbError::SchemaFailed(e.to_string()))?;

    let statements = table_statements();
    for sql in &statements {
        sqlx::query(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::SchemaFailed(e.to_string()))?;
    }
    debug!(statements = statements.len(), "Tables and indexes ready");

    for (name, select) in VIEWS {
        sqlx::query(&format!("DROP VIEW IF EXISTS {name}"))
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::SchemaFailed(e.to_string()))?;
        sqlx::query(&format!("CREATE VIEW {name} AS {select}"))
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::SchemaFailed(format!("{name}: {e}")))?;
    }
    debug!(views = VIEWS.len(), "Reporting views rebuilt");

    tx.commit()
        .await
        .map_err(|e| DbError::SchemaFailed(e.to_string()))?;

    info!("Schema ready");
    Ok(())
}

/// Lists `(type, name)` of every table and view, sorted.
///
/// ## Usage
/// For diagnostics and tests.
pub async fn object_names(pool: &SqlitePool) -> DbResult<Vec<(String, String)>> {
    let names: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT type, name
        FROM sqlite_master
        WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
        ORDER BY type, name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(names)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let before = object_names(db.pool()).await.unwrap();

        for _ in 0..3 {
            initialize(db.pool()).await.unwrap();
        }

        let after = object_names(db.pool()).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_all_document_tables_exist() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let names: Vec<String> = object_names(db.pool())
            .await
            .unwrap()
            .into_iter()
            .map(|(_, name)| name)
            .collect();

        for kind in DocumentKind::ALL {
            assert!(names.iter().any(|n| n == kind.header_table()), "{}", kind);
            assert!(names.iter().any(|n| n == kind.item_table()), "{}", kind);
        }
        for view in ["v_stock_valuation", "v_sales_lines", "v_purchase_lines"] {
            assert!(names.iter().any(|n| n == view), "{}", view);
        }
    }

    #[test]
    fn test_return_tables_reference_their_original() {
        let [header, _, _] = document_tables(DocumentKind::SalesReturn);
        assert!(header.contains("REFERENCES sales_invoices(id)"));
        assert!(header.contains("customer_id"));

        let [header, _, _] = document_tables(DocumentKind::RawUse);
        assert!(!header.contains("original_invoice_id"));
        assert!(!header.contains("supplier_id"));
    }
}
