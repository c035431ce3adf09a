//! # Repository Module
//!
//! Database repositories for Cable Ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  cable-cli command                                                      │
//! │       │                                                                 │
//! │       │  db.ledger().create_sales_invoice(&draft)                      │
//! │       ▼                                                                 │
//! │  LedgerRepository ──uses──► catalog::resolve_stock / resolve_party     │
//! │       │             └─────► cashbook::insert_cash_row / insert_bank_row│
//! │       │                                                                 │
//! │       │  one sqlx::Transaction per document                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Shared helpers take `&mut SqliteConnection`, so they run the same way
//! on a pooled connection or inside another repository's transaction.
//!
//! ## Available Repositories
//!
//! - [`LedgerRepository`](ledger::LedgerRepository) - The seven document families
//! - [`CatalogRepository`](catalog::CatalogRepository) - Master data and stock items
//! - [`CashBookRepository`](cashbook::CashBookRepository) - Cash and bank books
//! - [`PayrollRepository`](payroll::PayrollRepository) - Employees and salaries
//! - [`CredentialRepository`](credential::CredentialRepository) - Sign-in
//! - [`ReportRepository`](report::ReportRepository) - Read-only reports

pub mod cashbook;
pub mod catalog;
pub mod credential;
pub mod ledger;
pub mod payroll;
pub mod report;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{DbError, DbResult};

/// Opens a write transaction that takes the database write lock up front.
///
/// A deferred `BEGIN` that reads first and writes later cannot wait for
/// the lock under WAL: SQLite fails the upgrade with `SQLITE_BUSY` at once.
/// `BEGIN IMMEDIATE` queues behind the busy timeout instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}
