//! # cable-db: Storage Layer for Cable Ledger
//!
//! SQLite persistence for the inventory ledger, catalog, cash and bank
//! books, payroll and sign-in, over an async `sqlx` pool.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cable Ledger Data Flow                           │
//! │                                                                         │
//! │  cable-cli command (post-sales, report-stock, ...)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     cable-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │    Schema    │  │   │
//! │  │   │   (pool.rs)   │    │               │    │ (schema.rs)  │  │   │
//! │  │   │               │    │ LedgerRepo    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CatalogRepo   │    │ tables       │  │   │
//! │  │   │ WAL, FKs,     │    │ CashBookRepo  │    │ indexes      │  │   │
//! │  │   │ busy timeout  │    │ PayrollRepo   │    │ views        │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (cable.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger rules (costing, stock checks, numbering format) live in
//! `cable-core`; this crate reads the rows, asks the core for a plan and
//! writes the plan back inside one transaction.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, pragmas and repository accessors
//! - [`schema`] - Idempotent schema creation
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cable_db::{Database, DbConfig};
//!
//! let db = Database::connect(DbConfig::new("cable.db")).await?;
//!
//! let posted = db.ledger().create_sales_invoice(&draft).await?;
//! let stock = db.reports().stock_listing(StockKind::Production).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod pool;
pub mod repository;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{AuthFailure, DbError, DbResult, ErrorKind};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cashbook::CashBookRepository;
pub use repository::catalog::{CatalogEntity, CatalogRepository};
pub use repository::credential::CredentialRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::payroll::{AttendanceSummary, PayrollRepository};
pub use repository::report::{
    BrandSales, DetailLine, InvoiceDetail, InvoiceSummary, KindSummary, ProfitReport,
    ReportRepository, StockRow,
};
