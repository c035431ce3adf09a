//! # cable-core: Pure Domain Logic for Cable Ledger
//!
//! This crate is the **heart** of Cable Ledger. It contains the inventory
//! ledger rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cable Ledger Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    cable-cli (UI boundary)                      │   │
//! │  │    JSON draft ──► command ──► ok / alert message               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    cable-db (Database Layer)                    │   │
//! │  │       SQLite pool, schema, ledger/report repositories           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plans with                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cable-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │   draft   │  │   │
//! │  │   │ StockItem │  │   Money   │  │ LedgerPlan│  │  Invoice  │  │   │
//! │  │   │ Document  │  │ averages  │  │ Movement  │  │ Production│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (StockItem, DocumentKind, cash/bank rows, payroll)
//! - [`money`] - Money type with integer arithmetic
//! - [`draft`] - Documents as submitted, before posting
//! - [`ledger`] - Stock movement planning and return allowances
//! - [`numbering`] - `PREFIX-NNNNNN` invoice numbers
//! - [`error`] - Domain error types
//! - [`validation`] - Field and document rules
//!
//! ## Example Usage
//!
//! ```rust
//! use cable_core::ledger::{LedgerPlan, Movement, StockPosition};
//! use cable_core::{Money, StockKind};
//!
//! let copper = StockPosition {
//!     stock_id: "cu".into(),
//!     kind: StockKind::Raw,
//!     name: "Copper 10mm".into(),
//!     quantity: 0,
//!     unit_cost: Money::from_cents(100),
//!     total_cost: Money::zero(),
//!     version: 0,
//! };
//!
//! let plan = LedgerPlan::build(
//!     vec![copper],
//!     &[Movement::inbound_at_price("cu", 50, Money::from_cents(100))],
//! )
//! .unwrap();
//!
//! assert_eq!(plan.positions[0].quantity, 50);
//! assert_eq!(plan.positions[0].total_cost.cents(), 5000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod draft;
pub mod error;
pub mod ledger;
pub mod money;
pub mod numbering;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use draft::{InvoiceDraft, LineDraft, MaterialDraft, PartyRef, ProductionDraft, StockRef};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity accepted on a single line.
///
/// ## Business Reason
/// Catches typing slips (an extra zero on a cable length) before they
/// distort stock and cost.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Largest unit price accepted on a single line (Rs 10 crore).
pub const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000_000;

/// Largest single amount: a document total, a discount, a payment or a
/// cash entry. Keeps running stock values far from `i64` overflow.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000_000_000;
