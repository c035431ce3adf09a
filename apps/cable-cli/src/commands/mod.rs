//! # CLI Commands Module
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (outcome type, shared parsers)
//! ├── ledger.rs   ◄─── Posting documents from JSON drafts
//! ├── report.rs   ◄─── Stock, invoice, profit and brand reports
//! ├── catalog.rs  ◄─── Master data
//! ├── cash.rs     ◄─── Cash and bank books
//! ├── payroll.rs  ◄─── Employees and salary
//! └── user.rs     ◄─── Sign-in and passwords
//! ```
//!
//! Every handler returns `CommandResult<T>`. Failures become a
//! `CommandOutcome` with `ok: false` at the top level.

pub mod cash;
pub mod catalog;
pub mod ledger;
pub mod payroll;
pub mod report;
pub mod user;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use cable_core::PostedInvoice;
use cable_db::{CatalogEntity, Database};

use crate::error::{ApiError, ErrorCode};

pub type CommandResult<T> = Result<T, ApiError>;

/// What the operator sees after a mutating command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl CommandOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        CommandOutcome {
            ok: true,
            message: message.into(),
            invoice_number: None,
            code: None,
        }
    }

    /// Outcome of a committed document.
    pub fn posted(invoice: &PostedInvoice) -> Self {
        CommandOutcome {
            ok: true,
            message: format!("{} {} posted", invoice.kind, invoice.invoice_number),
            invoice_number: Some(invoice.invoice_number.clone()),
            code: None,
        }
    }

    pub fn failure(err: &ApiError) -> Self {
        CommandOutcome {
            ok: false,
            message: err.message.clone(),
            invoice_number: None,
            code: Some(err.code),
        }
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> CommandResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}

/// Parses an amount in rupees (`1250`, `1250.5`, `-12.75`) into paisa.
pub fn parse_amount(s: &str) -> Result<i64, String> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (major, minor) = match digits.split_once('.') {
        Some((major, minor)) => (major, minor),
        None => (digits, ""),
    };
    if major.is_empty() || minor.len() > 2 || !major.chars().chain(minor.chars()).all(|c| c.is_ascii_digit()) {
        return Err(format!("'{}' is not an amount like 1250.50", s));
    }
    let major: i64 = major.parse().map_err(|_| format!("'{}' is too large", s))?;
    let minor: i64 = match minor.len() {
        0 => 0,
        1 => minor.parse::<i64>().map_err(|e| e.to_string())? * 10,
        _ => minor.parse::<i64>().map_err(|e| e.to_string())?,
    };
    let cents = major
        .checked_mul(100)
        .and_then(|c| c.checked_add(minor))
        .ok_or_else(|| format!("'{}' is too large", s))?;
    Ok(if negative { -cents } else { cents })
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Resolves a catalog row by name.
pub(crate) async fn catalog_id(db: &Database, entity: CatalogEntity, name: &str) -> CommandResult<String> {
    db.catalog()
        .find_id(entity, name)
        .await?
        .ok_or_else(|| ApiError::new(ErrorCode::ReferenceNotFound, format!("{} not found: {}", entity.label(), name)))
}
