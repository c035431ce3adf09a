//! # Document Drafts
//!
//! What a caller hands to a ledger operation before anything is written.
//!
//! A draft may reference stock items and counterparties either by id or by
//! display name; the store resolves names inside the posting transaction.
//!
//! ```json
//! {
//!   "invoice_date": "2024-03-01",
//!   "counterparty": { "name": "Punjab Copper" },
//!   "paid_cents": 250000,
//!   "lines": [
//!     { "item": { "name": "Copper 10mm", "brand": "Fast" }, "quantity": 50, "unit_price_cents": 10000 }
//!   ]
//! }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{DocumentKind, Settlement};
use crate::validation::{
    validate_amount_cents, validate_name, validate_notes, validate_quantity, validate_totals,
    validate_unit_price, validate_uuid,
};

// =============================================================================
// References
// =============================================================================

/// A stock item referenced by id or by `(name, brand)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StockRef {
    Id { id: String },
    Named { name: String, brand: String },
}

impl StockRef {
    pub fn id(id: impl Into<String>) -> Self {
        StockRef::Id { id: id.into() }
    }

    pub fn named(name: impl Into<String>, brand: impl Into<String>) -> Self {
        StockRef::Named {
            name: name.into(),
            brand: brand.into(),
        }
    }

    /// Text used when the reference cannot be resolved.
    pub fn describe(&self) -> String {
        match self {
            StockRef::Id { id } => id.clone(),
            StockRef::Named { name, brand } => format!("{} ({})", name, brand),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StockRef::Id { id } => validate_uuid(id),
            StockRef::Named { name, brand } => {
                validate_name("stock item", name)?;
                validate_name("brand", brand)
            }
        }
    }
}

/// A supplier or customer referenced by id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartyRef {
    Id { id: String },
    Name { name: String },
}

impl PartyRef {
    pub fn id(id: impl Into<String>) -> Self {
        PartyRef::Id { id: id.into() }
    }

    pub fn name(name: impl Into<String>) -> Self {
        PartyRef::Name { name: name.into() }
    }

    pub fn describe(&self) -> String {
        match self {
            PartyRef::Id { id } => id.clone(),
            PartyRef::Name { name } => name.clone(),
        }
    }

    fn validate(&self, field: &str) -> Result<(), ValidationError> {
        match self {
            PartyRef::Id { id } => validate_uuid(id),
            PartyRef::Name { name } => validate_name(field, name),
        }
    }
}

// =============================================================================
// Lines
// =============================================================================

/// One priced line of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDraft {
    pub item: StockRef,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price_cents: i64,
}

impl LineDraft {
    pub fn new(item: StockRef, quantity: i64, unit_price_cents: i64) -> Self {
        LineDraft {
            item,
            quantity,
            unit_price_cents,
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.item.validate()?;
        validate_quantity(self.quantity)?;
        validate_unit_price(self.unit_price_cents)
    }
}

/// Raw material consumed by a production run. Always costed at the raw
/// item's average cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDraft {
    pub item: StockRef,
    pub quantity: i64,
}

impl MaterialDraft {
    pub fn new(item: StockRef, quantity: i64) -> Self {
        MaterialDraft { item, quantity }
    }
}

fn validate_lines(document: DocumentKind, lines: &[LineDraft]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(CoreError::EmptyDocument {
            document: document.label().to_string(),
        });
    }
    for line in lines {
        line.validate()?;
    }
    Ok(())
}

fn gross_of(lines: &[LineDraft]) -> Money {
    lines.iter().map(LineDraft::line_total).sum()
}

// =============================================================================
// Invoice Draft
// =============================================================================

/// Header plus lines for every document kind except production runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub counterparty: Option<PartyRef>,
    /// Document a return is issued against.
    #[serde(default)]
    pub original_invoice_id: Option<String>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub paid_cents: i64,
    #[serde(default)]
    pub settlement: Settlement,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<LineDraft>,
}

impl InvoiceDraft {
    /// Empty draft dated `invoice_date`.
    pub fn new(invoice_date: NaiveDate) -> Self {
        InvoiceDraft {
            invoice_date,
            counterparty: None,
            original_invoice_id: None,
            discount_cents: 0,
            paid_cents: 0,
            settlement: Settlement::Cash,
            notes: None,
            lines: Vec::new(),
        }
    }

    pub fn with_counterparty(mut self, party: PartyRef) -> Self {
        self.counterparty = Some(party);
        self
    }

    pub fn with_line(mut self, line: LineDraft) -> Self {
        self.lines.push(line);
        self
    }

    pub fn with_paid(mut self, paid_cents: i64) -> Self {
        self.paid_cents = paid_cents;
        self
    }

    pub fn against(mut self, original_invoice_id: impl Into<String>) -> Self {
        self.original_invoice_id = Some(original_invoice_id.into());
        self
    }

    /// Sum of the line totals before discount.
    pub fn gross_total(&self) -> Money {
        gross_of(&self.lines)
    }

    /// Checks the draft against the rules of `kind`.
    ///
    /// ## Rules
    /// - At least one line; quantities positive, prices non-negative
    /// - Counterparty present exactly when the kind has one
    /// - `original_invoice_id` only on return kinds
    /// - Discount and paid amount only on kinds that settle money
    /// - `discount <= total`, `paid <= total - discount`
    pub fn validate(&self, kind: DocumentKind) -> CoreResult<()> {
        validate_lines(kind, &self.lines)?;

        match (kind.counterparty(), &self.counterparty) {
            (Some(role), None) => return Err(ValidationError::required(role.label()).into()),
            (Some(role), Some(party)) => party.validate(role.label())?,
            (None, Some(_)) => return Err(not_allowed("counterparty", kind)),
            (None, None) => {}
        }

        if let Some(original) = &self.original_invoice_id {
            if kind.returns_against().is_none() {
                return Err(not_allowed("original invoice", kind));
            }
            validate_uuid(original)?;
        }

        if kind.settlement_flow().is_none() {
            if self.discount_cents != 0 {
                return Err(not_allowed("discount", kind));
            }
            if self.paid_cents != 0 {
                return Err(not_allowed("paid amount", kind));
            }
        }

        if let Settlement::Bank { bank_id } = &self.settlement {
            validate_uuid(bank_id)?;
        }

        validate_totals(self.gross_total().cents(), self.discount_cents, self.paid_cents)?;
        validate_notes(self.notes.as_deref())?;
        Ok(())
    }
}

fn not_allowed(field: &str, kind: DocumentKind) -> CoreError {
    ValidationError::NotAllowed {
        field: field.to_string(),
        document: kind.label().to_string(),
    }
    .into()
}

// =============================================================================
// Production Draft
// =============================================================================

/// A production run: finished goods in, raw materials out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionDraft {
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    /// Production stock produced, valued at the line price.
    pub outputs: Vec<LineDraft>,
    /// Raw stock consumed.
    #[serde(default)]
    pub materials: Vec<MaterialDraft>,
}

impl ProductionDraft {
    pub fn new(invoice_date: NaiveDate) -> Self {
        ProductionDraft {
            invoice_date,
            notes: None,
            outputs: Vec::new(),
            materials: Vec::new(),
        }
    }

    pub fn with_output(mut self, line: LineDraft) -> Self {
        self.outputs.push(line);
        self
    }

    pub fn with_material(mut self, material: MaterialDraft) -> Self {
        self.materials.push(material);
        self
    }

    pub fn gross_total(&self) -> Money {
        gross_of(&self.outputs)
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_lines(DocumentKind::Production, &self.outputs)?;
        for material in &self.materials {
            material.item.validate()?;
            validate_quantity(material.quantity)?;
        }
        validate_amount_cents("document total", self.gross_total().cents())?;
        validate_notes(self.notes.as_deref())?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
