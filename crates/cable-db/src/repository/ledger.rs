//! # Ledger Repository
//!
//! The seven document families and their stock effects.
//!
//! ## Posting Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     create_*_invoice(draft)                             │
//! │                                                                         │
//! │  1. draft.validate(kind)              ── no I/O yet                    │
//! │  2. BEGIN (sqlx::Transaction)         ── dropped = ROLLBACK            │
//! │  3. resolve supplier/customer, stock items, original invoice           │
//! │  4. LedgerPlan::build                 ── InsufficientStock here,       │
//! │                                          before any write              │
//! │  5. reserve PREFIX-NNNNNN, INSERT header                               │
//! │  6. INSERT line items (+ material lines)                               │
//! │  7. UPDATE stock ... WHERE id = ? AND version = ?                      │
//! │  8. paid > 0 → cash or bank book row                                   │
//! │  9. COMMIT                                                             │
//! │                                                                         │
//! │  Any error in 3-8 returns early; the transaction is dropped and        │
//! │  SQLite rolls everything back.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Effects
//! ```text
//! RPI  raw purchase            raw  +q at price     supplier  cash/bank out
//! RPR  raw purchase return     raw  -q              supplier  cash/bank in
//! RUI  raw use                 raw  -q
//! PRD  production              prod +q at price, raw materials -q
//! PRR  production return       prod -q
//! SIN  sales                   prod -q              customer  cash/bank in
//! SRI  sales return            prod +q at average   customer  cash/bank out
//! ```
//!
//! Headers are immutable. A mistake is corrected by posting the matching
//! return document.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use cable_core::ledger::{
    check_return_quantities, LedgerPlan, Movement, ReturnAllowance, ReturnLine, StockPosition,
};
use cable_core::numbering::format_invoice_number;
use cable_core::{
    BankTxKind, CashTxKind, CoreError, CounterpartyRole, Direction, DocumentKind, Flow,
    InvoiceDraft, InvoiceHeader, InvoiceLine, LineDraft, Money, PostedInvoice, ProductionDraft,
    Settlement, StockItem, StockKind, ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::cashbook::{bank_row, cash_row, insert_bank_row, insert_cash_row};
use crate::repository::begin_write;
use crate::repository::catalog::{require_bank, resolve_party, resolve_stock};

/// Repository for inventory ledger operations.
///
/// ## Usage
/// ```rust,ignore
/// let draft = InvoiceDraft::new(today)
///     .with_counterparty(PartyRef::name("Punjab Copper"))
///     .with_line(LineDraft::new(StockRef::named("Copper 10mm", "Fast"), 50, 100));
///
/// let posted = db.ledger().create_raw_purchase_invoice(&draft).await?;
/// println!("{}", posted.invoice_number); // RPI-000001
/// ```
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Raw material bought from a supplier.
    ///
    /// Unknown `(name, brand)` items are registered on the fly.
    pub async fn create_raw_purchase_invoice(&self, draft: &InvoiceDraft) -> DbResult<PostedInvoice> {
        self.create_invoice(DocumentKind::RawPurchase, draft).await
    }

    /// Raw material sent back to a supplier.
    pub async fn create_raw_purchase_return_invoice(
        &self,
        draft: &InvoiceDraft,
    ) -> DbResult<PostedInvoice> {
        self.create_invoice(DocumentKind::RawPurchaseReturn, draft).await
    }

    /// Raw material consumed outside a production run.
    pub async fn create_raw_use_invoice(&self, draft: &InvoiceDraft) -> DbResult<PostedInvoice> {
        self.create_invoice(DocumentKind::RawUse, draft).await
    }

    /// Finished goods taken back out of production stock.
    pub async fn create_production_return_invoice(
        &self,
        draft: &InvoiceDraft,
    ) -> DbResult<PostedInvoice> {
        self.create_invoice(DocumentKind::ProductionReturn, draft).await
    }

    /// Finished goods sold to a customer.
    pub async fn create_sales_invoice(&self, draft: &InvoiceDraft) -> DbResult<PostedInvoice> {
        self.create_invoice(DocumentKind::Sales, draft).await
    }

    /// Finished goods returned by a customer, valued at current average cost.
    pub async fn create_sales_return_invoice(&self, draft: &InvoiceDraft) -> DbResult<PostedInvoice> {
        self.create_invoice(DocumentKind::SalesReturn, draft).await
    }

    /// A production run: outputs into production stock, materials out of
    /// raw stock, both in one transaction.
    pub async fn create_production_invoice(&self, draft: &ProductionDraft) -> DbResult<PostedInvoice> {
        let result = self.post_production(draft).await;
        log_outcome(DocumentKind::Production, &result);
        result
    }

    /// Posts any non-production document kind.
    ///
    /// Production runs carry material lines and go through
    /// [`create_production_invoice`](Self::create_production_invoice).
    pub async fn create_invoice(
        &self,
        kind: DocumentKind,
        draft: &InvoiceDraft,
    ) -> DbResult<PostedInvoice> {
        if kind == DocumentKind::Production {
            return Err(CoreError::from(ValidationError::NotAllowed {
                field: "invoice draft".to_string(),
                document: kind.label().to_string(),
            })
            .into());
        }

        let result = self.post_invoice(kind, draft).await;
        log_outcome(kind, &result);
        result
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Gets a posted header by ID.
    pub async fn invoice(&self, kind: DocumentKind, id: &str) -> DbResult<Option<InvoiceHeader>> {
        let mut conn = self.pool.acquire().await?;
        fetch_header(&mut conn, kind, id).await
    }

    /// Gets a posted header by its invoice number.
    pub async fn invoice_by_number(
        &self,
        kind: DocumentKind,
        invoice_number: &str,
    ) -> DbResult<Option<InvoiceHeader>> {
        let sql = format!("{} WHERE invoice_number = ?1", header_select(kind));
        let header: Option<InvoiceHeader> = sqlx::query_as(&sql)
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(header)
    }

    /// Gets the line items of a posted document, in entry order.
    pub async fn invoice_lines(&self, kind: DocumentKind, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        let sql = format!(
            r#"
            SELECT id, invoice_id, stock_id, quantity, unit_price_cents,
                   line_total_cents, unit_cost_cents, created_at
            FROM {}
            WHERE invoice_id = ?1
            ORDER BY rowid
            "#,
            kind.item_table()
        );
        let lines: Vec<InvoiceLine> = sqlx::query_as(&sql)
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(lines)
    }

    /// Raw material lines of a production run as `(stock_id, quantity, line_cost_cents)`.
    pub async fn material_lines(&self, invoice_id: &str) -> DbResult<Vec<(String, i64, i64)>> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT stock_id, quantity, line_cost_cents
            FROM production_material_items
            WHERE invoice_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // =========================================================================
    // Posting
    // =========================================================================

    async fn post_invoice(&self, kind: DocumentKind, draft: &InvoiceDraft) -> DbResult<PostedInvoice> {
        draft.validate(kind)?;

        let mut tx = begin_write(&self.pool).await?;

        // ----- resolve references -----
        let counterparty_id = match (kind.counterparty(), &draft.counterparty) {
            (Some(role), Some(party)) => Some(resolve_party(&mut tx, role, party).await?),
            _ => None,
        };

        let original = match (&draft.original_invoice_id, kind.returns_against()) {
            (Some(original_id), Some(against)) => {
                let header = fetch_header(&mut tx, against, original_id)
                    .await?
                    .ok_or_else(|| DbError::missing_reference(against.label(), original_id.clone()))?;
                if header.counterparty_id != counterparty_id {
                    return Err(CoreError::from(ValidationError::InvalidFormat {
                        field: "original invoice".to_string(),
                        reason: format!("{} belongs to a different party", header.invoice_number),
                    })
                    .into());
                }
                Some(header)
            }
            _ => None,
        };

        let stock_kind = kind.stock_kind();
        let mut items: Vec<StockItem> = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            items.push(resolve_stock(&mut tx, stock_kind, &line.item, kind.creates_items()).await?);
        }
        debug!(kind = kind.prefix(), lines = items.len(), "References resolved");

        // ----- plan before writing -----
        if let Some(original) = &original {
            let allowances = return_allowances(&mut tx, kind, original).await?;
            let requested: Vec<ReturnLine> = draft
                .lines
                .iter()
                .zip(&items)
                .map(|(line, item)| ReturnLine {
                    stock_id: item.id.clone(),
                    item: item.name.clone(),
                    quantity: line.quantity,
                })
                .collect();
            check_return_quantities(&original.invoice_number, &allowances, &requested)?;
        }

        let movements: Vec<Movement> = draft
            .lines
            .iter()
            .zip(&items)
            .map(|(line, item)| movement_for(kind, line, item))
            .collect();
        let plan = LedgerPlan::build(positions_of(stock_kind, &items), &movements)?;

        // ----- write -----
        let invoice_number = reserve_invoice_number(&mut tx, kind).await?;
        let total = draft.gross_total();
        let header = InvoiceHeader {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            counterparty_id,
            original_invoice_id: original.as_ref().map(|h| h.id.clone()),
            invoice_date: draft.invoice_date,
            total_cents: total.cents(),
            discount_cents: draft.discount_cents,
            paid_cents: draft.paid_cents,
            notes: draft.notes.clone(),
            created_at: Utc::now(),
        };
        insert_header(&mut tx, kind, &header).await?;

        for ((line, item), unit_cost) in draft.lines.iter().zip(&items).zip(&plan.line_costs) {
            insert_line(&mut tx, kind, &header, line, &item.id, *unit_cost).await?;
        }

        for position in &plan.positions {
            apply_position(&mut tx, position).await?;
        }

        if draft.paid_cents > 0 {
            record_settlement(&mut tx, kind, &draft.settlement, &header).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(PostedInvoice {
            id: header.id,
            invoice_number: header.invoice_number,
            kind,
        })
    }

    async fn post_production(&self, draft: &ProductionDraft) -> DbResult<PostedInvoice> {
        let kind = DocumentKind::Production;
        draft.validate()?;

        let mut tx = begin_write(&self.pool).await?;

        let mut outputs: Vec<StockItem> = Vec::with_capacity(draft.outputs.len());
        for line in &draft.outputs {
            outputs.push(resolve_stock(&mut tx, StockKind::Production, &line.item, true).await?);
        }
        let mut materials: Vec<StockItem> = Vec::with_capacity(draft.materials.len());
        for material in &draft.materials {
            materials.push(resolve_stock(&mut tx, StockKind::Raw, &material.item, false).await?);
        }
        debug!(
            outputs = outputs.len(),
            materials = materials.len(),
            "Production references resolved"
        );

        let mut movements: Vec<Movement> = draft
            .outputs
            .iter()
            .zip(&outputs)
            .map(|(line, item)| movement_for(kind, line, item))
            .collect();
        movements.extend(
            draft
                .materials
                .iter()
                .zip(&materials)
                .map(|(material, item)| Movement::outbound(item.id.clone(), material.quantity)),
        );

        let mut positions = positions_of(StockKind::Production, &outputs);
        positions.extend(positions_of(StockKind::Raw, &materials));
        let plan = LedgerPlan::build(positions, &movements)?;

        let invoice_number = reserve_invoice_number(&mut tx, kind).await?;
        let header = InvoiceHeader {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            counterparty_id: None,
            original_invoice_id: None,
            invoice_date: draft.invoice_date,
            total_cents: draft.gross_total().cents(),
            discount_cents: 0,
            paid_cents: 0,
            notes: draft.notes.clone(),
            created_at: Utc::now(),
        };
        insert_header(&mut tx, kind, &header).await?;

        let (output_costs, material_costs) = plan.line_costs.split_at(outputs.len());
        for ((line, item), unit_cost) in draft.outputs.iter().zip(&outputs).zip(output_costs) {
            insert_line(&mut tx, kind, &header, line, &item.id, *unit_cost).await?;
        }

        let material_values = &plan.cost_moved[outputs.len()..];
        for (((material, item), unit_cost), value) in draft
            .materials
            .iter()
            .zip(&materials)
            .zip(material_costs)
            .zip(material_values)
        {
            sqlx::query(
                r#"
                INSERT INTO production_material_items (
                    id, invoice_id, stock_id, quantity, unit_cost_cents, line_cost_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&header.id)
            .bind(&item.id)
            .bind(material.quantity)
            .bind(unit_cost.cents())
            .bind(value.cents())
            .bind(header.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for position in &plan.positions {
            apply_position(&mut tx, position).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(PostedInvoice {
            id: header.id,
            invoice_number: header.invoice_number,
            kind,
        })
    }
}

fn log_outcome(kind: DocumentKind, result: &DbResult<PostedInvoice>) {
    match result {
        Ok(posted) => info!(
            kind = kind.prefix(),
            invoice_number = %posted.invoice_number,
            "Document posted"
        ),
        Err(e) => warn!(kind = kind.prefix(), error = %e, "Document rejected, nothing written"),
    }
}

// =============================================================================
// Planning Helpers
// =============================================================================

fn movement_for(kind: DocumentKind, line: &LineDraft, item: &StockItem) -> Movement {
    match kind.direction() {
        Direction::Inbound if kind.values_at_price() => {
            Movement::inbound_at_price(item.id.clone(), line.quantity, line.unit_price())
        }
        Direction::Inbound => Movement::inbound_at_average(item.id.clone(), line.quantity),
        Direction::Outbound => Movement::outbound(item.id.clone(), line.quantity),
    }
}

/// One position per distinct row, as read inside the transaction.
fn positions_of(kind: StockKind, items: &[StockItem]) -> Vec<StockPosition> {
    let mut positions: Vec<StockPosition> = Vec::with_capacity(items.len());
    for item in items {
        if !positions.iter().any(|p| p.stock_id == item.id) {
            positions.push(StockPosition::from_item(kind, item));
        }
    }
    positions
}

/// What each item of `original` may still be returned.
async fn return_allowances(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    original: &InvoiceHeader,
) -> DbResult<Vec<ReturnAllowance>> {
    let Some(against) = kind.returns_against() else {
        return Ok(Vec::new());
    };

    let original_sql = format!(
        "SELECT stock_id, SUM(quantity) FROM {} WHERE invoice_id = ?1 GROUP BY stock_id",
        against.item_table()
    );
    let moved: Vec<(String, i64)> = sqlx::query_as(&original_sql)
        .bind(&original.id)
        .fetch_all(&mut *conn)
        .await?;

    let returned_sql = format!(
        r#"
        SELECT i.stock_id, SUM(i.quantity)
        FROM {items} i
        JOIN {header} h ON h.id = i.invoice_id
        WHERE h.original_invoice_id = ?1
        GROUP BY i.stock_id
        "#,
        items = kind.item_table(),
        header = kind.header_table()
    );
    let returned: Vec<(String, i64)> = sqlx::query_as(&returned_sql)
        .bind(&original.id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(moved
        .into_iter()
        .map(|(stock_id, qty)| {
            let already = returned
                .iter()
                .find(|(id, _)| *id == stock_id)
                .map(|(_, q)| *q)
                .unwrap_or(0);
            ReturnAllowance {
                item: stock_id.clone(),
                stock_id,
                original: qty,
                returned: already,
            }
        })
        .collect())
}

// =============================================================================
// Statement Helpers
// =============================================================================

fn counterparty_column(kind: DocumentKind) -> Option<&'static str> {
    kind.counterparty().map(|role: CounterpartyRole| role.column())
}

/// `SELECT` list producing an [`InvoiceHeader`] for any document kind.
fn header_select(kind: DocumentKind) -> String {
    let counterparty = counterparty_column(kind).unwrap_or("NULL");
    let original = if kind.returns_against().is_some() {
        "original_invoice_id"
    } else {
        "NULL"
    };
    format!(
        r#"
        SELECT id, invoice_number, {counterparty} AS counterparty_id,
               {original} AS original_invoice_id, invoice_date,
               total_cents, discount_cents, paid_cents, notes, created_at
        FROM {}
        "#,
        kind.header_table()
    )
}

pub(crate) async fn fetch_header(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    id: &str,
) -> DbResult<Option<InvoiceHeader>> {
    let sql = format!("{} WHERE id = ?1", header_select(kind));
    let header: Option<InvoiceHeader> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(header)
}

/// Reserves the next number for `kind` inside the caller's transaction.
///
/// The counter never falls behind the number of existing headers, so a
/// store whose numbers were derived from row counts continues from there.
async fn reserve_invoice_number(conn: &mut SqliteConnection, kind: DocumentKind) -> DbResult<String> {
    sqlx::query("INSERT INTO invoice_sequences (prefix, last_value) VALUES (?1, 0) ON CONFLICT(prefix) DO NOTHING")
        .bind(kind.prefix())
        .execute(&mut *conn)
        .await?;

    let sql = format!(
        r#"
        UPDATE invoice_sequences
        SET last_value = MAX(last_value, (SELECT COUNT(*) FROM {})) + 1
        WHERE prefix = ?1
        RETURNING last_value
        "#,
        kind.header_table()
    );
    let next: i64 = sqlx::query_scalar(&sql)
        .bind(kind.prefix())
        .fetch_one(&mut *conn)
        .await?;

    let number = format_invoice_number(kind.prefix(), next as u64);
    debug!(invoice_number = %number, "Invoice number reserved");
    Ok(number)
}

async fn insert_header(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    header: &InvoiceHeader,
) -> DbResult<()> {
    debug!(id = %header.id, invoice_number = %header.invoice_number, "Inserting header");

    let mut columns = vec!["id", "invoice_number"];
    if let Some(column) = counterparty_column(kind) {
        columns.push(column);
    }
    if kind.returns_against().is_some() {
        columns.push("original_invoice_id");
    }
    columns.extend([
        "invoice_date",
        "total_cents",
        "discount_cents",
        "paid_cents",
        "notes",
        "created_at",
    ]);
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        kind.header_table(),
        columns.join(", "),
        placeholders.join(", ")
    );

    let mut query = sqlx::query(&sql)
        .bind(&header.id)
        .bind(&header.invoice_number);
    if kind.counterparty().is_some() {
        query = query.bind(&header.counterparty_id);
    }
    if kind.returns_against().is_some() {
        query = query.bind(&header.original_invoice_id);
    }
    query
        .bind(header.invoice_date)
        .bind(header.total_cents)
        .bind(header.discount_cents)
        .bind(header.paid_cents)
        .bind(&header.notes)
        .bind(header.created_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Lines share their header's `created_at`.
async fn insert_line(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    header: &InvoiceHeader,
    line: &LineDraft,
    stock_id: &str,
    unit_cost: Money,
) -> DbResult<()> {
    let sql = format!(
        r#"
        INSERT INTO {} (
            id, invoice_id, stock_id, quantity,
            unit_price_cents, line_total_cents, unit_cost_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        kind.item_table()
    );
    sqlx::query(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(&header.id)
        .bind(stock_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.line_total().cents())
        .bind(unit_cost.cents())
        .bind(header.created_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Writes a planned position if nobody else touched the row since it was read.
async fn apply_position(conn: &mut SqliteConnection, position: &StockPosition) -> DbResult<()> {
    let sql = format!(
        r#"
        UPDATE {} SET
            quantity = ?1,
            unit_cost_cents = ?2,
            total_cost_cents = ?3,
            version = version + 1,
            updated_at = ?4
        WHERE id = ?5 AND version = ?6
        "#,
        position.kind.table()
    );
    let result = sqlx::query(&sql)
        .bind(position.quantity)
        .bind(position.unit_cost.cents())
        .bind(position.total_cost.cents())
        .bind(Utc::now())
        .bind(&position.stock_id)
        .bind(position.version)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::ConcurrentModification {
            entity: position.kind.label().to_string(),
            id: position.stock_id.clone(),
        });
    }

    debug!(
        stock_id = %position.stock_id,
        quantity = position.quantity,
        total_cost = position.total_cost.cents(),
        "Stock position applied"
    );
    Ok(())
}

/// Books the paid part of a document in the cash or bank book.
async fn record_settlement(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    settlement: &Settlement,
    header: &InvoiceHeader,
) -> DbResult<()> {
    let Some(flow) = kind.settlement_flow() else {
        return Ok(());
    };
    let paid = Money::from_cents(header.paid_cents);
    let description = format!("{} {}", kind.label(), header.invoice_number);

    match settlement {
        Settlement::Cash => {
            let cash_kind = match flow {
                Flow::Inflow => CashTxKind::CashIn,
                Flow::Outflow => CashTxKind::CashOut,
            };
            let row = cash_row(
                header.invoice_date,
                cash_kind,
                paid,
                Some(&description),
                None,
                Some(&header.invoice_number),
            );
            insert_cash_row(conn, &row).await
        }
        Settlement::Bank { bank_id } => {
            require_bank(conn, bank_id).await?;
            let row = bank_row(
                bank_id,
                header.invoice_date,
                BankTxKind::InvoicePayment,
                flow.signed(paid),
                Some(&description),
                None,
                Some(&header.invoice_number),
            );
            insert_bank_row(conn, &row).await
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cable_core::NewStockItem;

    async fn setup() -> (Database, StockItem) {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let maker = db.catalog().add_manufacturer("Fast Group", None).await.unwrap();
        let brand = db.catalog().add_brand("Fast", &maker).await.unwrap();
        let item = db
            .catalog()
            .add_stock_item(StockKind::Raw, &NewStockItem::new("Copper 10mm", brand))
            .await
            .unwrap();
        (db, item)
    }

    #[tokio::test]
    async fn test_stale_position_is_rejected() {
        let (db, item) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let mut position = StockPosition::from_item(StockKind::Raw, &item);
        position.receive(5, Money::from_cents(500)).unwrap();
        apply_position(&mut conn, &position).await.unwrap();

        // same read version again: someone already wrote this row
        let err = apply_position(&mut conn, &position).await.unwrap_err();
        assert!(matches!(err, DbError::ConcurrentModification { .. }));

        let stored = crate::repository::catalog::fetch_stock_item(&mut conn, StockKind::Raw, &item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((stored.quantity, stored.version), (5, 1));
    }

    #[tokio::test]
    async fn test_reserved_numbers_are_sequential() {
        let (db, _) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = reserve_invoice_number(&mut conn, DocumentKind::Sales).await.unwrap();
        let second = reserve_invoice_number(&mut conn, DocumentKind::Sales).await.unwrap();
        let other = reserve_invoice_number(&mut conn, DocumentKind::RawUse).await.unwrap();

        assert_eq!(first, "SIN-000001");
        assert_eq!(second, "SIN-000002");
        assert_eq!(other, "RUI-000001");
    }

    #[test]
    fn test_header_select_shapes() {
        let sales = header_select(DocumentKind::Sales);
        assert!(sales.contains("customer_id AS counterparty_id"));
        assert!(sales.contains("NULL AS original_invoice_id"));

        let returns = header_select(DocumentKind::ProductionReturn);
        assert!(returns.contains("NULL AS counterparty_id"));
        assert!(returns.contains("original_invoice_id AS original_invoice_id"));
    }
}
