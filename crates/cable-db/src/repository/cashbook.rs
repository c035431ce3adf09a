//! # Cash and Bank Books
//!
//! Signed money movements. Balances are never stored; they are the sum of
//! `amount_cents` over a book.
//!
//! ## Signs
//! ```text
//! cash_in, transfer_from_bank          +amount   (cash book)
//! cash_out, transfer_to_bank           -amount
//! deposit, transfer_in                 +amount   (bank book)
//! withdraw, transfer_out               -amount
//! invoice_payment                      ±amount   (sales in, purchases out)
//! ```
//!
//! Transfers write both legs in one transaction.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use cable_core::validation::{validate_notes, validate_positive_amount};
use cable_core::{
    BankTransaction, BankTxKind, CashTransaction, CashTxKind, CoreError, Money,
    ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;
use crate::repository::catalog::require_bank;

/// Repository for the cash book and the per-bank books.
#[derive(Debug, Clone)]
pub struct CashBookRepository {
    pool: SqlitePool,
}

impl CashBookRepository {
    /// Creates a new CashBookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashBookRepository { pool }
    }

    /// Records a plain cash receipt or payment.
    ///
    /// ## Arguments
    /// * `kind` - `CashIn` or `CashOut`; transfers go through the transfer methods
    /// * `amount` - Positive amount; the sign comes from `kind`
    pub async fn record_cash(
        &self,
        kind: CashTxKind,
        amount: Money,
        date: NaiveDate,
        description: Option<&str>,
    ) -> DbResult<CashTransaction> {
        if !matches!(kind, CashTxKind::CashIn | CashTxKind::CashOut) {
            return Err(not_allowed("transfer kind", "cash entry"));
        }
        check_amount(amount, description)?;

        let mut conn = self.pool.acquire().await?;
        let row = cash_row(date, kind, amount, description, None, None);
        insert_cash_row(&mut conn, &row).await?;

        info!(kind = ?kind, amount = row.amount_cents, "Cash entry recorded");
        Ok(row)
    }

    /// Records a deposit into or withdrawal from a bank account.
    pub async fn record_bank(
        &self,
        bank_id: &str,
        kind: BankTxKind,
        amount: Money,
        date: NaiveDate,
        description: Option<&str>,
    ) -> DbResult<BankTransaction> {
        if !matches!(kind, BankTxKind::Deposit | BankTxKind::Withdraw) {
            return Err(not_allowed("transfer or invoice kind", "bank entry"));
        }
        check_amount(amount, description)?;

        let mut conn = self.pool.acquire().await?;
        require_bank(&mut conn, bank_id).await?;

        let signed = kind.flow().map(|f| f.signed(amount)).unwrap_or(amount);
        let row = bank_row(bank_id, date, kind, signed, description, None, None);
        insert_bank_row(&mut conn, &row).await?;

        info!(bank_id = %bank_id, kind = ?kind, amount = row.amount_cents, "Bank entry recorded");
        Ok(row)
    }

    /// Moves cash into a bank account.
    pub async fn transfer_cash_to_bank(
        &self,
        bank_id: &str,
        amount: Money,
        date: NaiveDate,
        description: Option<&str>,
    ) -> DbResult<()> {
        check_amount(amount, description)?;
        let mut tx = self.begin().await?;
        require_bank(&mut tx, bank_id).await?;

        let cash = cash_row(date, CashTxKind::TransferToBank, amount, description, Some(bank_id), None);
        insert_cash_row(&mut tx, &cash).await?;
        let bank = bank_row(bank_id, date, BankTxKind::Deposit, amount, description, None, None);
        insert_bank_row(&mut tx, &bank).await?;

        commit(tx).await?;
        info!(bank_id = %bank_id, amount = amount.cents(), "Cash moved to bank");
        Ok(())
    }

    /// Withdraws from a bank account into cash.
    pub async fn transfer_bank_to_cash(
        &self,
        bank_id: &str,
        amount: Money,
        date: NaiveDate,
        description: Option<&str>,
    ) -> DbResult<()> {
        check_amount(amount, description)?;
        let mut tx = self.begin().await?;
        require_bank(&mut tx, bank_id).await?;

        let bank = bank_row(bank_id, date, BankTxKind::Withdraw, -amount, description, None, None);
        insert_bank_row(&mut tx, &bank).await?;
        let cash = cash_row(date, CashTxKind::TransferFromBank, amount, description, Some(bank_id), None);
        insert_cash_row(&mut tx, &cash).await?;

        commit(tx).await?;
        info!(bank_id = %bank_id, amount = amount.cents(), "Bank moved to cash");
        Ok(())
    }

    /// Moves money between two bank accounts.
    pub async fn transfer_between_banks(
        &self,
        from_bank_id: &str,
        to_bank_id: &str,
        amount: Money,
        date: NaiveDate,
        description: Option<&str>,
    ) -> DbResult<()> {
        check_amount(amount, description)?;
        if from_bank_id == to_bank_id {
            return Err(not_allowed("same source and target bank", "bank transfer"));
        }

        let mut tx = self.begin().await?;
        require_bank(&mut tx, from_bank_id).await?;
        require_bank(&mut tx, to_bank_id).await?;

        let out = bank_row(
            from_bank_id,
            date,
            BankTxKind::TransferOut,
            -amount,
            description,
            Some(to_bank_id),
            None,
        );
        insert_bank_row(&mut tx, &out).await?;
        let incoming = bank_row(
            to_bank_id,
            date,
            BankTxKind::TransferIn,
            amount,
            description,
            Some(from_bank_id),
            None,
        );
        insert_bank_row(&mut tx, &incoming).await?;

        commit(tx).await?;
        info!(from = %from_bank_id, to = %to_bank_id, amount = amount.cents(), "Bank transfer recorded");
        Ok(())
    }

    /// Current cash in hand.
    pub async fn cash_balance(&self) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount_cents), 0) FROM cash_transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(Money::from_cents(total))
    }

    /// Current balance of one bank account.
    pub async fn bank_balance(&self, bank_id: &str) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM bank_transactions WHERE bank_id = ?1",
        )
        .bind(bank_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(total))
    }

    /// Cash book rows dated within `[from, to]`.
    pub async fn cash_transactions(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<CashTransaction>> {
        let rows: Vec<CashTransaction> = sqlx::query_as(
            r#"
            SELECT id, tx_date, kind, amount_cents, description, bank_id, invoice_number, created_at
            FROM cash_transactions
            WHERE tx_date BETWEEN ?1 AND ?2
            ORDER BY tx_date, created_at
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Bank book rows of one account dated within `[from, to]`.
    pub async fn bank_transactions(
        &self,
        bank_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<BankTransaction>> {
        let rows: Vec<BankTransaction> = sqlx::query_as(
            r#"
            SELECT id, bank_id, tx_date, kind, amount_cents, description,
                   counterparty_bank_id, invoice_number, created_at
            FROM bank_transactions
            WHERE bank_id = ?1 AND tx_date BETWEEN ?2 AND ?3
            ORDER BY tx_date, created_at
            "#,
        )
        .bind(bank_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn begin(&self) -> DbResult<sqlx::Transaction<'static, sqlx::Sqlite>> {
        begin_write(&self.pool).await
    }
}

async fn commit(tx: sqlx::Transaction<'static, sqlx::Sqlite>) -> DbResult<()> {
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

fn check_amount(amount: Money, description: Option<&str>) -> DbResult<()> {
    validate_positive_amount("amount", amount.cents()).map_err(CoreError::from)?;
    validate_notes(description).map_err(CoreError::from)?;
    Ok(())
}

fn not_allowed(field: &str, document: &str) -> DbError {
    CoreError::from(ValidationError::NotAllowed {
        field: field.to_string(),
        document: document.to_string(),
    })
    .into()
}

// =============================================================================
// Row Builders (shared with the ledger)
// =============================================================================

/// Builds a cash row; `amount` is positive, the sign comes from `kind`.
pub(crate) fn cash_row(
    date: NaiveDate,
    kind: CashTxKind,
    amount: Money,
    description: Option<&str>,
    bank_id: Option<&str>,
    invoice_number: Option<&str>,
) -> CashTransaction {
    CashTransaction {
        id: Uuid::new_v4().to_string(),
        tx_date: date,
        kind,
        amount_cents: kind.flow().signed(amount).cents(),
        description: description.map(str::to_string),
        bank_id: bank_id.map(str::to_string),
        invoice_number: invoice_number.map(str::to_string),
        created_at: Utc::now(),
    }
}

/// Builds a bank row; `signed_amount` is stored as given.
pub(crate) fn bank_row(
    bank_id: &str,
    date: NaiveDate,
    kind: BankTxKind,
    signed_amount: Money,
    description: Option<&str>,
    counterparty_bank_id: Option<&str>,
    invoice_number: Option<&str>,
) -> BankTransaction {
    BankTransaction {
        id: Uuid::new_v4().to_string(),
        bank_id: bank_id.to_string(),
        tx_date: date,
        kind,
        amount_cents: signed_amount.cents(),
        description: description.map(str::to_string),
        counterparty_bank_id: counterparty_bank_id.map(str::to_string),
        invoice_number: invoice_number.map(str::to_string),
        created_at: Utc::now(),
    }
}

pub(crate) async fn insert_cash_row(conn: &mut SqliteConnection, row: &CashTransaction) -> DbResult<()> {
    debug!(id = %row.id, kind = ?row.kind, amount = row.amount_cents, "Inserting cash row");

    sqlx::query(
        r#"
        INSERT INTO cash_transactions (
            id, tx_date, kind, amount_cents, description, bank_id, invoice_number, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&row.id)
    .bind(row.tx_date)
    .bind(row.kind)
    .bind(row.amount_cents)
    .bind(&row.description)
    .bind(&row.bank_id)
    .bind(&row.invoice_number)
    .bind(row.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_bank_row(conn: &mut SqliteConnection, row: &BankTransaction) -> DbResult<()> {
    debug!(id = %row.id, bank_id = %row.bank_id, kind = ?row.kind, amount = row.amount_cents, "Inserting bank row");

    sqlx::query(
        r#"
        INSERT INTO bank_transactions (
            id, bank_id, tx_date, kind, amount_cents, description,
            counterparty_bank_id, invoice_number, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&row.id)
    .bind(&row.bank_id)
    .bind(row.tx_date)
    .bind(row.kind)
    .bind(row.amount_cents)
    .bind(&row.description)
    .bind(&row.counterparty_bank_id)
    .bind(&row.invoice_number)
    .bind(row.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    async fn setup() -> (Database, String, String) {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let hbl = db.catalog().add_bank("HBL", Some("0001"), None).await.unwrap();
        let mcb = db.catalog().add_bank("MCB", None, None).await.unwrap();
        (db, hbl, mcb)
    }

    #[tokio::test]
    async fn test_cash_balance_is_signed_sum() {
        let (db, _, _) = setup().await;
        let book = db.cashbook();

        book.record_cash(CashTxKind::CashIn, Money::from_cents(10_000), day(1), Some("opening"))
            .await
            .unwrap();
        let out = book
            .record_cash(CashTxKind::CashOut, Money::from_cents(2_500), day(2), None)
            .await
            .unwrap();
        assert_eq!(out.amount_cents, -2_500);

        assert_eq!(book.cash_balance().await.unwrap().cents(), 7_500);
        assert_eq!(book.cash_transactions(day(1), day(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transfers_write_both_legs() {
        let (db, hbl, mcb) = setup().await;
        let book = db.cashbook();

        book.record_cash(CashTxKind::CashIn, Money::from_cents(50_000), day(1), None)
            .await
            .unwrap();
        book.transfer_cash_to_bank(&hbl, Money::from_cents(20_000), day(2), None)
            .await
            .unwrap();
        book.transfer_between_banks(&hbl, &mcb, Money::from_cents(5_000), day(3), Some("rent"))
            .await
            .unwrap();
        book.transfer_bank_to_cash(&mcb, Money::from_cents(1_000), day(4), None)
            .await
            .unwrap();

        assert_eq!(book.cash_balance().await.unwrap().cents(), 31_000);
        assert_eq!(book.bank_balance(&hbl).await.unwrap().cents(), 15_000);
        assert_eq!(book.bank_balance(&mcb).await.unwrap().cents(), 4_000);

        let mcb_rows = book.bank_transactions(&mcb, day(1), day(31)).await.unwrap();
        assert_eq!(mcb_rows[0].kind, BankTxKind::TransferIn);
        assert_eq!(mcb_rows[0].counterparty_bank_id.as_deref(), Some(hbl.as_str()));
    }

    #[tokio::test]
    async fn test_failed_transfer_writes_nothing() {
        let (db, hbl, _) = setup().await;
        let book = db.cashbook();

        let err = book
            .transfer_between_banks(&hbl, "no-such-bank", Money::from_cents(100), day(1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ReferenceNotFound { .. }));
        assert_eq!(book.bank_balance(&hbl).await.unwrap(), Money::zero());
    }

    #[tokio::test]
    async fn test_rejects_non_positive_and_transfer_kinds() {
        let (db, hbl, _) = setup().await;
        let book = db.cashbook();

        assert!(book
            .record_cash(CashTxKind::CashIn, Money::zero(), day(1), None)
            .await
            .is_err());
        assert!(book
            .record_cash(CashTxKind::TransferToBank, Money::from_cents(5), day(1), None)
            .await
            .is_err());
        assert!(book
            .record_bank(&hbl, BankTxKind::InvoicePayment, Money::from_cents(5), day(1), None)
            .await
            .is_err());

        let w = book
            .record_bank(&hbl, BankTxKind::Withdraw, Money::from_cents(5), day(1), None)
            .await
            .unwrap();
        assert_eq!(w.amount_cents, -5);
    }
}
