//! # Payroll Repository
//!
//! Employees, daily attendance, salary advances, loans and monthly slips.
//!
//! Advances and loans are paid out of the cash book and repayments come
//! back into it, each in the same transaction as the payroll row.
//!
//! ```text
//! net pay = monthly salary
//!         - advances dated in the month
//!         - loan repayments dated in the month
//! ```

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use cable_core::validation::{validate_amount_cents, validate_name, validate_notes, validate_positive_amount};
use cable_core::{
    AttendanceStatus, CashTxKind, CoreError, Employee, Money, NewEmployee, SalarySlip,
    ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;
use crate::repository::cashbook::{cash_row, insert_cash_row};

/// Attendance counts for one employee over one month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AttendanceSummary {
    pub present: i64,
    pub absent: i64,
    pub leave: i64,
}

/// Repository for payroll records.
#[derive(Debug, Clone)]
pub struct PayrollRepository {
    pool: SqlitePool,
}

impl PayrollRepository {
    /// Creates a new PayrollRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PayrollRepository { pool }
    }

    // =========================================================================
    // Employees
    // =========================================================================

    pub async fn add_employee(&self, employee: &NewEmployee) -> DbResult<Employee> {
        validate_name("employee", &employee.name).map_err(CoreError::from)?;
        validate_amount_cents("monthly salary", employee.monthly_salary_cents)
            .map_err(CoreError::from)?;

        let row = Employee {
            id: Uuid::new_v4().to_string(),
            name: employee.name.trim().to_string(),
            designation: employee.designation.clone(),
            phone: employee.phone.clone(),
            monthly_salary_cents: employee.monthly_salary_cents,
            joined_on: employee.joined_on,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO employees (
                id, name, designation, phone, monthly_salary_cents,
                joined_on, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.designation)
        .bind(&row.phone)
        .bind(row.monthly_salary_cents)
        .bind(row.joined_on)
        .bind(row.is_active)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %row.id, name = %row.name, "Employee added");
        Ok(row)
    }

    /// Active employees, ordered by name.
    pub async fn employees(&self) -> DbResult<Vec<Employee>> {
        let rows: Vec<Employee> = sqlx::query_as(
            r#"
            SELECT id, name, designation, phone, monthly_salary_cents,
                   joined_on, is_active, created_at
            FROM employees
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn employee(&self, id: &str) -> DbResult<Option<Employee>> {
        let mut conn = self.pool.acquire().await?;
        fetch_employee(&mut conn, id).await
    }

    // =========================================================================
    // Attendance
    // =========================================================================

    /// Marks one day. Marking the same day again replaces the status.
    pub async fn mark_attendance(
        &self,
        employee_id: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        require_employee(&mut conn, employee_id).await?;

        sqlx::query(
            r#"
            INSERT INTO attendance (id, employee_id, attendance_date, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(employee_id, attendance_date) DO UPDATE SET status = excluded.status
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(employee_id)
        .bind(date)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        debug!(employee_id = %employee_id, %date, ?status, "Attendance marked");
        Ok(())
    }

    pub async fn attendance_summary(
        &self,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> DbResult<AttendanceSummary> {
        let (first, last) = month_bounds(year, month)?;
        let mut conn = self.pool.acquire().await?;
        attendance_between(&mut conn, employee_id, first, last).await
    }

    // =========================================================================
    // Advances & Loans
    // =========================================================================

    /// Pays a salary advance out of the cash book.
    pub async fn record_advance(
        &self,
        employee_id: &str,
        date: NaiveDate,
        amount: Money,
        description: Option<&str>,
    ) -> DbResult<String> {
        validate_positive_amount("advance", amount.cents()).map_err(CoreError::from)?;
        validate_notes(description).map_err(CoreError::from)?;

        let mut tx = begin_write(&self.pool).await?;
        let employee = require_employee(&mut tx, employee_id).await?;

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO advances (id, employee_id, advance_date, amount_cents, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(employee_id)
        .bind(date)
        .bind(amount.cents())
        .bind(description)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let note = format!("Salary advance: {}", employee.name);
        insert_cash_row(&mut tx, &cash_row(date, CashTxKind::CashOut, amount, Some(&note), None, None))
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(employee_id = %employee_id, amount = amount.cents(), "Advance recorded");
        Ok(id)
    }

    /// Pays out a loan from the cash book.
    pub async fn record_loan(
        &self,
        employee_id: &str,
        date: NaiveDate,
        amount: Money,
        description: Option<&str>,
    ) -> DbResult<String> {
        validate_positive_amount("loan", amount.cents()).map_err(CoreError::from)?;
        validate_notes(description).map_err(CoreError::from)?;

        let mut tx = begin_write(&self.pool).await?;
        let employee = require_employee(&mut tx, employee_id).await?;

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO loans (id, employee_id, loan_date, amount_cents, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(employee_id)
        .bind(date)
        .bind(amount.cents())
        .bind(description)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let note = format!("Loan: {}", employee.name);
        insert_cash_row(&mut tx, &cash_row(date, CashTxKind::CashOut, amount, Some(&note), None, None))
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(employee_id = %employee_id, amount = amount.cents(), "Loan recorded");
        Ok(id)
    }

    /// Records a repayment; it may not exceed the outstanding balance.
    pub async fn record_loan_repayment(
        &self,
        employee_id: &str,
        date: NaiveDate,
        amount: Money,
    ) -> DbResult<String> {
        validate_positive_amount("repayment", amount.cents()).map_err(CoreError::from)?;

        let mut tx = begin_write(&self.pool).await?;
        let employee = require_employee(&mut tx, employee_id).await?;

        let outstanding = outstanding_for(&mut tx, employee_id).await?;
        if amount > outstanding {
            return Err(CoreError::from(ValidationError::OutOfRange {
                field: "repayment".to_string(),
                min: 1,
                max: outstanding.cents(),
            })
            .into());
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO loan_repayments (id, employee_id, repayment_date, amount_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(employee_id)
        .bind(date)
        .bind(amount.cents())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let note = format!("Loan repayment: {}", employee.name);
        insert_cash_row(&mut tx, &cash_row(date, CashTxKind::CashIn, amount, Some(&note), None, None))
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(employee_id = %employee_id, amount = amount.cents(), "Loan repayment recorded");
        Ok(id)
    }

    /// Loans paid out minus repayments received.
    pub async fn outstanding_loan(&self, employee_id: &str) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        require_employee(&mut conn, employee_id).await?;
        outstanding_for(&mut conn, employee_id).await
    }

    // =========================================================================
    // Salary
    // =========================================================================

    /// Computes the salary slip for a calendar month.
    ///
    /// ## Returns
    /// Net pay may be negative when deductions exceed the salary; the slip
    /// reports it as-is.
    pub async fn salary_slip(&self, employee_id: &str, year: i32, month: u32) -> DbResult<SalarySlip> {
        let (first, last) = month_bounds(year, month)?;
        let mut conn = self.pool.acquire().await?;
        let employee = require_employee(&mut conn, employee_id).await?;

        let advances: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0) FROM advances
            WHERE employee_id = ?1 AND advance_date BETWEEN ?2 AND ?3
            "#,
        )
        .bind(employee_id)
        .bind(first)
        .bind(last)
        .fetch_one(&mut *conn)
        .await?;

        let repayments: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0) FROM loan_repayments
            WHERE employee_id = ?1 AND repayment_date BETWEEN ?2 AND ?3
            "#,
        )
        .bind(employee_id)
        .bind(first)
        .bind(last)
        .fetch_one(&mut *conn)
        .await?;

        let attendance = attendance_between(&mut conn, employee_id, first, last).await?;

        let gross = employee.monthly_salary_cents;
        Ok(SalarySlip {
            employee_id: employee.id,
            year,
            month,
            gross_cents: gross,
            advances_cents: advances,
            loan_repayments_cents: repayments,
            net_cents: gross - advances - repayments,
            days_present: attendance.present,
            days_absent: attendance.absent,
            days_leave: attendance.leave,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// First and last day of a calendar month.
fn month_bounds(year: i32, month: u32) -> DbResult<(NaiveDate, NaiveDate)> {
    let out_of_range = || {
        DbError::from(CoreError::from(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        }))
    };

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(out_of_range)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(out_of_range)?;

    let last = next.pred_opt().ok_or_else(out_of_range)?;
    Ok((first, last))
}

async fn fetch_employee(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Employee>> {
    let row: Option<Employee> = sqlx::query_as(
        r#"
        SELECT id, name, designation, phone, monthly_salary_cents,
               joined_on, is_active, created_at
        FROM employees
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

async fn require_employee(conn: &mut SqliteConnection, id: &str) -> DbResult<Employee> {
    fetch_employee(conn, id)
        .await?
        .ok_or_else(|| DbError::missing_reference("employee", id))
}

async fn outstanding_for(conn: &mut SqliteConnection, employee_id: &str) -> DbResult<Money> {
    let cents: i64 = sqlx::query_scalar(
        r#"
        SELECT
            (SELECT COALESCE(SUM(amount_cents), 0) FROM loans WHERE employee_id = ?1)
          - (SELECT COALESCE(SUM(amount_cents), 0) FROM loan_repayments WHERE employee_id = ?1)
        "#,
    )
    .bind(employee_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(Money::from_cents(cents))
}

async fn attendance_between(
    conn: &mut SqliteConnection,
    employee_id: &str,
    first: NaiveDate,
    last: NaiveDate,
) -> DbResult<AttendanceSummary> {
    let summary: AttendanceSummary = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN status = 'present' THEN 1 ELSE 0 END), 0) AS present,
            COALESCE(SUM(CASE WHEN status = 'absent' THEN 1 ELSE 0 END), 0) AS absent,
            COALESCE(SUM(CASE WHEN status = 'leave' THEN 1 ELSE 0 END), 0) AS leave
        FROM attendance
        WHERE employee_id = ?1 AND attendance_date BETWEEN ?2 AND ?3
        "#,
    )
    .bind(employee_id)
    .bind(first)
    .bind(last)
    .fetch_one(&mut *conn)
    .await?;
    Ok(summary)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    async fn setup() -> (Database, Employee) {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let employee = db
            .payroll()
            .add_employee(&NewEmployee::new("Bilal", 3_000_000, day(1)).with_designation("Machine operator"))
            .await
            .unwrap();
        (db, employee)
    }

    #[test]
    fn test_month_bounds() {
        let (first, last) = month_bounds(2024, 2).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(month_bounds(2023, 12).unwrap().1, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert!(month_bounds(2024, 13).is_err());
    }

    #[tokio::test]
    async fn test_attendance_one_row_per_day() {
        let (db, employee) = setup().await;
        let payroll = db.payroll();

        payroll.mark_attendance(&employee.id, day(4), AttendanceStatus::Absent).await.unwrap();
        payroll.mark_attendance(&employee.id, day(4), AttendanceStatus::Present).await.unwrap();
        payroll.mark_attendance(&employee.id, day(5), AttendanceStatus::Leave).await.unwrap();

        let summary = payroll.attendance_summary(&employee.id, 2024, 3).await.unwrap();
        assert_eq!(summary, AttendanceSummary { present: 1, absent: 0, leave: 1 });

        let err = payroll
            .mark_attendance("nobody", day(4), AttendanceStatus::Present)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ReferenceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_salary_slip_deducts_month_only() {
        let (db, employee) = setup().await;
        let payroll = db.payroll();

        payroll.record_loan(&employee.id, day(2), Money::from_cents(500_000), None).await.unwrap();
        payroll.record_advance(&employee.id, day(10), Money::from_cents(200_000), None).await.unwrap();
        payroll.record_loan_repayment(&employee.id, day(28), Money::from_cents(100_000)).await.unwrap();
        // next month, not deducted from March
        payroll
            .record_advance(&employee.id, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), Money::from_cents(50_000), None)
            .await
            .unwrap();

        let slip = payroll.salary_slip(&employee.id, 2024, 3).await.unwrap();
        assert_eq!(slip.gross_cents, 3_000_000);
        assert_eq!(slip.advances_cents, 200_000);
        assert_eq!(slip.loan_repayments_cents, 100_000);
        assert_eq!(slip.net(), Money::from_cents(2_700_000));

        assert_eq!(payroll.outstanding_loan(&employee.id).await.unwrap(), Money::from_cents(400_000));

        // loan and advances out, repayment in
        assert_eq!(db.cashbook().cash_balance().await.unwrap(), Money::from_cents(-650_000));
    }

    #[tokio::test]
    async fn test_repayment_capped_by_outstanding() {
        let (db, employee) = setup().await;
        let payroll = db.payroll();
        payroll.record_loan(&employee.id, day(2), Money::from_cents(1_000), None).await.unwrap();

        let err = payroll
            .record_loan_repayment(&employee.id, day(3), Money::from_cents(1_001))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))));
        assert_eq!(payroll.outstanding_loan(&employee.id).await.unwrap(), Money::from_cents(1_000));
    }
}
