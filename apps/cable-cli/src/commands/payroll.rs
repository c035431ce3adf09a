//! # Payroll Commands
//!
//! Employees are addressed by id or by exact name (case-insensitive).

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use serde_json::json;

use cable_core::{AttendanceStatus, Money, NewEmployee};
use cable_db::Database;

use super::{parse_amount, to_json, today, CommandOutcome, CommandResult};
use crate::config::CliConfig;
use crate::error::{ApiError, ErrorCode};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Attendance {
    Present,
    Absent,
    Leave,
}

impl From<Attendance> for AttendanceStatus {
    fn from(value: Attendance) -> Self {
        match value {
            Attendance::Present => AttendanceStatus::Present,
            Attendance::Absent => AttendanceStatus::Absent,
            Attendance::Leave => AttendanceStatus::Leave,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum PayrollCommand {
    /// Add an employee
    Hire {
        name: String,
        /// Monthly salary in rupees
        #[arg(value_parser = parse_amount)]
        salary: i64,
        #[arg(long)]
        joined: Option<NaiveDate>,
        #[arg(long)]
        designation: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// List active employees
    List,

    /// Mark one day's attendance
    Attend {
        employee: String,
        status: Attendance,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Pay a salary advance from cash
    Advance {
        employee: String,
        #[arg(value_parser = parse_amount)]
        amount: i64,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Lend money from cash
    Loan {
        employee: String,
        #[arg(value_parser = parse_amount)]
        amount: i64,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Receive a loan repayment into cash
    Repay {
        employee: String,
        #[arg(value_parser = parse_amount)]
        amount: i64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Outstanding loan balance
    Outstanding { employee: String },

    /// Salary slip for a month
    Slip {
        employee: String,
        year: i32,
        month: u32,
    },
}

pub async fn run(db: &Database, config: &CliConfig, command: PayrollCommand) -> CommandResult<serde_json::Value> {
    let payroll = db.payroll();

    match command {
        PayrollCommand::Hire {
            name,
            salary,
            joined,
            designation,
            phone,
        } => {
            let mut hire = NewEmployee::new(name, salary, joined.unwrap_or_else(today));
            hire.designation = designation;
            hire.phone = phone;
            to_json(&payroll.add_employee(&hire).await?)
        }
        PayrollCommand::List => to_json(&payroll.employees().await?),
        PayrollCommand::Attend { employee, status, date } => {
            let id = employee_id(db, &employee).await?;
            let date = date.unwrap_or_else(today);
            payroll.mark_attendance(&id, date, status.into()).await?;
            to_json(&CommandOutcome::success(format!("{} marked {:?} on {}", employee, status, date)))
        }
        PayrollCommand::Advance {
            employee,
            amount,
            date,
            description,
        } => {
            let id = employee_id(db, &employee).await?;
            payroll
                .record_advance(&id, date.unwrap_or_else(today), Money::from_cents(amount), description.as_deref())
                .await?;
            to_json(&CommandOutcome::success(format!(
                "advance of {} paid to {}",
                config.format_currency(amount),
                employee
            )))
        }
        PayrollCommand::Loan {
            employee,
            amount,
            date,
            description,
        } => {
            let id = employee_id(db, &employee).await?;
            payroll
                .record_loan(&id, date.unwrap_or_else(today), Money::from_cents(amount), description.as_deref())
                .await?;
            to_json(&CommandOutcome::success(format!(
                "loan of {} given to {}",
                config.format_currency(amount),
                employee
            )))
        }
        PayrollCommand::Repay { employee, amount, date } => {
            let id = employee_id(db, &employee).await?;
            payroll
                .record_loan_repayment(&id, date.unwrap_or_else(today), Money::from_cents(amount))
                .await?;
            let left = payroll.outstanding_loan(&id).await?;
            to_json(&CommandOutcome::success(format!(
                "repayment received, {} outstanding",
                config.format_currency(left.cents())
            )))
        }
        PayrollCommand::Outstanding { employee } => {
            let id = employee_id(db, &employee).await?;
            let left = payroll.outstanding_loan(&id).await?;
            Ok(json!({
                "employeeId": id,
                "outstandingCents": left.cents(),
                "outstanding": config.format_currency(left.cents()),
            }))
        }
        PayrollCommand::Slip { employee, year, month } => {
            let id = employee_id(db, &employee).await?;
            let slip = payroll.salary_slip(&id, year, month).await?;
            let mut value = to_json(&slip)?;
            value["net"] = json!(config.format_currency(slip.net_cents));
            Ok(value)
        }
    }
}

/// Finds an active employee by id or name.
async fn employee_id(db: &Database, key: &str) -> CommandResult<String> {
    let key = key.trim();
    db.payroll()
        .employees()
        .await?
        .into_iter()
        .find(|e| e.id == key || e.name.eq_ignore_ascii_case(key))
        .map(|e| e.id)
        .ok_or_else(|| ApiError::new(ErrorCode::ReferenceNotFound, format!("employee not found: {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cable_db::DbConfig;

    fn config() -> CliConfig {
        CliConfig::from_lookup(|key| (key == "CABLE_DB_PATH").then(|| ":memory:".to_string())).unwrap()
    }

    fn march(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 3, day)
    }

    #[tokio::test]
    async fn test_slip_by_name() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let config = config();

        run(
            &db,
            &config,
            PayrollCommand::Hire {
                name: "Bilal".into(),
                salary: 3_000_000,
                joined: march(1),
                designation: Some("Machine Operator".into()),
                phone: None,
            },
        )
        .await
        .unwrap();
        run(
            &db,
            &config,
            PayrollCommand::Attend {
                employee: "bilal".into(),
                status: Attendance::Present,
                date: march(4),
            },
        )
        .await
        .unwrap();
        run(
            &db,
            &config,
            PayrollCommand::Advance {
                employee: "Bilal".into(),
                amount: 500_000,
                date: march(10),
                description: None,
            },
        )
        .await
        .unwrap();

        let slip = run(
            &db,
            &config,
            PayrollCommand::Slip {
                employee: "Bilal".into(),
                year: 2024,
                month: 3,
            },
        )
        .await
        .unwrap();
        assert_eq!(slip["net_cents"], 2_500_000);
        assert_eq!(slip["days_present"], 1);
        assert_eq!(slip["net"], "Rs 25,000.00");
    }

    #[tokio::test]
    async fn test_unknown_employee() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let err = run(&db, &config(), PayrollCommand::Outstanding { employee: "Nobody".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ReferenceNotFound);
    }
}
