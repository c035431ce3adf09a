//! # Cash and Bank Commands

use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::json;

use cable_core::{BankTxKind, CashTxKind, Money};
use cable_db::{CatalogEntity, Database};

use super::{catalog_id, parse_amount, to_json, today, CommandOutcome, CommandResult};
use crate::config::CliConfig;

/// Date and description shared by every entry.
#[derive(Debug, clap::Args)]
pub struct Entry {
    /// Amount in rupees
    #[arg(value_parser = parse_amount)]
    pub amount: i64,
    /// Entry date (default: today)
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CashCommand {
    /// Money received in cash
    In(Entry),

    /// Money paid out in cash
    Out(Entry),

    /// Deposit into a bank account from outside the cash book
    Deposit {
        bank: String,
        #[command(flatten)]
        entry: Entry,
    },

    /// Withdraw from a bank account to outside the cash book
    Withdraw {
        bank: String,
        #[command(flatten)]
        entry: Entry,
    },

    /// Move cash into a bank account
    ToBank {
        bank: String,
        #[command(flatten)]
        entry: Entry,
    },

    /// Draw cash from a bank account
    FromBank {
        bank: String,
        #[command(flatten)]
        entry: Entry,
    },

    /// Move money between two bank accounts
    BankTransfer {
        from_bank: String,
        to_bank: String,
        #[command(flatten)]
        entry: Entry,
    },

    /// Cash balance, or one bank's balance
    Balance {
        #[arg(long)]
        bank: Option<String>,
    },

    /// Cash book rows, or one bank's rows, in a date range
    Book {
        from: NaiveDate,
        to: NaiveDate,
        #[arg(long)]
        bank: Option<String>,
    },
}

pub async fn run(db: &Database, config: &CliConfig, command: CashCommand) -> CommandResult<serde_json::Value> {
    let book = db.cashbook();

    match command {
        CashCommand::In(entry) => {
            let (amount, date) = amount_and_date(&entry);
            to_json(&book.record_cash(CashTxKind::CashIn, amount, date, entry.description.as_deref()).await?)
        }
        CashCommand::Out(entry) => {
            let (amount, date) = amount_and_date(&entry);
            to_json(&book.record_cash(CashTxKind::CashOut, amount, date, entry.description.as_deref()).await?)
        }
        CashCommand::Deposit { bank, entry } => {
            let bank_id = catalog_id(db, CatalogEntity::Bank, &bank).await?;
            let (amount, date) = amount_and_date(&entry);
            to_json(
                &book
                    .record_bank(&bank_id, BankTxKind::Deposit, amount, date, entry.description.as_deref())
                    .await?,
            )
        }
        CashCommand::Withdraw { bank, entry } => {
            let bank_id = catalog_id(db, CatalogEntity::Bank, &bank).await?;
            let (amount, date) = amount_and_date(&entry);
            to_json(
                &book
                    .record_bank(&bank_id, BankTxKind::Withdraw, amount, date, entry.description.as_deref())
                    .await?,
            )
        }
        CashCommand::ToBank { bank, entry } => {
            let bank_id = catalog_id(db, CatalogEntity::Bank, &bank).await?;
            let (amount, date) = amount_and_date(&entry);
            book.transfer_cash_to_bank(&bank_id, amount, date, entry.description.as_deref())
                .await?;
            to_json(&CommandOutcome::success(format!(
                "{} moved from cash to {}",
                config.format_currency(amount.cents()),
                bank
            )))
        }
        CashCommand::FromBank { bank, entry } => {
            let bank_id = catalog_id(db, CatalogEntity::Bank, &bank).await?;
            let (amount, date) = amount_and_date(&entry);
            book.transfer_bank_to_cash(&bank_id, amount, date, entry.description.as_deref())
                .await?;
            to_json(&CommandOutcome::success(format!(
                "{} moved from {} to cash",
                config.format_currency(amount.cents()),
                bank
            )))
        }
        CashCommand::BankTransfer { from_bank, to_bank, entry } => {
            let from_id = catalog_id(db, CatalogEntity::Bank, &from_bank).await?;
            let to_id = catalog_id(db, CatalogEntity::Bank, &to_bank).await?;
            let (amount, date) = amount_and_date(&entry);
            book.transfer_between_banks(&from_id, &to_id, amount, date, entry.description.as_deref())
                .await?;
            to_json(&CommandOutcome::success(format!(
                "{} moved from {} to {}",
                config.format_currency(amount.cents()),
                from_bank,
                to_bank
            )))
        }
        CashCommand::Balance { bank } => {
            let balance = match bank {
                Some(ref name) => book.bank_balance(&catalog_id(db, CatalogEntity::Bank, name).await?).await?,
                None => book.cash_balance().await?,
            };
            Ok(json!({
                "account": bank.unwrap_or_else(|| "cash".to_string()),
                "balanceCents": balance.cents(),
                "balance": config.format_currency(balance.cents()),
            }))
        }
        CashCommand::Book { from, to, bank } => match bank {
            Some(name) => {
                let bank_id = catalog_id(db, CatalogEntity::Bank, &name).await?;
                to_json(&book.bank_transactions(&bank_id, from, to).await?)
            }
            None => to_json(&book.cash_transactions(from, to).await?),
        },
    }
}

fn amount_and_date(entry: &Entry) -> (Money, NaiveDate) {
    (Money::from_cents(entry.amount), entry.date.unwrap_or_else(today))
}
