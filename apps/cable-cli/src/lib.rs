//! # Cable Ledger CLI
//!
//! Command-line front end over `cable-db`.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Application Startup                                 │
//! │                                                                         │
//! │  1. Parse arguments (clap)                                              │
//! │  2. Initialize tracing (RUST_LOG or default filter, to stderr)          │
//! │  3. Load CliConfig from CABLE_* variables, apply --db                   │
//! │  4. Open the store (schema initialized on connect)                      │
//! │  5. Dispatch the command                                                │
//! │  6. Print the result as JSON on stdout; exit 0 on success, 1 otherwise  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```bash
//! cable-cli catalog add-supplier "Punjab Copper"
//! cable-cli post raw-purchase ./purchase.json
//! cable-cli report stock production
//! ```

pub mod commands;
pub mod config;
pub mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cable_core::DocumentKind;
use cable_db::Database;

use crate::commands::{CommandOutcome, CommandResult};
use crate::config::CliConfig;
use crate::error::ApiError;

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(name = "cable-cli")]
#[command(about = "Inventory, invoicing and books for a cable trading business")]
#[command(version)]
pub struct Cli {
    /// Database file (overrides CABLE_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Print compact JSON instead of pretty JSON
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database file and schema, then exit
    Init,

    /// Post a document from a JSON draft (raw-purchase, sales, sales-return, ...)
    Post {
        /// Document kind, by name or prefix (e.g. sales, SIN)
        kind: DocumentKind,

        /// JSON draft file
        draft: PathBuf,

        /// Number of the original document, for returns (e.g. SIN-000012)
        #[arg(long)]
        against: Option<String>,
    },

    /// Post a production run from a JSON draft
    PostProduction {
        /// JSON draft file
        draft: PathBuf,
    },

    /// Stock, invoice and profit reports
    #[command(subcommand)]
    Report(commands::report::ReportCommand),

    /// Master data: locations, brands, parties, banks, stock items
    #[command(subcommand)]
    Catalog(commands::catalog::CatalogCommand),

    /// Cash and bank books
    #[command(subcommand)]
    Cash(commands::cash::CashCommand),

    /// Employees, attendance, advances, loans and salary slips
    #[command(subcommand)]
    Payroll(commands::payroll::PayrollCommand),

    /// User accounts
    #[command(subcommand)]
    User(commands::user::UserCommand),
}

/// Runs one command and returns the process exit code.
pub async fn run(cli: Cli) -> i32 {
    init_tracing();

    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            emit(&CommandOutcome::failure(&ApiError::validation(e.to_string())), cli.compact);
            return 1;
        }
    };
    let config = match cli.db {
        Some(ref path) => config.with_database_path(path),
        None => config,
    };

    info!(path = %config.database_path.display(), "Opening store");
    let db = match Database::connect(config.db_config()).await {
        Ok(db) => db,
        Err(e) => {
            let err = ApiError::from(e);
            emit(&CommandOutcome::failure(&err), cli.compact);
            return 1;
        }
    };

    let result = dispatch(&db, &config, cli.command).await;
    db.disconnect().await;

    match result {
        Ok(value) => {
            emit(&value, cli.compact);
            0
        }
        Err(err) => {
            emit(&CommandOutcome::failure(&err), cli.compact);
            1
        }
    }
}

/// Routes a parsed command to its handler.
pub async fn dispatch(db: &Database, config: &CliConfig, command: Command) -> CommandResult<serde_json::Value> {
    match command {
        Command::Init => commands::to_json(&CommandOutcome::success(format!(
            "store ready at {}",
            config.database_path.display()
        ))),
        Command::Post { kind, draft, against } => commands::to_json(
            &commands::ledger::post(db, kind, &draft, against.as_deref()).await?,
        ),
        Command::PostProduction { draft } => {
            commands::to_json(&commands::ledger::post_production(db, &draft).await?)
        }
        Command::Report(cmd) => commands::report::run(db, config, cmd).await,
        Command::Catalog(cmd) => commands::catalog::run(db, cmd).await,
        Command::Cash(cmd) => commands::cash::run(db, config, cmd).await,
        Command::Payroll(cmd) => commands::payroll::run(db, config, cmd).await,
        Command::User(cmd) => commands::user::run(db, cmd).await,
    }
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG` overrides the default filter
/// - Default: `info,cable=debug,sqlx=warn`
///
/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cable=debug,sqlx=warn"));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn emit<T: serde::Serialize>(value: &T, compact: bool) {
    let text = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    match text {
        Ok(text) => println!("{}", text),
        Err(e) => error!("Could not serialize output: {}", e),
    }
}
