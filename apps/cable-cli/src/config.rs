//! # CLI Configuration
//!
//! Settings loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command-line flags (`--db`)
//! 2. Environment variables (`CABLE_*`)
//! 3. Defaults (this file)
//!
//! | Variable                | Default                          |
//! |-------------------------|----------------------------------|
//! | `CABLE_DB_PATH`         | `<platform data dir>/cable.db`   |
//! | `CABLE_BUSY_TIMEOUT_MS` | `30000` (lower values rejected)  |
//! | `CABLE_MAX_CONNECTIONS` | `5`                              |
//! | `CABLE_CURRENCY_SYMBOL` | `Rs`                             |

use std::path::PathBuf;
use std::time::Duration;

use cable_db::DbConfig;
use directories::ProjectDirs;
use serde::Serialize;
use thiserror::Error;

/// Smallest busy timeout the store accepts, in milliseconds.
pub const MIN_BUSY_TIMEOUT_MS: u64 = 30_000;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("{key} has invalid value '{value}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// No data directory could be determined for the default path.
    #[error("could not determine a data directory; set CABLE_DB_PATH")]
    NoDataDir,
}

/// Resolved CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// SQLite file the commands operate on.
    pub database_path: PathBuf,

    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u64,

    /// Pool size.
    pub max_connections: u32,

    /// Prefix for displayed amounts.
    pub currency_symbol: String,
}

impl CliConfig {
    /// Loads configuration from `CABLE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = match lookup("CABLE_DB_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_database_path()?,
        };

        let busy_timeout_ms = match lookup("CABLE_BUSY_TIMEOUT_MS") {
            Some(raw) => {
                let ms: u64 = parse_number("CABLE_BUSY_TIMEOUT_MS", &raw)?;
                if ms < MIN_BUSY_TIMEOUT_MS {
                    return Err(invalid(
                        "CABLE_BUSY_TIMEOUT_MS",
                        &raw,
                        format!("must be at least {}", MIN_BUSY_TIMEOUT_MS),
                    ));
                }
                ms
            }
            None => MIN_BUSY_TIMEOUT_MS,
        };

        let max_connections = match lookup("CABLE_MAX_CONNECTIONS") {
            Some(raw) => {
                let max: u32 = parse_number("CABLE_MAX_CONNECTIONS", &raw)?;
                if max == 0 {
                    return Err(invalid("CABLE_MAX_CONNECTIONS", &raw, "must be positive".into()));
                }
                max
            }
            None => 5,
        };

        let currency_symbol = lookup("CABLE_CURRENCY_SYMBOL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Rs".to_string());

        Ok(CliConfig {
            database_path,
            busy_timeout_ms,
            max_connections,
            currency_symbol,
        })
    }

    /// Replaces the database path (the `--db` flag).
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Store configuration for these settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    /// Formats paisa for display.
    ///
    /// ## Example
    /// ```rust,ignore
    /// assert_eq!(config.format_currency(123450), "Rs 1,234.50");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        format!(
            "{}{} {}.{:02}",
            sign,
            self.currency_symbol,
            group_thousands(abs / 100),
            abs % 100
        )
    }
}

/// Platform data directory, created on demand.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.cable.ledger/cable.db`
/// - **Windows**: `%APPDATA%\cable\ledger\data\cable.db`
/// - **Linux**: `~/.local/share/ledger/cable.db`
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("com", "cable", "ledger").ok_or(ConfigError::NoDataDir)?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::InvalidValue {
        key: "data directory".to_string(),
        value: data_dir.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(data_dir.join("cable.db"))
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(key, raw, "not a number".into()))
}

fn invalid(key: &str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
