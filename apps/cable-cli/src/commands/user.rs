//! # User Commands

use clap::Subcommand;
use serde_json::json;

use cable_db::Database;

use super::{to_json, CommandOutcome, CommandResult};

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user account
    Create { username: String, password: String },

    /// Check a username and password
    SignIn { username: String, password: String },

    /// Replace a password after checking the current one
    ChangePassword {
        username: String,
        current: String,
        new: String,
    },
}

pub async fn run(db: &Database, command: UserCommand) -> CommandResult<serde_json::Value> {
    let credentials = db.credentials();

    match command {
        UserCommand::Create { username, password } => {
            let id = credentials.create_user(&username, &password).await?;
            Ok(json!({ "ok": true, "id": id, "username": username.trim() }))
        }
        UserCommand::SignIn { username, password } => {
            credentials.authenticate(&username, &password).await?;
            to_json(&CommandOutcome::success(format!("signed in as {}", username.trim())))
        }
        UserCommand::ChangePassword { username, current, new } => {
            credentials.change_password(&username, &current, &new).await?;
            to_json(&CommandOutcome::success("password changed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use cable_db::DbConfig;

    #[tokio::test]
    async fn test_sign_in_and_change_password() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        run(
            &db,
            UserCommand::Create {
                username: "admin".into(),
                password: "copper-2024".into(),
            },
        )
        .await
        .unwrap();

        let wrong = run(
            &db,
            UserCommand::SignIn {
                username: "admin".into(),
                password: "guess".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(wrong.code, ErrorCode::AuthenticationFailed);

        run(
            &db,
            UserCommand::ChangePassword {
                username: "admin".into(),
                current: "copper-2024".into(),
                new: "aluminium-2025".into(),
            },
        )
        .await
        .unwrap();

        let ok = run(
            &db,
            UserCommand::SignIn {
                username: "admin".into(),
                password: "aluminium-2025".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(ok["ok"], true);
    }
}
