//! # Credential Repository
//!
//! Sign-in users with Argon2 password hashes.
//!
//! ## Stored Formats
//! ```text
//! $argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>   ── PHC string, current
//! anything else                                  ── legacy plaintext
//! ```
//!
//! A legacy row is compared as plaintext once; a successful sign-in
//! replaces it with a PHC hash.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cable_core::validation::{validate_password, validate_username};
use cable_core::CoreError;

use crate::error::{AuthFailure, DbError, DbResult};

/// Repository for sign-in credentials.
#[derive(Debug, Clone)]
pub struct CredentialRepository {
    pool: SqlitePool,
}

impl CredentialRepository {
    /// Creates a new CredentialRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CredentialRepository { pool }
    }

    /// Creates a user. Duplicate usernames fail with `UniqueViolation`.
    pub async fn create_user(&self, username: &str, password: &str) -> DbResult<String> {
        validate_username(username).map_err(CoreError::from)?;
        validate_password(password).map_err(CoreError::from)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(&id)
        .bind(username.trim())
        .bind(hash_password(password)?)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(username = %username.trim(), "User created");
        Ok(id)
    }

    /// Checks a username/password pair.
    ///
    /// ## Returns
    /// * `Ok(())` - Credentials match
    /// * `Err(AuthenticationFailed)` - Unknown user or wrong password
    pub async fn authenticate(&self, username: &str, password: &str) -> DbResult<()> {
        let username = username.trim();
        let stored: Option<(String, String)> =
            sqlx::query_as("SELECT id, password_hash FROM users WHERE username = ?1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id, stored_hash)) = stored else {
            warn!(username = %username, "Sign-in for unknown user");
            return Err(auth_failed(username, AuthFailure::UnknownUser));
        };

        match StoredPassword::parse(&stored_hash) {
            StoredPassword::Hashed(hash) => {
                if !verify_password(password, &hash) {
                    warn!(username = %username, "Sign-in with wrong password");
                    return Err(auth_failed(username, AuthFailure::WrongPassword));
                }
            }
            StoredPassword::Legacy(plain) => {
                if plain != password {
                    warn!(username = %username, "Sign-in with wrong password");
                    return Err(auth_failed(username, AuthFailure::WrongPassword));
                }
                self.store_hash(&id, password).await?;
                info!(username = %username, "Legacy password upgraded to Argon2");
            }
        }

        debug!(username = %username, "Signed in");
        Ok(())
    }

    /// Boolean form of [`authenticate`](Self::authenticate) for the UI.
    pub async fn sign_in(&self, username: &str, password: &str) -> bool {
        self.authenticate(username, password).await.is_ok()
    }

    /// Replaces a password after checking the current one.
    pub async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> DbResult<()> {
        validate_password(new_password).map_err(CoreError::from)?;
        self.authenticate(username, current_password).await?;

        let result = sqlx::query(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE username = ?3",
        )
        .bind(hash_password(new_password)?)
        .bind(Utc::now())
        .bind(username.trim())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", username.trim()));
        }

        info!(username = %username.trim(), "Password changed");
        Ok(())
    }

    /// Boolean form of [`change_password`](Self::change_password).
    pub async fn change_password_ok(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> bool {
        self.change_password(username, current_password, new_password)
            .await
            .is_ok()
    }

    async fn store_hash(&self, id: &str, password: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(hash_password(password)?)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Hashing
// =============================================================================

enum StoredPassword<'a> {
    Hashed(PasswordHash<'a>),
    Legacy(&'a str),
}

impl<'a> StoredPassword<'a> {
    fn parse(stored: &'a str) -> Self {
        match PasswordHash::new(stored) {
            Ok(hash) => StoredPassword::Hashed(hash),
            Err(_) => StoredPassword::Legacy(stored),
        }
    }
}

fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &PasswordHash<'_>) -> bool {
    Argon2::default()
        .verify_password(password.as_bytes(), hash)
        .is_ok()
}

fn auth_failed(username: &str, reason: AuthFailure) -> DbError {
    DbError::AuthenticationFailed {
        username: username.to_string(),
        reason,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn stored_hash(db: &Database, username: &str) -> String {
        sqlx::query_scalar("SELECT password_hash FROM users WHERE username = ?1")
            .bind(username)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        db.credentials().create_user("admin", "secret1").await.unwrap();

        let hash = stored_hash(&db, "admin").await;
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("secret1"));

        assert!(db.credentials().sign_in("admin", "secret1").await);
        assert!(!db.credentials().sign_in("admin", "secret2").await);
    }

    #[tokio::test]
    async fn test_failures_are_distinguished() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        db.credentials().create_user("admin", "secret1").await.unwrap();

        let unknown = db.credentials().authenticate("ghost", "secret1").await.unwrap_err();
        assert!(matches!(
            unknown,
            DbError::AuthenticationFailed { reason: AuthFailure::UnknownUser, .. }
        ));

        let wrong = db.credentials().authenticate("admin", "nope").await.unwrap_err();
        assert!(matches!(
            wrong,
            DbError::AuthenticationFailed { reason: AuthFailure::WrongPassword, .. }
        ));
    }

    #[tokio::test]
    async fn test_legacy_plaintext_upgraded() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at, updated_at) VALUES ('u1', 'owner', 'letmein', ?1, ?1)",
        )
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();

        assert!(!db.credentials().sign_in("owner", "wrong").await);
        assert_eq!(stored_hash(&db, "owner").await, "letmein");

        assert!(db.credentials().sign_in("owner", "letmein").await);
        assert!(stored_hash(&db, "owner").await.starts_with("$argon2"));
        assert!(db.credentials().sign_in("owner", "letmein").await);
    }

    #[tokio::test]
    async fn test_change_password() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let creds = db.credentials();
        creds.create_user("admin", "secret1").await.unwrap();

        assert!(!creds.change_password_ok("admin", "wrong", "secret2").await);
        assert!(creds.change_password_ok("admin", "secret1", "secret2").await);

        assert!(!creds.sign_in("admin", "secret1").await);
        assert!(creds.sign_in("admin", "secret2").await);
    }
}
