//! # User Repository
//!
//! Just enough of the user store for the engine: who recorded a
//! transaction, and whether that account may still record one.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::{validate_required_name, validate_username};
use tally_core::{User, UserRole};

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a new, active user.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - username already taken
    pub async fn insert(&self, username: &str, full_name: &str, role: UserRole) -> DbResult<User> {
        validate_username(username)?;
        validate_required_name("full_name", full_name)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            full_name: full_name.trim().to_string(),
            role,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %user.id, username = %user.username, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, username, full_name, role, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, full_name, role, is_active, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Checks that a user exists and is active.
    pub async fn exists_active(&self, id: &str) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM users WHERE id = ? AND is_active = 1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }

    /// Deactivates a user. Their past transactions are kept.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .insert("kasir1", "Siti Aminah", UserRole::Cashier)
            .await
            .unwrap();

        let fetched = db.users().get(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "kasir1");
        assert_eq!(fetched.role, UserRole::Cashier);
        assert!(db.users().exists_active(&user.id).await.unwrap());

        db.users().deactivate(&user.id).await.unwrap();
        assert!(!db.users().exists_active(&user.id).await.unwrap());
        assert!(db.users().get(&user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users()
            .insert("admin", "Admin", UserRole::Admin)
            .await
            .unwrap();

        let err = db
            .users()
            .insert("admin", "Someone Else", UserRole::Cashier)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("users.username"));
    }
}
