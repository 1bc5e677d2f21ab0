//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── Conflict? ──► engine retries the whole unit of work          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError ──► ApiError (apps/api) ← Serialized for the client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tally_core::ValidationError;
use thiserror::Error;

/// SQLite result codes that mean "another writer holds the lock".
///
/// SQLITE_BUSY (5), SQLITE_BUSY_SNAPSHOT (517), SQLITE_BUSY_RECOVERY (261),
/// SQLITE_BUSY_TIMEOUT (773), SQLITE_LOCKED (6), SQLITE_LOCKED_SHAREDCACHE (262).
const CONFLICT_CODES: &[&str] = &["5", "517", "261", "773", "6", "262"];

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate transaction code (engine retries with the next sequence)
    /// - Duplicate username, category name, or barcode
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Deletion blocked because other rows still reference the entity.
    ///
    /// ## When This Occurs
    /// - Deleting a category that products still point at
    #[error("{entity} {id} is still in use")]
    InUse { entity: String, id: String },

    /// Write conflict: the database was busy or locked by another writer.
    ///
    /// Transient. The engine retries the whole unit of work on this.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    ///
    /// ## When This Occurs
    /// - CHECK constraint failure
    /// - Runtime SQL error
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Input rejected before reaching SQLite.
    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an InUse error.
    pub fn in_use(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::InUse {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether retrying the unit of work from the start may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }

    /// Whether this is a UNIQUE violation on `table.column`, e.g. `transactions.code`.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.contains(column))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → busy/locked code?   → DbError::Conflict
///                               UNIQUE failed?      → DbError::UniqueViolation
///                               FOREIGN KEY failed? → DbError::ForeignKeyViolation
///                               otherwise           → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                if code
                    .as_deref()
                    .is_some_and(|c| CONFLICT_CODES.contains(&c))
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    return DbError::Conflict(msg.to_string());
                }

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_matching() {
        let err = DbError::duplicate("transactions.code", "TRX-20240315-001");
        assert!(err.is_unique_violation_on("transactions.code"));
        assert!(!err.is_unique_violation_on("users.username"));
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_conflict_is_retryable() {
        assert!(DbError::Conflict("database is locked".into()).is_conflict());
        assert!(!DbError::PoolExhausted.is_conflict());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
