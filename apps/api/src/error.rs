//! # API Error Type
//!
//! Unified error type for RPC handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally POS                              │
//! │                                                                         │
//! │  Browser                     Rust Backend                               │
//! │  ───────                     ────────────                               │
//! │                                                                         │
//! │  POST /rpc/transactions.cancel                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<Json<T>, ApiError>                                       │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  EngineError::Core ──── CoreError::InvalidTransactionStatus ──┐ │  │
//! │  │         │                                                     │ │  │
//! │  │         ▼                                                     ▼ │  │
//! │  │  EngineError::Database ── DbError::QueryFailed ────────► ApiError│  │
//! │  │                                                          │       │  │
//! │  │                                              status + JSON body  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄──── 409 { "code": "INVALID_STATE",                                  │
//! │              "message": "Cannot cancel transaction ...: status is ..." }│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_core::{CoreError, ValidationError};
use tally_db::{DbError, EngineError};
use ts_rs::TS;

/// Handler result alias.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error body returned by every failing RPC call.
///
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Beras 5kg: available 0, requested 5"
/// }
/// ```
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Stable error codes. Each maps to exactly one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Not enough stock for a requested line (409)
    InsufficientStock,

    /// Transaction is not in a state that allows the operation (409)
    InvalidState,

    /// Could not mint a unique transaction code (503)
    CodeGenerationExhausted,

    /// Write conflicts or deadline; safe to retry later (503)
    Conflict,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InsufficientStock | ErrorCode::InvalidState => StatusCode::CONFLICT,
            ErrorCode::CodeGenerationExhausted | ErrorCode::Conflict => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts engine errors to API errors.
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(e) => e.into(),
            EngineError::Database(e) => e.into(),
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_)
            | CoreError::UserNotFound(_)
            | CoreError::TransactionNotFound(_) => ErrorCode::NotFound,
            CoreError::ProductInactive(_) | CoreError::Validation(_) => {
                ErrorCode::ValidationError
            }
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InvalidTransactionStatus { .. } => ErrorCode::InvalidState,
            CoreError::CodeGenerationExhausted { .. } => ErrorCode::CodeGenerationExhausted,
            CoreError::ConflictRetryExhausted { .. } | CoreError::DeadlineExceeded { .. } => {
                ErrorCode::Conflict
            }
        };

        match err {
            // the wrapper's "Validation error: " prefix adds nothing for clients
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            other => ApiError::new(code, other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Invalid(e) => ApiError::validation(e.to_string()),
            DbError::InUse { entity, id } => ApiError::new(
                ErrorCode::InvalidState,
                format!("{} {} is still in use", entity, id),
            ),
            DbError::Conflict(e) => {
                tracing::warn!("Write conflict reached the API: {}", e);
                ApiError::new(ErrorCode::Conflict, "Database is busy, try again")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{ReversalKind, TransactionStatus};

    #[test]
    fn test_codes_serialize_screaming_snake() {
        let json = serde_json::to_value(ApiError::new(ErrorCode::InvalidState, "x")).unwrap();
        assert_eq!(json["code"], "INVALID_STATE");
        assert_eq!(json["message"], "x");

        let json = serde_json::to_value(ErrorCode::CodeGenerationExhausted).unwrap();
        assert_eq!(json, "CODE_GENERATION_EXHAUSTED");
    }

    #[test]
    fn test_core_error_mapping() {
        let err: ApiError = CoreError::InsufficientStock {
            product_id: "p1".into(),
            product: "Beras".into(),
            available: 2,
            requested: 5,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.code.status(), StatusCode::CONFLICT);
        assert!(err.message.contains("available 2"));

        let err: ApiError = CoreError::InvalidTransactionStatus {
            transaction_id: "t1".into(),
            status: TransactionStatus::Refunded,
            operation: ReversalKind::Cancel,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidState);

        let err: ApiError = CoreError::DeadlineExceeded {
            operation: "create",
            millis: 10,
        }
        .into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.code.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ApiError = CoreError::Validation(ValidationError::Empty {
            field: "lines".into(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(!err.message.starts_with("Validation error"));
    }

    #[test]
    fn test_db_error_hides_details() {
        let err: ApiError = DbError::QueryFailed("near \"SELEC\": syntax error".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
        assert_eq!(err.code.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
