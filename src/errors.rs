use rust_decimal::Decimal;
use serde::Serialize;

/// Unified error type for every ledger service. All failures are
/// synchronous business-rule violations surfaced to the caller; there is
/// no retry machinery and no partial state survives a failed operation.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid status transition: {0}")]
    InvalidStatus(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// FIFO deduction or outbound recording asked for more than the
    /// eligible total; `shortfall` is the uncoverable remainder.
    #[error("Insufficient stock, short by {shortfall}")]
    InsufficientStock { shortfall: Decimal },

    /// A count adjustment would drive the cached stock below zero.
    #[error("Stock adjustment would result in negative stock ({resulting})")]
    NegativeStockResult { resulting: i64 },

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn db_error<E: Into<sea_orm::error::DbErr>>(error: E) -> Self {
        ServiceError::DatabaseError(error.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }
}

/// Unwraps SeaORM's transaction error wrapper back into a ServiceError.
pub fn from_transaction_error(err: sea_orm::TransactionError<ServiceError>) -> ServiceError {
    match err {
        sea_orm::TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        sea_orm::TransactionError::Transaction(service_err) => service_err,
    }
}
