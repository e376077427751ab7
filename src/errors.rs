//! Unified error type for the ledger core.
//!
//! Write-time integrity violations (`ReferenceNotFound`, `CycleDetected`) are returned
//! before anything is written. An unresolvable due date is not an error; see
//! [`DueDate`](crate::core::due_date::DueDate).

use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Referenced transaction not found: {id}")]
    ReferenceNotFound { id: i64 },

    #[error("Due date reference to transaction {reference_id} would form a cycle")]
    CycleDetected {
        /// The transaction being written, `None` while it is being created
        transaction_id: Option<i64>,
        reference_id: i64,
    },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: i64 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Balance exceeds the representable range")]
    BalanceOverflow,

    #[error("Persistence failure: {0}")]
    Persistence(#[from] DbErr),
}

impl Error {
    pub(crate) const fn transaction_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Transaction",
            id,
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
