use crate::domain::withdrawal::WithdrawalStatus;
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Insufficient balance: requested {requested}, pending {pending}")]
    InsufficientBalance { requested: Decimal, pending: Decimal },
    #[error("Withdrawal {withdrawal_id} already processed or invalid state ({status})")]
    InvalidStateTransition {
        withdrawal_id: u32,
        status: WithdrawalStatus,
    },
    #[error("Persistence error: {0}")]
    PersistenceError(#[from] PersistenceError),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Storage-level failures. Every variant is retryable from the caller's point
/// of view: the transaction that hit it was rolled back in full.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("timed out waiting for lock on {0}")]
    LockTimeout(String),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceError(_))
    }

    /// Whether the operation was declined by a business rule (as opposed to
    /// failing in storage or I/O).
    pub fn is_declined(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::InsufficientBalance { .. }
                | Self::InvalidStateTransition { .. }
        )
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        Self::PersistenceError(PersistenceError::Storage(Box::new(e)))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(e: rocksdb::Error) -> Self {
        Self::PersistenceError(PersistenceError::Storage(Box::new(e)))
    }
}
