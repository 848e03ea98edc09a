//! Error types for the ledger service
//!
//! Domain failures (insufficient funds, unknown accounts) are distinct
//! variants from validation and infrastructure failures, so callers branch
//! on the kind instead of matching message strings.

use std::time::Duration;

use thiserror::Error;

use crate::models::{format_cents, Cents, MoneyError};

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {

    // =============================
    // Domain Errors
    // =============================

    #[error(
        "insufficient balance: cannot send {} to {receiver}, current balance is {}",
        format_cents(*.amount),
        format_cents(*.balance)
    )]
    InsufficientFunds {
        amount: Cents,
        receiver: String,
        balance: Cents,
    },

    #[error("account {0} not found, check the account name or register with the bank first")]
    AccountNotFound(String),

    #[error("receiver account {0} not found in the banking system, check the account name")]
    ReceiverNotFound(String),

    // =============================
    // Validation Errors
    // =============================

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("emitter and receiver are the same account: {0}")]
    SelfTransfer(String),

    // =============================
    // Infrastructure Errors
    // =============================

    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid timestamp in storage: {0}")]
    CorruptTimestamp(#[from] chrono::ParseError),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from ledger api: {0}")]
    InvalidResponse(String),

    /// Remote failure the client could not map back to a known kind.
    #[error("ledger api error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl LedgerError {
    /// Stable machine-readable kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::ReceiverNotFound(_) => "receiver_not_found",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::MissingField(_) => "missing_field",
            LedgerError::SelfTransfer(_) => "self_transfer",
            LedgerError::Timeout(_) => "timeout",
            LedgerError::Database(_) => "database",
            LedgerError::CorruptTimestamp(_) => "database",
            LedgerError::Http(_) => "http",
            LedgerError::InvalidResponse(_) => "invalid_response",
            LedgerError::Api { .. } => "api",
        }
    }

    /// Domain errors are expected, non-retryable outcomes the caller can
    /// resolve by choosing different inputs.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientFunds { .. }
                | LedgerError::AccountNotFound(_)
                | LedgerError::ReceiverNotFound(_)
        )
    }
}

impl From<MoneyError> for LedgerError {
    fn from(e: MoneyError) -> Self {
        LedgerError::InvalidAmount(e.to_string())
    }
}
