//! Ledger service: the four banking operations
//!
//! Validates inputs before any persistence attempt, runs every storage call
//! under a bounded timeout, and builds the confirmation messages the
//! conversational layer relays verbatim.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LedgerError, Result};
use crate::models::{cents_as_major, cents_from_major, format_cents, Cents, Transaction};
use crate::store::LedgerStore;

pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

//
// ================= Receipts =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanReceipt {
    pub message: String,
    pub loan_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub message: String,
    #[serde(with = "cents_as_major")]
    pub new_balance: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReport {
    #[serde(with = "cents_as_major")]
    pub balance: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryReport {
    pub transactions: Vec<Transaction>,
    pub count: usize,
    pub message: String,
}

//
// ================= Service =================
//

pub struct LedgerService {
    store: LedgerStore,
    storage_timeout: Duration,
}

impl LedgerService {
    pub fn new(store: LedgerStore, storage_timeout: Duration) -> Self {
        Self {
            store,
            storage_timeout,
        }
    }

    /// Record a loan request with status `pending`.
    pub async fn request_loan(
        &self,
        user: &str,
        amount: f64,
        date: Option<DateTime<Utc>>,
    ) -> Result<LoanReceipt> {
        require_identifier("user", user)?;
        let amount = positive_cents(amount)?;
        let date = date.unwrap_or_else(Utc::now);

        let loan = self
            .bounded(self.store.insert_loan(user, amount, date))
            .await?;

        info!(loan_id = loan.id, user, amount = %format_cents(amount), "loan request recorded");
        Ok(LoanReceipt {
            message: "Loan request submitted".to_string(),
            loan_id: loan.id,
        })
    }

    /// Transfer funds between two accounts and append the ledger entry.
    pub async fn send_money(
        &self,
        emitter: &str,
        receiver: &str,
        amount: f64,
        date: Option<DateTime<Utc>>,
    ) -> Result<TransferReceipt> {
        require_identifier("emitter", emitter)?;
        require_identifier("receiver", receiver)?;
        if emitter == receiver {
            return Err(LedgerError::SelfTransfer(emitter.to_string()));
        }
        let amount = positive_cents(amount)?;
        let date = date.unwrap_or_else(Utc::now);

        let outcome = self
            .bounded(self.store.execute_transfer(emitter, receiver, amount, date))
            .await?;

        info!(
            emitter,
            receiver,
            amount = %format_cents(amount),
            new_balance = %format_cents(outcome.emitter_balance),
            "transfer committed"
        );
        Ok(TransferReceipt {
            message: format!(
                "Transaction successful: the amount of {} has been sent to {} on {}, your new balance is {}",
                format_cents(amount),
                receiver,
                date.format("%Y-%m-%d %H:%M:%S UTC"),
                format_cents(outcome.emitter_balance)
            ),
            new_balance: outcome.emitter_balance,
        })
    }

    /// Current balance of the named account.
    pub async fn get_balance(&self, account: &str) -> Result<BalanceReport> {
        require_identifier("account", account)?;

        let found = self.bounded(self.store.find_account(account)).await?;
        let found = found.ok_or_else(|| LedgerError::AccountNotFound(account.to_string()))?;

        Ok(BalanceReport {
            balance: found.balance,
        })
    }

    /// Every transaction where the account is emitter or receiver, oldest
    /// first. An account with no transactions yields an empty report.
    pub async fn get_transaction_history(&self, account: &str) -> Result<HistoryReport> {
        require_identifier("account", account)?;

        let transactions = self.bounded(self.store.transactions_for(account)).await?;
        let count = transactions.len();

        Ok(HistoryReport {
            message: format!(
                "Transaction history for the {} account ({} transactions, oldest first); \
                 check the emitter and receiver names on each entry",
                account, count
            ),
            transactions,
            count,
        })
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.storage_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout(self.storage_timeout)),
        }
    }
}

//
// ================= Validation =================
//

fn require_identifier(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::MissingField(field));
    }
    Ok(())
}

/// Amounts must be positive and at cent precision, checked before any
/// persistence attempt.
fn positive_cents(amount: f64) -> Result<Cents> {
    let cents = cents_from_major(amount)?;
    if cents <= 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be positive, got {}",
            format_cents(cents)
        )));
    }
    Ok(cents)
}
