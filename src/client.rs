//! HTTP client for the ledger API
//!
//! The agent tool layer talks to the service through this client. All
//! configuration is passed explicitly at construction; failures come back
//! as the same discriminated kinds the service raises, so the tool layer
//! can branch on them instead of relaying one generic error string.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::api::ErrorBody;
use crate::error::{LedgerError, Result};
use crate::ledger::{BalanceReport, HistoryReport, LoanReceipt, TransferReceipt};
use crate::models::cents_from_major;

/// Explicit client configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the base URL from `LEDGER_API_BASE_URL`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var("LEDGER_API_BASE_URL").ok().map(Self::new)
    }
}

/// Connection-pooled client for the four ledger operations.
pub struct LedgerClient {
    client: Client,
    base_url: String,
}

impl LedgerClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit a loan request. `date` defaults to the current UTC time.
    pub async fn request_loan(
        &self,
        user: &str,
        amount: f64,
        date: Option<DateTime<Utc>>,
    ) -> Result<LoanReceipt> {
        let date = date.unwrap_or_else(Utc::now);
        let response = self
            .client
            .post(format!("{}/request-loan", self.base_url))
            .json(&json!({
                "user": user,
                "amount": amount,
                "date": date.to_rfc3339(),
            }))
            .send()
            .await?;
        decode(response).await
    }

    /// Transfer funds between two accounts. `date` defaults to now.
    pub async fn send_money(
        &self,
        emitter: &str,
        receiver: &str,
        amount: f64,
        date: Option<DateTime<Utc>>,
    ) -> Result<TransferReceipt> {
        let date = date.unwrap_or_else(Utc::now);
        let response = self
            .client
            .post(format!("{}/send-money", self.base_url))
            .json(&json!({
                "emitter": emitter,
                "receiver": receiver,
                "amount": amount,
                "date": date.to_rfc3339(),
            }))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn get_balance(&self, account: &str) -> Result<BalanceReport> {
        let response = self
            .client
            .get(format!("{}/balance", self.base_url))
            .header("account", account)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn get_transactions_history(&self, account: &str) -> Result<HistoryReport> {
        let response = self
            .client
            .get(format!("{}/transactions-history", self.base_url))
            .header("emitter", account)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let raw = response.text().await?;
    match serde_json::from_str::<ErrorBody>(&raw) {
        Ok(body) => Err(rehydrate(status, body)),
        Err(_) => Err(LedgerError::InvalidResponse(format!(
            "status {} with unparseable body: {}",
            status, raw
        ))),
    }
}

/// Map an error body back to the kind the service raised. Kinds without a
/// fully reconstructible payload fall back to [`LedgerError::Api`].
fn rehydrate(status: StatusCode, body: ErrorBody) -> LedgerError {
    match body.error.as_str() {
        "insufficient_funds" => {
            let amount = body.amount.and_then(|v| cents_from_major(v).ok());
            let balance = body.balance.and_then(|v| cents_from_major(v).ok());
            match (amount, balance, body.receiver.clone()) {
                (Some(amount), Some(balance), Some(receiver)) => {
                    LedgerError::InsufficientFunds {
                        amount,
                        receiver,
                        balance,
                    }
                }
                _ => LedgerError::Api {
                    status: status.as_u16(),
                    message: body.message,
                },
            }
        }
        "account_not_found" if body.account.is_some() => {
            LedgerError::AccountNotFound(body.account.unwrap_or_default())
        }
        "receiver_not_found" if body.account.is_some() => {
            LedgerError::ReceiverNotFound(body.account.unwrap_or_default())
        }
        _ => LedgerError::Api {
            status: status.as_u16(),
            message: body.message,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::create_router;
    use crate::ledger::{LedgerService, DEFAULT_STORAGE_TIMEOUT};
    use crate::store::LedgerStore;

    #[test]
    fn test_rehydrate_insufficient_funds() {
        let body = ErrorBody {
            error: "insufficient_funds".to_string(),
            message: "insufficient balance".to_string(),
            amount: Some(200.0),
            balance: Some(50.0),
            receiver: Some("jane".to_string()),
            account: None,
        };
        let err = rehydrate(StatusCode::BAD_REQUEST, body);
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                amount: 20000,
                balance: 5000,
                ..
            }
        ));
    }

    #[test]
    fn test_rehydrate_unknown_kind_falls_back_to_api() {
        let body = ErrorBody {
            error: "missing_field".to_string(),
            message: "missing required field: account".to_string(),
            amount: None,
            balance: None,
            receiver: None,
            account: None,
        };
        let err = rehydrate(StatusCode::BAD_REQUEST, body);
        match err {
            LedgerError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("account"));
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    /// Spin up the real router on an ephemeral port and drive it through
    /// the client, end to end.
    async fn spawn_server() -> (String, LedgerStore) {
        let store = LedgerStore::init("sqlite::memory:").await.unwrap();
        store.create_account("john", 100_000).await.unwrap();
        store.create_account("jane", 50_000).await.unwrap();
        // Handlers share the pool with the store handle returned to the test.
        let router = create_router(Arc::new(LedgerService::new(
            store.clone(),
            DEFAULT_STORAGE_TIMEOUT,
        )));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        (format!("http://{}", addr), store)
    }

    #[tokio::test]
    async fn test_client_round_trip() {
        let (base_url, store) = spawn_server().await;
        let client = LedgerClient::new(ClientConfig::new(base_url)).unwrap();

        let receipt = client
            .send_money("john", "jane", 200.0, None)
            .await
            .unwrap();
        assert_eq!(receipt.new_balance, 80_000);

        let balance = client.get_balance("jane").await.unwrap();
        assert_eq!(balance.balance, 70_000);

        let history = client.get_transactions_history("john").await.unwrap();
        assert_eq!(history.count, 1);
        assert_eq!(history.transactions[0].amount, 20_000);

        let loan = client.request_loan("john", 5000.0, None).await.unwrap();
        assert!(loan.loan_id > 0);

        let jane = store.find_account("jane").await.unwrap().unwrap();
        assert_eq!(jane.balance, 70_000);
    }

    #[tokio::test]
    async fn test_client_decodes_domain_errors() {
        let (base_url, _store) = spawn_server().await;
        let client = LedgerClient::new(ClientConfig::new(base_url)).unwrap();

        let err = client.get_balance("ghost").await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(name) if name == "ghost"));

        let err = client
            .send_money("john", "jane", 99_999.0, None)
            .await
            .unwrap_err();
        match err {
            LedgerError::InsufficientFunds {
                amount,
                receiver,
                balance,
            } => {
                assert_eq!(amount, 9_999_900);
                assert_eq!(receiver, "jane");
                assert_eq!(balance, 100_000);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }

        let err = client
            .send_money("john", "ghost", 1.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReceiverNotFound(name) if name == "ghost"));
    }
}
