//! REST API for the ledger service
//!
//! Exposes the four banking operations over HTTP for the agent tool layer
//! and any other client.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::LedgerError;
use crate::ledger::LedgerService;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanRequest {
    pub user: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMoneyRequest {
    pub emitter: String,
    pub receiver: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// =============================
/// Error Body
/// =============================

/// Failure payload: a stable machine-readable kind plus the human message,
/// so the tool layer can branch without matching message strings. The
/// optional fields carry the InsufficientFunds detail for reconstruction
/// on the client side.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl ErrorBody {
    /// Build the failure payload; the message names the operation attempted
    /// so the conversational layer can relay it without re-querying.
    pub fn from_error(operation: &str, err: &LedgerError) -> Self {
        let mut body = Self {
            error: err.kind().to_string(),
            message: format!("{} failed: {}", operation, err),
            amount: None,
            balance: None,
            receiver: None,
            account: None,
        };
        match err {
            LedgerError::InsufficientFunds {
                amount,
                receiver,
                balance,
            } => {
                body.amount = Some(crate::models::cents_to_major(*amount));
                body.balance = Some(crate::models::cents_to_major(*balance));
                body.receiver = Some(receiver.clone());
            }
            LedgerError::AccountNotFound(name) | LedgerError::ReceiverNotFound(name) => {
                body.account = Some(name.clone());
            }
            _ => {}
        }
        body
    }
}

fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InsufficientFunds { .. }
        | LedgerError::InvalidAmount(_)
        | LedgerError::MissingField(_)
        | LedgerError::SelfTransfer(_) => StatusCode::BAD_REQUEST,
        LedgerError::AccountNotFound(_) | LedgerError::ReceiverNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        LedgerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(operation: &'static str, err: LedgerError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(operation, kind = err.kind(), "operation failed: {}", err);
    } else {
        warn!(operation, kind = err.kind(), "operation rejected: {}", err);
    }
    (status, Json(ErrorBody::from_error(operation, &err))).into_response()
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub ledger: Arc<LedgerService>,
}

/// =============================
/// Handlers
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn request_loan(
    State(state): State<ApiState>,
    Json(req): Json<LoanRequest>,
) -> Response {
    info!(user = %req.user, "received loan request");
    match state.ledger.request_loan(&req.user, req.amount, req.date).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => error_response("request-loan", e),
    }
}

async fn send_money(
    State(state): State<ApiState>,
    Json(req): Json<SendMoneyRequest>,
) -> Response {
    info!(emitter = %req.emitter, receiver = %req.receiver, "received transfer request");
    match state
        .ledger
        .send_money(&req.emitter, &req.receiver, req.amount, req.date)
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => error_response("send-money", e),
    }
}

async fn balance(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let Some(account) = header_str(&headers, "account") else {
        return error_response("balance", LedgerError::MissingField("account"));
    };
    match state.ledger.get_balance(account).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response("balance", e),
    }
}

async fn transactions_history(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let Some(account) = header_str(&headers, "emitter") else {
        return error_response("transactions-history", LedgerError::MissingField("emitter"));
    };
    match state.ledger.get_transaction_history(account).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response("transactions-history", e),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// =============================
/// Router
/// =============================

pub fn create_router(ledger: Arc<LedgerService>) -> Router {
    let state = ApiState { ledger };

    Router::new()
        .route("/health", get(health))
        .route("/request-loan", post(request_loan))
        .route("/send-money", post(send_money))
        .route("/balance", get(balance))
        .route("/transactions-history", get(transactions_history))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    ledger: Arc<LedgerService>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(ledger);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("Ledger API listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
