//! Bank Ledger Service
//!
//! A transactional ledger service for a conversational banking agent:
//! - Account balances, money transfers, loan requests, transaction history
//! - Atomic transfers: debit, credit, and ledger append commit together
//! - Discriminated domain errors (insufficient funds, unknown accounts)
//!   kept distinct from validation and infrastructure failures end-to-end
//! - HTTP surface for the agent tool layer, plus the typed client it uses

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod store;

pub use error::{LedgerError, Result};

// Re-export common types
pub use ledger::LedgerService;
pub use models::*;
pub use store::LedgerStore;
