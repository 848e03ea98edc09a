//! Core data models for the bank ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ================= Money =================
//

/// Money is represented as integer cents to avoid floating-point precision
/// issues. 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Largest representable amount, in whole units. Keeps the f64 boundary
/// conversion inside the range where every cent value is exact.
const MAX_MAJOR_UNITS: f64 = 10_000_000_000_000.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount is not a finite number")]
    NotFinite,
    #[error("amount is out of range")]
    OutOfRange,
    #[error("amount has more than two decimal places")]
    Precision,
}

/// Convert a JSON-level float amount into cents.
/// Rejects non-finite values and anything below cent precision.
pub fn cents_from_major(amount: f64) -> Result<Cents, MoneyError> {
    if !amount.is_finite() {
        return Err(MoneyError::NotFinite);
    }
    if amount.abs() > MAX_MAJOR_UNITS {
        return Err(MoneyError::OutOfRange);
    }

    let scaled = amount * 100.0;
    let rounded = scaled.round();
    // Tolerance tracks the ULP of `scaled`: representation noise of a
    // legitimate two-decimal amount stays within a few ULP at any
    // magnitude, while a genuine third digit is orders of magnitude above.
    if (scaled - rounded).abs() > scaled.abs().max(1.0) * 8.0 * f64::EPSILON {
        return Err(MoneyError::Precision);
    }

    Ok(rounded as Cents)
}

/// Convert cents back to the float the wire contract uses.
/// Exact for any amount within [`cents_from_major`]'s accepted range.
pub fn cents_to_major(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Format cents as a human-readable amount string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Serde adapter: serialize `Cents` fields as two-decimal floats, the shape
/// the HTTP surface exchanges with the tool layer.
pub mod cents_as_major {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{cents_from_major, cents_to_major, Cents};

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(cents_to_major(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        let value = f64::deserialize(deserializer)?;
        cents_from_major(value).map_err(serde::de::Error::custom)
    }
}

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// The only state the core exposes; no approval workflow exists here.
    Pending,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
        }
    }
}

//
// ================= Rows =================
//

/// A bank customer. Shares storage with the ledger rows but is not touched
/// by any of the four ledger operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub rib: i64,
    pub email: String,
    pub phone: String,
}

/// An account, keyed by a store-assigned id. `owner` is the unique display
/// name the HTTP surface looks accounts up by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub owner: String,
    #[serde(with = "cents_as_major")]
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

/// One entry of the append-only transfer ledger. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub emitter: String,
    pub receiver: String,
    #[serde(with = "cents_as_major")]
    pub amount: Cents,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    pub user_name: String,
    #[serde(with = "cents_as_major")]
    pub amount: Cents,
    pub created_at: DateTime<Utc>,
    pub status: LoanStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_cents_from_major() {
        assert_eq!(cents_from_major(50.0), Ok(5000));
        assert_eq!(cents_from_major(12.34), Ok(1234));
        assert_eq!(cents_from_major(0.01), Ok(1));
        assert_eq!(cents_from_major(-50.0), Ok(-5000));
        assert_eq!(cents_from_major(0.0), Ok(0));
    }

    #[test]
    fn test_cents_from_major_rejects_sub_cent_precision() {
        assert_eq!(cents_from_major(0.001), Err(MoneyError::Precision));
        assert_eq!(cents_from_major(12.345), Err(MoneyError::Precision));
        // Third digits must be rejected at large magnitudes too, not
        // absorbed by the rounding step.
        assert_eq!(cents_from_major(1000.001), Err(MoneyError::Precision));
        assert_eq!(cents_from_major(50000.005), Err(MoneyError::Precision));
        assert_eq!(cents_from_major(99_999_999.995), Err(MoneyError::Precision));
    }

    #[test]
    fn test_cents_from_major_accepts_two_decimals_at_large_magnitude() {
        assert_eq!(cents_from_major(1000.01), Ok(100_001));
        assert_eq!(cents_from_major(50000.05), Ok(5_000_005));
        assert_eq!(cents_from_major(99_999_999.99), Ok(9_999_999_999));
    }

    #[test]
    fn test_cents_from_major_rejects_non_finite() {
        assert_eq!(cents_from_major(f64::NAN), Err(MoneyError::NotFinite));
        assert_eq!(cents_from_major(f64::INFINITY), Err(MoneyError::NotFinite));
        assert_eq!(
            cents_from_major(MAX_MAJOR_UNITS * 2.0),
            Err(MoneyError::OutOfRange)
        );
    }

    #[test]
    fn test_round_trip_is_exact() {
        for cents in [0, 1, 99, 100, 12345, 9_999_999_999] {
            assert_eq!(cents_from_major(cents_to_major(cents)), Ok(cents));
        }
    }

    #[test]
    fn test_transaction_wire_shape() {
        let tx = Transaction {
            id: 1,
            emitter: "john".to_string(),
            receiver: "jane".to_string(),
            amount: 20000,
            date: Utc::now(),
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["amount"], serde_json::json!(200.0));

        let back: Transaction = serde_json::from_value(value).unwrap();
        assert_eq!(back.amount, 20000);
    }
}
