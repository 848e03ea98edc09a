//! SQLite-backed persistence for the ledger
//!
//! Owns the schema and every row mutation. The transfer path runs as a
//! single database transaction so the debit, the credit, and the ledger
//! append commit together or not at all.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::error::{LedgerError, Result};
use crate::models::{Account, Cents, Loan, LoanStatus, Transaction, User};

/// Initial schema: users, accounts, transactions, loans.
const MIGRATION_001_INITIAL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    rib INTEGER NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    phone TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL UNIQUE,
    balance INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    emitter TEXT NOT NULL,
    receiver TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount > 0),
    date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_emitter ON transactions(emitter);

CREATE INDEX IF NOT EXISTS idx_transactions_receiver ON transactions(receiver);

CREATE TABLE IF NOT EXISTS loans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_name TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount > 0),
    created_at TEXT NOT NULL,
    status TEXT NOT NULL
)
"#;

/// Result of a committed transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub transaction: Transaction,
    /// Emitter balance after the debit committed.
    pub emitter_balance: Cents,
}

/// Repository for persisting and querying ledger rows. Cloning shares the
/// underlying pool.
#[derive(Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
}

impl LedgerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database, creating the file if needed.
    ///
    /// A single pooled connection: SQLite allows one writer at a time
    /// anyway, and pooled `sqlite::memory:` databases are per-connection.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    /// Run schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        for statement in MIGRATION_001_INITIAL.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    // =============================
    // Users
    // =============================

    pub async fn create_user(
        &self,
        name: &str,
        rib: i64,
        email: &str,
        phone: &str,
    ) -> Result<User> {
        let result = sqlx::query("INSERT INTO users (name, rib, email, phone) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(rib)
            .bind(email)
            .bind(phone)
            .execute(&self.pool)
            .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            rib,
            email: email.to_string(),
            phone: phone.to_string(),
        })
    }

    // =============================
    // Accounts
    // =============================

    /// Create an account. Accounts are opened out-of-band (seeding, tests);
    /// the HTTP surface exposes no creation endpoint.
    pub async fn create_account(&self, owner: &str, opening_balance: Cents) -> Result<Account> {
        let created_at = Utc::now();
        let result =
            sqlx::query("INSERT INTO accounts (owner, balance, created_at) VALUES (?, ?, ?)")
                .bind(owner)
                .bind(opening_balance)
                .bind(created_at.to_rfc3339())
                .execute(&self.pool)
                .await?;

        Ok(Account {
            id: result.last_insert_rowid(),
            owner: owner.to_string(),
            balance: opening_balance,
            created_at,
        })
    }

    pub async fn find_account(&self, owner: &str) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT id, owner, balance, created_at FROM accounts WHERE owner = ?")
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    // =============================
    // Transfers
    // =============================

    /// Move `amount` from `emitter` to `receiver` and append the ledger row,
    /// all inside one transaction.
    ///
    /// The debit is conditional on sufficient balance in the same statement,
    /// so two concurrent transfers from one account can never both pass the
    /// check (no double-spend, balance never driven negative).
    pub async fn execute_transfer(
        &self,
        emitter: &str,
        receiver: &str,
        amount: Cents,
        date: DateTime<Utc>,
    ) -> Result<TransferOutcome> {
        let mut tx = self.pool.begin().await?;

        let emitter_row = sqlx::query("SELECT id, balance FROM accounts WHERE owner = ?")
            .bind(emitter)
            .fetch_optional(&mut *tx)
            .await?;
        let emitter_row = emitter_row
            .ok_or_else(|| LedgerError::AccountNotFound(emitter.to_string()))?;
        let emitter_id: i64 = emitter_row.get("id");

        let debit =
            sqlx::query("UPDATE accounts SET balance = balance - ? WHERE id = ? AND balance >= ?")
                .bind(amount)
                .bind(emitter_id)
                .bind(amount)
                .execute(&mut *tx)
                .await?;
        if debit.rows_affected() == 0 {
            return Err(LedgerError::InsufficientFunds {
                amount,
                receiver: receiver.to_string(),
                balance: emitter_row.get("balance"),
            });
        }

        let credit = sqlx::query("UPDATE accounts SET balance = balance + ? WHERE owner = ?")
            .bind(amount)
            .bind(receiver)
            .execute(&mut *tx)
            .await?;
        if credit.rows_affected() == 0 {
            // Dropping `tx` rolls the debit back.
            return Err(LedgerError::ReceiverNotFound(receiver.to_string()));
        }

        let inserted =
            sqlx::query("INSERT INTO transactions (emitter, receiver, amount, date) VALUES (?, ?, ?, ?)")
                .bind(emitter)
                .bind(receiver)
                .bind(amount)
                .bind(date.to_rfc3339())
                .execute(&mut *tx)
                .await?;

        let emitter_balance: Cents =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE id = ?")
                .bind(emitter_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(TransferOutcome {
            transaction: Transaction {
                id: inserted.last_insert_rowid(),
                emitter: emitter.to_string(),
                receiver: receiver.to_string(),
                amount,
                date,
            },
            emitter_balance,
        })
    }

    /// All transactions where `account` is emitter or receiver, oldest first.
    pub async fn transactions_for(&self, account: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, emitter, receiver, amount, date
            FROM transactions
            WHERE emitter = ? OR receiver = ?
            ORDER BY date, id
            "#,
        )
        .bind(account)
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_transaction).collect()
    }

    // =============================
    // Loans
    // =============================

    pub async fn insert_loan(
        &self,
        user_name: &str,
        amount: Cents,
        created_at: DateTime<Utc>,
    ) -> Result<Loan> {
        let status = LoanStatus::Pending;
        let result = sqlx::query(
            "INSERT INTO loans (user_name, amount, created_at, status) VALUES (?, ?, ?, ?)",
        )
        .bind(user_name)
        .bind(amount)
        .bind(created_at.to_rfc3339())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(Loan {
            id: result.last_insert_rowid(),
            user_name: user_name.to_string(),
            amount,
            created_at,
            status,
        })
    }
}

// =============================
// Row Mapping
// =============================

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let created_at: String = row.get("created_at");
    Ok(Account {
        id: row.get("id"),
        owner: row.get("owner"),
        balance: row.get("balance"),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
    let date: String = row.get("date");
    Ok(Transaction {
        id: row.get("id"),
        emitter: row.get("emitter"),
        receiver: row.get("receiver"),
        amount: row.get("amount"),
        date: parse_timestamp(&date)?,
    })
}
