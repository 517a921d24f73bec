use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Customer, CustomerId, Transaction, TransactionId, TransactionType, User, UserId,
};

use super::MIGRATION_001_INITIAL;

const CUSTOMER_COLUMNS: &str = "id, name, phone, address, created_at, updated_at";

const TRANSACTION_COLUMNS: &str =
    "id, customer_id, transaction_type, amount_cents, description, date, created_at, updated_at";

const USER_COLUMNS: &str = "id, username, password_hash, salt, created_at";

/// Statistics for ledger integrity verification.
#[derive(Debug, Clone)]
pub struct IntegrityStats {
    pub customer_count: i64,
    pub transaction_count: i64,
    pub orphaned_transactions: i64,
    pub invalid_amounts: i64,
}

/// Repository for persisting and querying customers, transactions and users.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run against an initialized database.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Customer operations
    // ========================

    /// Save a new customer.
    pub async fn save_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, address, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer.id.to_string())
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(db_time(&customer.created_at))
        .bind(db_time(&customer.updated_at))
        .execute(&self.pool)
        .await
        .context("Failed to save customer")?;
        Ok(())
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    /// List all customers, ordered by name ignoring case.
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name COLLATE NOCASE, created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    /// Overwrite a customer's mutable fields. Returns false if the customer
    /// does not exist.
    pub async fn update_customer(&self, customer: &Customer) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET name = ?, phone = ?, address = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(db_time(&customer.updated_at))
        .bind(customer.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update customer")?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a customer. Its transactions are left untouched.
    /// Returns false if the customer does not exist.
    pub async fn delete_customer(&self, id: CustomerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete customer")?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_customer(row: &SqliteRow) -> Result<Customer> {
        let id_str: String = row.get("id");

        Ok(Customer {
            id: Uuid::parse_str(&id_str).context("Invalid customer ID")?,
            name: row.get("name"),
            phone: row.get("phone"),
            address: row.get("address"),
            created_at: parse_db_time(row.get("created_at")).context("Invalid created_at")?,
            updated_at: parse_db_time(row.get("updated_at")).context("Invalid updated_at")?,
        })
    }

    // ========================
    // Transaction operations
    // ========================
    //
    // Every mutation writes first and then re-reads the owning customer's
    // full transaction set inside the same SQLite transaction, so the
    // returned set is exactly the post-mutation state.

    /// Insert a transaction if its customer exists.
    /// Returns the customer's transactions after the insert, or `None` if
    /// the customer does not exist (nothing is written).
    pub async fn insert_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Option<Vec<Transaction>>> {
        let mut tx = self.pool.begin().await.context("Failed to begin")?;

        let customer_id = transaction.customer_id.to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (id, customer_id, transaction_type, amount_cents, description, date, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM customers WHERE id = ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(&customer_id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.amount_cents)
        .bind(&transaction.description)
        .bind(db_time(&transaction.date))
        .bind(db_time(&transaction.created_at))
        .bind(db_time(&transaction.updated_at))
        .bind(&customer_id)
        .execute(&mut *tx)
        .await
        .context("Failed to save transaction")?;

        if result.rows_affected() == 0 {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(None);
        }

        let ledger = Self::fetch_customer_transactions(&mut *tx, transaction.customer_id).await?;
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(Some(ledger))
    }

    /// Overwrite a transaction's type, amount, description, date and
    /// updated_at. Returns the owning customer's transactions afterwards,
    /// or `None` if the transaction does not exist.
    pub async fn update_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Option<Vec<Transaction>>> {
        let mut tx = self.pool.begin().await.context("Failed to begin")?;

        let row = sqlx::query(
            r#"
            UPDATE transactions
            SET transaction_type = ?, amount_cents = ?, description = ?, date = ?, updated_at = ?
            WHERE id = ?
            RETURNING customer_id
            "#,
        )
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.amount_cents)
        .bind(&transaction.description)
        .bind(db_time(&transaction.date))
        .bind(db_time(&transaction.updated_at))
        .bind(transaction.id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to update transaction")?;

        let Some(row) = row else {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(None);
        };

        let customer_id = Self::row_customer_id(&row)?;
        let ledger = Self::fetch_customer_transactions(&mut *tx, customer_id).await?;
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(Some(ledger))
    }

    /// Delete a transaction. Returns the owning customer's id and remaining
    /// transactions, or `None` if the transaction does not exist.
    pub async fn delete_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<(CustomerId, Vec<Transaction>)>> {
        let mut tx = self.pool.begin().await.context("Failed to begin")?;

        let row = sqlx::query("DELETE FROM transactions WHERE id = ? RETURNING customer_id")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to delete transaction")?;

        let Some(row) = row else {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(None);
        };

        let customer_id = Self::row_customer_id(&row)?;
        let ledger = Self::fetch_customer_transactions(&mut *tx, customer_id).await?;
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(Some((customer_id, ledger)))
    }

    /// Get a transaction by ID.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    /// List a customer's transactions, most recent date first.
    pub async fn list_transactions_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Transaction>> {
        Self::fetch_customer_transactions(&self.pool, customer_id).await
    }

    /// List every transaction in the ledger.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY date DESC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn fetch_customer_transactions<'e, E>(
        executor: E,
        customer_id: CustomerId,
    ) -> Result<Vec<Transaction>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE customer_id = ?
            ORDER BY date DESC, created_at DESC
            "#
        ))
        .bind(customer_id.to_string())
        .fetch_all(executor)
        .await
        .context("Failed to list transactions for customer")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_customer_id(row: &SqliteRow) -> Result<CustomerId> {
        let id_str: String = row.get("customer_id");
        Uuid::parse_str(&id_str).context("Invalid customer ID")
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let type_str: String = row.get("transaction_type");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            customer_id: Self::row_customer_id(row)?,
            transaction_type: TransactionType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", type_str))?,
            amount_cents: row.get("amount_cents"),
            description: row.get("description"),
            date: parse_db_time(row.get("date")).context("Invalid date")?,
            created_at: parse_db_time(row.get("created_at")).context("Invalid created_at")?,
            updated_at: parse_db_time(row.get("updated_at")).context("Invalid updated_at")?,
        })
    }

    // ========================
    // User and session operations
    // ========================

    /// Save a new user.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, salt, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .bind(db_time(&user.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;
        Ok(())
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by username")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Store a session for `user_id` under the hash of its bearer token.
    pub async fn save_session(
        &self,
        token_hash: &str,
        user_id: UserId,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(token_hash)
        .bind(user_id.to_string())
        .bind(db_time(&created_at))
        .bind(db_time(&expires_at))
        .execute(&self.pool)
        .await
        .context("Failed to save session")?;
        Ok(())
    }

    /// Resolve a token hash to its user if the session has not expired.
    pub async fn get_session_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.username, u.password_hash, u.salt, u.created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = ? AND s.expires_at > ?
            "#,
        )
        .bind(token_hash)
        .bind(db_time(&now))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch session")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Remove sessions that expired at or before `now`.
    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(db_time(&now))
            .execute(&self.pool)
            .await
            .context("Failed to delete expired sessions")?;
        Ok(result.rows_affected())
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            salt: row.get("salt"),
            created_at: parse_db_time(row.get("created_at")).context("Invalid created_at")?,
        })
    }

    // ========================
    // Integrity
    // ========================

    /// Get statistics for integrity checking.
    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM customers) AS customer_count,
                (SELECT COUNT(*) FROM transactions) AS transaction_count,
                (SELECT COUNT(*) FROM transactions t
                    WHERE NOT EXISTS (SELECT 1 FROM customers c WHERE c.id = t.customer_id)
                ) AS orphaned,
                (SELECT COUNT(*) FROM transactions WHERE amount_cents <= 0) AS invalid_amounts
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to gather integrity stats")?;

        Ok(IntegrityStats {
            customer_count: row.get("customer_count"),
            transaction_count: row.get("transaction_count"),
            orphaned_transactions: row.get("orphaned"),
            invalid_amounts: row.get("invalid_amounts"),
        })
    }
}

/// Fixed-width UTC timestamps so that text order equals time order.
fn db_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_db_time(value: String) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&value)
        .with_context(|| format!("Invalid timestamp: {}", value))?
        .with_timezone(&Utc))
}
