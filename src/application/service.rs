use chrono::{DateTime, SubsecRound, Utc};

use crate::domain::{
    build_integrity_report, compute_all_balances, compute_balance, sum_cents, Cents, Customer,
    CustomerDraft, CustomerId, IntegrityReport, Transaction, TransactionDraft, TransactionId,
};
use crate::storage::Repository;

use super::AppError;

/// Application service for customers, transactions and their balances.
/// This is the only place business rules live; the API and CLI both call it.
pub struct LedgerService {
    repo: Repository,
}

/// A transaction together with its customer's balance right after the
/// mutation that produced it.
#[derive(Debug, Clone)]
pub struct TransactionResult {
    pub transaction: Transaction,
    pub current_balance: Cents,
}

/// Outcome of deleting a transaction.
#[derive(Debug, Clone)]
pub struct DeletionResult {
    pub customer_id: CustomerId,
    pub current_balance: Cents,
}

/// A customer with their derived balance.
#[derive(Debug, Clone)]
pub struct BalanceEntry {
    pub customer: Customer,
    pub balance: Cents,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Open (creating if needed) the database at the given path and bring
    /// the schema up to date.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let repo = Repository::init(&database_url(database_path)).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Customer operations
    // ========================

    /// Create a new customer.
    pub async fn create_customer(&self, draft: CustomerDraft) -> Result<Customer, AppError> {
        let fields = draft.validate()?;
        let customer = Customer::new(fields, now());
        self.repo.save_customer(&customer).await?;

        tracing::info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer, AppError> {
        self.repo
            .get_customer(id)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(id.to_string()))
    }

    /// Get a customer together with their current balance.
    pub async fn get_customer_balance(&self, id: CustomerId) -> Result<BalanceEntry, AppError> {
        let customer = self.get_customer(id).await?;
        let balance = self.customer_balance(id).await?;
        Ok(BalanceEntry { customer, balance })
    }

    /// List customers by name, ignoring case. `search` keeps only customers
    /// whose name or phone contains it.
    pub async fn list_customers(&self, search: Option<&str>) -> Result<Vec<Customer>, AppError> {
        let customers = self.repo.list_customers().await?;
        Ok(match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => customers.into_iter().filter(|c| c.matches(term)).collect(),
            None => customers,
        })
    }

    /// Full replace of a customer's name, phone and address.
    pub async fn update_customer(
        &self,
        id: CustomerId,
        draft: CustomerDraft,
    ) -> Result<Customer, AppError> {
        let fields = draft.validate()?;
        let mut customer = self.get_customer(id).await?;
        customer.replace(fields, now());

        if !self.repo.update_customer(&customer).await? {
            return Err(AppError::CustomerNotFound(id.to_string()));
        }

        tracing::info!(customer_id = %id, "customer updated");
        Ok(customer)
    }

    /// Delete a customer. Their transactions are kept and show up as
    /// orphans in `check_integrity`.
    pub async fn delete_customer(&self, id: CustomerId) -> Result<(), AppError> {
        if !self.repo.delete_customer(id).await? {
            return Err(AppError::CustomerNotFound(id.to_string()));
        }

        tracing::info!(customer_id = %id, "customer deleted");
        Ok(())
    }

    /// Every customer with their balance, in name order.
    pub async fn list_customer_balances(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<BalanceEntry>, AppError> {
        let customers = self.list_customers(search).await?;
        let transactions = self.repo.list_transactions().await?;
        let balances = compute_all_balances(&transactions);

        Ok(customers
            .into_iter()
            .map(|customer| {
                let balance = balances.get(&customer.id).copied().unwrap_or(0);
                BalanceEntry { customer, balance }
            })
            .collect())
    }

    // ========================
    // Transaction operations
    // ========================

    /// Record a debt or payment for an existing customer.
    pub async fn create_transaction(
        &self,
        customer_id: CustomerId,
        draft: TransactionDraft,
    ) -> Result<TransactionResult, AppError> {
        let now = now();
        let fields = draft.validate(now)?;
        let transaction = Transaction::new(customer_id, fields, now);

        let ledger = self
            .repo
            .insert_transaction(&transaction)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(customer_id.to_string()))?;
        let current_balance = compute_balance(&ledger);

        tracing::info!(
            transaction_id = %transaction.id,
            customer_id = %customer_id,
            current_balance,
            "transaction created"
        );
        Ok(TransactionResult {
            transaction,
            current_balance,
        })
    }

    /// Replace a transaction's type, amount, description and date.
    /// Omitted optional fields are cleared; an omitted date becomes now.
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        draft: TransactionDraft,
    ) -> Result<TransactionResult, AppError> {
        let now = now();
        let fields = draft.validate(now)?;
        let mut transaction = self.get_transaction(id).await?;
        transaction.replace(fields, now);

        let ledger = self
            .repo
            .update_transaction(&transaction)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))?;
        let current_balance = compute_balance(&ledger);

        tracing::info!(
            transaction_id = %id,
            customer_id = %transaction.customer_id,
            current_balance,
            "transaction updated"
        );
        Ok(TransactionResult {
            transaction,
            current_balance,
        })
    }

    /// Delete a transaction and return its customer's remaining balance.
    pub async fn delete_transaction(&self, id: TransactionId) -> Result<DeletionResult, AppError> {
        let (customer_id, ledger) = self
            .repo
            .delete_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))?;
        let current_balance = compute_balance(&ledger);

        tracing::info!(
            transaction_id = %id,
            customer_id = %customer_id,
            current_balance,
            "transaction deleted"
        );
        Ok(DeletionResult {
            customer_id,
            current_balance,
        })
    }

    /// Get a transaction by ID.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }

    /// A customer's transactions, most recent first. Unknown customers
    /// simply have none.
    pub async fn list_transactions_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Transaction>, AppError> {
        Ok(self
            .repo
            .list_transactions_for_customer(customer_id)
            .await?)
    }

    /// Every transaction in the ledger, orphans included.
    pub async fn list_all_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions().await?)
    }

    /// Recompute a customer's balance from their full transaction set.
    pub async fn customer_balance(&self, customer_id: CustomerId) -> Result<Cents, AppError> {
        let transactions = self.list_transactions_by_customer(customer_id).await?;
        Ok(compute_balance(&transactions))
    }

    // ========================
    // Integrity operations
    // ========================

    /// Check ledger integrity and return a report.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self.repo.get_integrity_stats().await?;
        let customers = self.repo.list_customers().await?;
        let transactions = self.repo.list_transactions().await?;
        let balances = compute_all_balances(&transactions);

        let total_outstanding =
            sum_cents(customers.iter().filter_map(|c| balances.get(&c.id).copied()));

        Ok(build_integrity_report(
            stats.customer_count,
            stats.transaction_count,
            stats.orphaned_transactions,
            stats.invalid_amounts,
            total_outstanding,
        ))
    }
}

/// Current time at the precision the store keeps, so values handed back
/// from a mutation equal what a later read returns.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn database_url(database_path: &str) -> String {
    format!("sqlite:{}?mode=rwc", database_path)
}
