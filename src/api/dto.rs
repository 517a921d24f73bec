//! Request and response bodies.
//!
//! Field names are camelCase on the wire; amounts are rupees.

use axum::extract::FromRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::BalanceEntry;
use crate::domain::{
    cents_to_amount, BalanceStatus, Cents, Customer, CustomerId, Transaction, TransactionDraft,
    TransactionId, TransactionType, User, UserId,
};

use super::ApiErrorResponse;

/// `Json` extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiErrorResponse))]
pub struct ApiJson<T>(pub T);

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub customer_id: Option<String>,
    #[serde(flatten)]
    pub draft: TransactionDraft,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: UserResponse,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerResponse {
    pub success: bool,
    pub customer: Customer,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetailResponse {
    pub success: bool,
    pub customer: Customer,
    pub current_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerListResponse {
    pub success: bool,
    pub customers: Vec<Customer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBalance {
    pub customer: Customer,
    pub current_balance: f64,
    pub status: BalanceStatus,
    /// e.g. "Owes ₹400.00"
    pub label: String,
}

impl From<BalanceEntry> for CustomerBalance {
    fn from(entry: BalanceEntry) -> Self {
        Self {
            current_balance: cents_to_amount(entry.balance),
            status: BalanceStatus::of(entry.balance),
            label: crate::domain::describe_balance(entry.balance),
            customer: entry.customer,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerBalanceListResponse {
    pub success: bool,
    pub customers: Vec<CustomerBalance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub customer_id: CustomerId,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            customer_id: t.customer_id,
            transaction_type: t.transaction_type,
            amount: cents_to_amount(t.amount_cents),
            description: t.description,
            date: t.date,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// The transaction's own fields, flattened, plus the new balance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMutationResponse {
    pub success: bool,
    #[serde(flatten)]
    pub transaction: TransactionResponse,
    pub current_balance: f64,
}

impl TransactionMutationResponse {
    pub fn new(transaction: Transaction, current_balance: Cents) -> Self {
        Self {
            success: true,
            transaction: transaction.into(),
            current_balance: cents_to_amount(current_balance),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionListResponse {
    pub success: bool,
    pub txns: Vec<TransactionResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTransactionResponse {
    pub success: bool,
    pub current_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
