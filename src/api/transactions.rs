//! Transaction routes. Every mutation answers with the owning customer's
//! balance as recomputed right after the write.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{cents_to_amount, FieldError, TransactionDraft, TransactionId, ValidationError};

use super::auth::AuthUser;
use super::dto::{
    ApiJson, CreateTransactionRequest, DeleteTransactionResponse, TransactionListResponse,
    TransactionMutationResponse,
};
use super::{ApiErrorResponse, AppState};

fn transaction_id(raw: &str) -> Result<TransactionId, ApiErrorResponse> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiErrorResponse::not_found("Transaction not found"))
}

/// `POST /api/transactions`
pub async fn create_transaction(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(request): ApiJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionMutationResponse>), ApiErrorResponse> {
    let parsed = request
        .customer_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

    let Some(customer_id) = parsed else {
        // Report the body's other problems along with the bad id
        let mut errors = vec![FieldError::new("customerId", "Valid customerId required")];
        if let Err(e) = request.draft.validate(Utc::now()) {
            errors.extend(e.errors);
        }
        return Err(ApiErrorResponse::validation(ValidationError { errors }));
    };

    let result = state
        .ledger
        .create_transaction(customer_id, request.draft)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionMutationResponse::new(
            result.transaction,
            result.current_balance,
        )),
    ))
}

/// `GET /api/transactions/customer/{id}`, most recent first.
pub async fn list_customer_transactions(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TransactionListResponse>, ApiErrorResponse> {
    let transactions = match Uuid::parse_str(id.trim()) {
        Ok(customer_id) => state.ledger.list_transactions_by_customer(customer_id).await?,
        Err(_) => Vec::new(),
    };

    Ok(Json(TransactionListResponse {
        success: true,
        txns: transactions.into_iter().map(Into::into).collect(),
    }))
}

/// `PUT /api/transactions/{id}`
pub async fn update_transaction(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<TransactionDraft>,
) -> Result<Json<TransactionMutationResponse>, ApiErrorResponse> {
    let result = state
        .ledger
        .update_transaction(transaction_id(&id)?, draft)
        .await?;

    Ok(Json(TransactionMutationResponse::new(
        result.transaction,
        result.current_balance,
    )))
}

/// `DELETE /api/transactions/{id}`
pub async fn delete_transaction(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteTransactionResponse>, ApiErrorResponse> {
    let result = state.ledger.delete_transaction(transaction_id(&id)?).await?;

    Ok(Json(DeleteTransactionResponse {
        success: true,
        current_balance: cents_to_amount(result.current_balance),
    }))
}
