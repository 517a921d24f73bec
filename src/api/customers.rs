//! Customer routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::domain::{cents_to_amount, CustomerDraft, CustomerId};

use super::auth::AuthUser;
use super::dto::{
    ApiJson, CustomerBalanceListResponse, CustomerDetailResponse, CustomerListResponse,
    CustomerQuery, CustomerResponse, SuccessResponse,
};
use super::{ApiErrorResponse, AppState};

/// An id that does not parse cannot name an existing customer.
fn customer_id(raw: &str) -> Result<CustomerId, ApiErrorResponse> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiErrorResponse::not_found("Customer not found"))
}

/// `POST /api/customers`
pub async fn create_customer(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(draft): ApiJson<CustomerDraft>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiErrorResponse> {
    let customer = state.ledger.create_customer(draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(CustomerResponse {
            success: true,
            customer,
        }),
    ))
}

/// `GET /api/customers[?search=term]`
pub async fn list_customers(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<CustomerListResponse>, ApiErrorResponse> {
    let customers = state.ledger.list_customers(query.search.as_deref()).await?;
    Ok(Json(CustomerListResponse {
        success: true,
        customers,
    }))
}

/// `GET /api/customers/balances[?search=term]`
pub async fn list_customer_balances(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<CustomerBalanceListResponse>, ApiErrorResponse> {
    let entries = state
        .ledger
        .list_customer_balances(query.search.as_deref())
        .await?;
    Ok(Json(CustomerBalanceListResponse {
        success: true,
        customers: entries.into_iter().map(Into::into).collect(),
    }))
}

/// `GET /api/customers/{id}`
pub async fn get_customer(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CustomerDetailResponse>, ApiErrorResponse> {
    let entry = state.ledger.get_customer_balance(customer_id(&id)?).await?;
    Ok(Json(CustomerDetailResponse {
        success: true,
        customer: entry.customer,
        current_balance: cents_to_amount(entry.balance),
    }))
}

/// `PUT /api/customers/{id}`
pub async fn update_customer(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<CustomerDraft>,
) -> Result<Json<CustomerResponse>, ApiErrorResponse> {
    let customer = state
        .ledger
        .update_customer(customer_id(&id)?, draft)
        .await?;
    Ok(Json(CustomerResponse {
        success: true,
        customer,
    }))
}

/// `DELETE /api/customers/{id}`
pub async fn delete_customer(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiErrorResponse> {
    state.ledger.delete_customer(customer_id(&id)?).await?;
    Ok(Json(SuccessResponse { success: true }))
}
