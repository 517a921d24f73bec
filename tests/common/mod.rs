// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use khata::api::{self, AppState};
use khata::application::LedgerService;
use khata::domain::{Customer, CustomerDraft, TransactionDraft, TransactionType};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_USERNAME: &str = "shopkeeper";
pub const TEST_PASSWORD: &str = "s3cret-pass";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to create a router over a temporary database with one registered user
pub async fn test_app() -> Result<(Router, AppState, TempDir)> {
    test_app_with_ttl(Duration::hours(24)).await
}

/// Same as `test_app`, with a chosen login token lifetime
pub async fn test_app_with_ttl(token_ttl: Duration) -> Result<(Router, AppState, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let state = AppState::open(db_path.to_str().unwrap(), token_ttl).await?;
    state.auth.create_user(TEST_USERNAME, TEST_PASSWORD).await?;
    Ok((api::router(state.clone()), state, temp_dir))
}

/// Send one request through the router and decode the JSON body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, json))
}

/// Log in as the test user and return the bearer token
pub async fn login(app: &Router) -> Result<String> {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "username": TEST_USERNAME, "password": TEST_PASSWORD })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    Ok(body["token"].as_str().unwrap().to_string())
}

/// Test fixture: a customer with a debt of 500, a payment of 200 and a debt of 100
pub async fn customer_with_history(service: &LedgerService, name: &str) -> Result<Customer> {
    let customer = service.create_customer(CustomerDraft::new(name)).await?;
    for (tt, amount, date) in [
        (TransactionType::Debt, 500.0, "2024-01-01"),
        (TransactionType::Payment, 200.0, "2024-01-05"),
        (TransactionType::Debt, 100.0, "2024-01-09"),
    ] {
        service
            .create_transaction(customer.id, TransactionDraft::new(tt, amount).with_date(date))
            .await?;
    }
    Ok(customer)
}
