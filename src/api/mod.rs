//! HTTP API.
//!
//! All ledger routes live under `/api` and require `Authorization: Bearer
//! <token>` except `POST /api/auth/login`. `GET /health` is open.

pub mod auth;
pub mod customers;
pub mod dto;
pub mod error;
pub mod transactions;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post, put},
};
use chrono::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::{AppError, AuthService, LedgerService};
use crate::storage::Repository;

pub use auth::AuthUser;
pub use dto::HealthResponse;
pub use error::{ApiErrorResponse, ErrorBody};

/// Shared handler dependencies.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(repo: Repository, token_ttl: Duration) -> Self {
        Self {
            ledger: Arc::new(LedgerService::new(repo.clone())),
            auth: Arc::new(AuthService::new(repo, token_ttl)),
        }
    }

    /// Open (creating and migrating if needed) the database at `database_path`.
    pub async fn open(database_path: &str, token_ttl: Duration) -> Result<Self, AppError> {
        let repo =
            Repository::init(&crate::application::service::database_url(database_path)).await?;
        Ok(Self::new(repo, token_ttl))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .route(
            "/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route("/customers/balances", get(customers::list_customer_balances))
        .route(
            "/customers/{id}",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/transactions", post(transactions::create_transaction))
        .route(
            "/transactions/customer/{id}",
            get(transactions::list_customer_transactions),
        )
        .route(
            "/transactions/{id}",
            put(transactions::update_transaction).delete(transactions::delete_transaction),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `GET /health`
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn route_not_found() -> ApiErrorResponse {
    ApiErrorResponse::not_found("Route not found")
}
