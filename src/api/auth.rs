//! Login and bearer-token resolution.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::domain::User;

use super::dto::{ApiJson, LoginRequest, LoginResponse};
use super::{ApiErrorResponse, AppState};

/// The operator making the request, resolved from `Authorization: Bearer`.
/// Handlers that take this extractor reject unauthenticated requests with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = bearer_token(parts)
            .ok_or_else(|| ApiErrorResponse::unauthorized("No token provided"))?;

        let user = state.auth.authenticate(&token).await?;
        Ok(AuthUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiErrorResponse> {
    let session = state.auth.login(&request.username, &request.password).await?;

    Ok(Json(LoginResponse {
        success: true,
        token: session.token,
        user: session.user.into(),
        expires_at: session.expires_at,
    }))
}
