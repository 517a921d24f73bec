use anyhow::anyhow;
use chrono::{DateTime, Datelike, Duration, Utc};

use crate::domain::{generate_token, hash_token, User, ValidationError};
use crate::storage::Repository;

use super::AppError;

/// Default lifetime of a login session.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Issues and resolves bearer tokens for shop operators.
pub struct AuthService {
    repo: Repository,
    token_ttl: Duration,
}

/// A freshly issued login session. `token` is only ever shown here.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

impl AuthService {
    pub fn new(repo: Repository, token_ttl: Duration) -> Self {
        Self { repo, token_ttl }
    }

    /// Register an operator account.
    pub async fn create_user(&self, username: &str, password: &str) -> Result<User, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::single("username", "Username is required").into());
        }
        if password.is_empty() {
            return Err(ValidationError::single("password", "Password is required").into());
        }
        if self.repo.get_user_by_username(username).await?.is_some() {
            return Err(AppError::UserAlreadyExists(username.to_string()));
        }

        let user = User::new(username.to_string(), password);
        self.repo.save_user(&user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    /// Check credentials and open a session. Unknown users and wrong
    /// passwords fail the same way.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AppError> {
        let user = match self.repo.get_user_by_username(username.trim()).await? {
            Some(user) if user.verify_password(password) => user,
            _ => {
                tracing::warn!(username = %username, "failed login attempt");
                return Err(AppError::InvalidCredentials);
            }
        };

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .filter(|t| t.year() <= 9999)
            .ok_or_else(|| anyhow!("token lifetime {} is out of range", self.token_ttl))?;
        let token = generate_token();
        self.repo
            .save_session(&hash_token(&token), user.id, now, expires_at)
            .await?;

        let purged = self.repo.delete_expired_sessions(now).await?;
        if purged > 0 {
            tracing::debug!(purged, "expired sessions removed");
        }

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(Session {
            token,
            user,
            expires_at,
        })
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        self.repo
            .get_session_user(&hash_token(token), Utc::now())
            .await?
            .ok_or(AppError::InvalidToken)
    }
}
