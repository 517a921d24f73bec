use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub type UserId = Uuid;

/// Rounds of salted SHA-256 applied to a password.
const PASSWORD_HASH_ROUNDS: u32 = 10_000;

/// A shop operator allowed to use the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub salt: String,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password: &str) -> Self {
        let salt = hex::encode(rand::random::<[u8; 16]>());
        let password_hash = hash_password(password, &salt);
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            salt,
            created_at: Utc::now(),
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        constant_time_eq(
            hash_password(password, &self.salt).as_bytes(),
            self.password_hash.as_bytes(),
        )
    }
}

/// Salted, iterated SHA-256 of a password, hex-encoded.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..PASSWORD_HASH_ROUNDS {
        digest = Sha256::new()
            .chain_update(salt.as_bytes())
            .chain_update(digest)
            .finalize();
    }
    hex::encode(digest)
}

/// Fresh bearer token: 32 random bytes, hex-encoded.
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// Only this digest of a token is ever stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
