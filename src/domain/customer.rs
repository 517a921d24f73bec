use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{normalize_optional, ValidationError, Validator};

pub type CustomerId = Uuid;

const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(fields: CustomerFields, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: fields.name,
            phone: fields.phone,
            address: fields.address,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full replace of the mutable fields. Optional fields missing from
    /// `fields` are cleared, not kept.
    pub fn replace(&mut self, fields: CustomerFields, now: DateTime<Utc>) {
        self.name = fields.name;
        self.phone = fields.phone;
        self.address = fields.address;
        self.updated_at = now;
    }

    /// Case-insensitive substring match on name or phone.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term)
            || self
                .phone
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(&term))
    }
}

/// Unvalidated customer input, as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDraft {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Customer fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerFields {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CustomerDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn validate(self) -> Result<CustomerFields, ValidationError> {
        let mut v = Validator::default();

        let name = normalize_optional(self.name);
        if name.is_none() {
            v.reject("name", "Name is required");
        }

        let phone = normalize_optional(self.phone);
        if let Some(phone) = &phone {
            if !is_valid_phone(phone) {
                v.reject("phone", "Invalid phone");
            }
        }

        let address = normalize_optional(self.address);

        v.finish(|| CustomerFields {
            name: name.unwrap_or_default(),
            phone,
            address,
        })
    }
}

/// A phone number may carry spaces, dashes, dots, parentheses and a leading
/// `+`; what remains must be 10 to 15 digits.
pub fn is_valid_phone(phone: &str) -> bool {
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let mut digits = 0;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return false,
        }
    }
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}
