use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{normalize_optional, ValidationError, Validator};
use super::{amount_to_cents, cents_to_amount, Cents, CustomerId, MAX_AMOUNT_CENTS};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Goods or cash handed over on credit; the customer owes more
    Debt,
    /// Money received from the customer; the customer owes less
    Payment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Debt => "debt",
            TransactionType::Payment => "payment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "debt" => Some(TransactionType::Debt),
            "payment" => Some(TransactionType::Payment),
            _ => None,
        }
    }

    /// +1 for debts, -1 for payments.
    pub fn sign(&self) -> Cents {
        match self {
            TransactionType::Debt => 1,
            TransactionType::Payment => -1,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One debt or payment recorded against a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Owning customer; fixed at creation
    pub customer_id: CustomerId,
    pub transaction_type: TransactionType,
    /// Amount in paise (always positive)
    pub amount_cents: Cents,
    pub description: Option<String>,
    /// When the debt or payment happened in the real world
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(customer_id: CustomerId, fields: TransactionFields, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            transaction_type: fields.transaction_type,
            amount_cents: fields.amount_cents,
            description: fields.description,
            date: fields.date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full replace of type, amount, description and date. The owning
    /// customer never changes.
    pub fn replace(&mut self, fields: TransactionFields, now: DateTime<Utc>) {
        self.transaction_type = fields.transaction_type;
        self.amount_cents = fields.amount_cents;
        self.description = fields.description;
        self.date = fields.date;
        self.updated_at = now;
    }
}

/// Unvalidated transaction input, as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionDraft {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// Rupees; converted to paise during validation
    pub amount: Option<f64>,
    pub description: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    pub date: Option<String>,
}

/// Transaction fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFields {
    pub transaction_type: TransactionType,
    pub amount_cents: Cents,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
}

impl TransactionDraft {
    pub fn new(transaction_type: TransactionType, amount: f64) -> Self {
        Self {
            transaction_type: Some(transaction_type.as_str().to_string()),
            amount: Some(amount),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Validate the draft. A missing date defaults to `now`.
    pub fn validate(self, now: DateTime<Utc>) -> Result<TransactionFields, ValidationError> {
        let mut v = Validator::default();

        let transaction_type = self
            .transaction_type
            .as_deref()
            .and_then(TransactionType::from_str);
        if transaction_type.is_none() {
            v.reject("type", "Type must be debt or payment");
        }

        let amount_cents = match self.amount.filter(|a| a.is_finite()) {
            Some(amount) if amount > cents_to_amount(MAX_AMOUNT_CENTS) => {
                v.reject("amount", "Amount must be at most 1000000000000");
                None
            }
            amount => {
                let cents = amount.and_then(amount_to_cents).filter(|c| *c > 0);
                if cents.is_none() {
                    v.reject("amount", "Amount must be > 0");
                }
                cents
            }
        };

        let date = match normalize_optional(self.date) {
            Some(raw) => {
                let parsed = parse_date(&raw);
                if parsed.is_none() {
                    v.reject("date", "Date must be YYYY-MM-DD or RFC 3339");
                }
                parsed
            }
            None => Some(now),
        };

        let description = normalize_optional(self.description);

        v.finish(|| TransactionFields {
            transaction_type: transaction_type.unwrap_or(TransactionType::Debt),
            amount_cents: amount_cents.unwrap_or_default(),
            description,
            date: date.unwrap_or(now),
        })
    }
}

/// Parse `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
/// The UTC year must fall in 0000..=9999, the range RFC 3339 can represent.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    let parsed = match DateTime::parse_from_rfc3339(input) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc()),
    };
    parsed.filter(|dt| (0..=9999).contains(&dt.year()))
}
