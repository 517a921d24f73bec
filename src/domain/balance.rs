use std::collections::HashMap;

use serde::Serialize;

use super::{format_cents, Cents, CustomerId, Transaction, CURRENCY_SYMBOL};

/// Signed contribution of one transaction to its customer's balance.
pub fn signed_amount(transaction: &Transaction) -> Cents {
    transaction
        .amount_cents
        .saturating_mul(transaction.transaction_type.sign())
}

/// Narrow a wide running total back to `Cents`, saturating at
/// `±Cents::MAX` so the result can always be negated.
pub fn saturate_cents(total: i128) -> Cents {
    let limit = i128::from(Cents::MAX);
    total.clamp(-limit, limit) as Cents
}

/// Sum amounts without overflowing. The sum is exact in `i128` and only
/// saturates when narrowed, so it does not depend on order.
pub fn sum_cents(amounts: impl IntoIterator<Item = Cents>) -> Cents {
    saturate_cents(amounts.into_iter().map(i128::from).sum())
}

/// Compute a customer's balance from their transactions.
/// Balance = sum of debts - sum of payments. Order does not matter and an
/// empty slice is a settled account.
pub fn compute_balance(transactions: &[Transaction]) -> Cents {
    sum_cents(transactions.iter().map(signed_amount))
}

/// Compute balances for every customer that appears in `transactions`.
/// Customers without transactions are absent from the map (balance = 0).
pub fn compute_all_balances(transactions: &[Transaction]) -> HashMap<CustomerId, Cents> {
    let mut totals: HashMap<CustomerId, i128> = HashMap::new();

    for transaction in transactions {
        *totals.entry(transaction.customer_id).or_insert(0) +=
            i128::from(signed_amount(transaction));
    }

    totals
        .into_iter()
        .map(|(customer_id, total)| (customer_id, saturate_cents(total)))
        .collect()
}

/// Which way a balance leans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceStatus {
    /// The customer owes the shop
    Owes,
    /// The shop owes the customer
    Credit,
    /// Settled
    Clear,
}

impl BalanceStatus {
    pub fn of(balance: Cents) -> Self {
        match balance {
            b if b > 0 => BalanceStatus::Owes,
            b if b < 0 => BalanceStatus::Credit,
            _ => BalanceStatus::Clear,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BalanceStatus::Owes => "Owes",
            BalanceStatus::Credit => "Credit",
            BalanceStatus::Clear => "Clear",
        }
    }
}

/// Human-readable balance, e.g. "Owes ₹400.00" or "Credit ₹50.00".
pub fn describe_balance(balance: Cents) -> String {
    format!(
        "{} {}{}",
        BalanceStatus::of(balance).label(),
        CURRENCY_SYMBOL,
        format_cents(balance.saturating_abs())
    )
}
