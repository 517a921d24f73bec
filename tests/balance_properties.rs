use chrono::Utc;
use khata::domain::{
    compute_all_balances, compute_balance, signed_amount, Transaction, TransactionFields,
    TransactionType,
};
use proptest::prelude::*;
use uuid::Uuid;

fn build(customer_id: Uuid, entries: &[(bool, i64)]) -> Vec<Transaction> {
    let now = Utc::now();
    entries
        .iter()
        .map(|&(is_debt, amount_cents)| {
            let transaction_type = if is_debt {
                TransactionType::Debt
            } else {
                TransactionType::Payment
            };
            Transaction::new(
                customer_id,
                TransactionFields {
                    transaction_type,
                    amount_cents,
                    description: None,
                    date: now,
                },
                now,
            )
        })
        .collect()
}

fn entries() -> impl Strategy<Value = Vec<(bool, i64)>> {
    prop::collection::vec((any::<bool>(), 1i64..10_000_000), 0..40)
}

#[test]
fn empty_ledger_is_settled() {
    assert_eq!(compute_balance(&[]), 0);
}

proptest! {
    #[test]
    fn prop_balance_is_debts_minus_payments(entries in entries()) {
        let transactions = build(Uuid::new_v4(), &entries);
        let debts: i64 = entries.iter().filter(|(d, _)| *d).map(|(_, a)| a).sum();
        let payments: i64 = entries.iter().filter(|(d, _)| !*d).map(|(_, a)| a).sum();
        prop_assert_eq!(compute_balance(&transactions), debts - payments);
    }

    #[test]
    fn prop_balance_ignores_order(entries in entries()) {
        let mut transactions = build(Uuid::new_v4(), &entries);
        let forward = compute_balance(&transactions);
        transactions.reverse();
        prop_assert_eq!(compute_balance(&transactions), forward);
    }

    #[test]
    fn prop_removing_a_transaction_removes_its_contribution(
        entries in entries().prop_filter("non-empty", |e| !e.is_empty()),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut transactions = build(Uuid::new_v4(), &entries);
        let before = compute_balance(&transactions);
        let removed = transactions.remove(pick.index(transactions.len()));
        prop_assert_eq!(compute_balance(&transactions), before - signed_amount(&removed));
    }

    #[test]
    fn prop_per_customer_balances_match_single_customer(
        first in entries(),
        second in entries(),
    ) {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ours = build(a, &first);
        let theirs = build(b, &second);

        let mut all = ours.clone();
        all.extend(theirs.iter().cloned());
        let balances = compute_all_balances(&all);

        prop_assert_eq!(balances.get(&a).copied().unwrap_or(0), compute_balance(&ours));
        prop_assert_eq!(balances.get(&b).copied().unwrap_or(0), compute_balance(&theirs));
    }
}
