use serde::Serialize;

use super::Cents;

/// Result of a ledger consistency check.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub customer_count: i64,
    pub transaction_count: i64,
    /// Transactions whose customer no longer exists
    pub orphaned_transactions: i64,
    pub invalid_amounts: i64,
    /// Sum of all customers' balances: what the shop is owed overall
    pub total_outstanding: Cents,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn build_integrity_report(
    customer_count: i64,
    transaction_count: i64,
    orphaned_transactions: i64,
    invalid_amounts: i64,
    total_outstanding: Cents,
) -> IntegrityReport {
    let mut issues = Vec::new();

    if orphaned_transactions > 0 {
        issues.push(format!(
            "{} transaction(s) reference a customer that no longer exists",
            orphaned_transactions
        ));
    }
    if invalid_amounts > 0 {
        issues.push(format!(
            "{} transaction(s) have a non-positive amount",
            invalid_amounts
        ));
    }

    IntegrityReport {
        customer_count,
        transaction_count,
        orphaned_transactions,
        invalid_amounts,
        total_outstanding,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_report() {
        let report = build_integrity_report(3, 10, 0, 0, 12000);
        assert!(report.is_healthy());
    }

    #[test]
    fn test_orphans_are_reported() {
        let report = build_integrity_report(1, 4, 2, 0, 0);
        assert!(!report.is_healthy());
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].starts_with("2 transaction(s)"));
    }
}
