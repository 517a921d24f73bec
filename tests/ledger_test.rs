mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use common::{customer_with_history, test_service};
use khata::application::{AppError, AuthService};
use khata::domain::{
    hash_token, CustomerDraft, TransactionDraft, TransactionType, MAX_AMOUNT_CENTS,
};
use khata::Repository;
use uuid::Uuid;

#[tokio::test]
async fn test_balance_follows_debts_and_payments() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = customer_with_history(&service, "Meena").await?;

    assert_eq!(service.customer_balance(customer.id).await?, 40000);

    let entry = service.get_customer_balance(customer.id).await?;
    assert_eq!(entry.customer.name, "Meena");
    assert_eq!(entry.balance, 40000);

    Ok(())
}

#[tokio::test]
async fn test_mutations_report_balance_after_write() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = service.create_customer(CustomerDraft::new("Anil")).await?;

    let created = service
        .create_transaction(
            customer.id,
            TransactionDraft::new(TransactionType::Debt, 250.0),
        )
        .await?;
    assert_eq!(created.current_balance, 25000);

    let updated = service
        .update_transaction(
            created.transaction.id,
            TransactionDraft::new(TransactionType::Payment, 100.0),
        )
        .await?;
    assert_eq!(updated.current_balance, -10000);
    assert_eq!(
        updated.current_balance,
        service.customer_balance(customer.id).await?
    );

    let deleted = service.delete_transaction(created.transaction.id).await?;
    assert_eq!(deleted.customer_id, customer.id);
    assert_eq!(deleted.current_balance, 0);

    Ok(())
}

#[tokio::test]
async fn test_transaction_for_unknown_customer_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service
        .create_transaction(
            Uuid::new_v4(),
            TransactionDraft::new(TransactionType::Debt, 100.0),
        )
        .await;
    assert!(matches!(result, Err(AppError::CustomerNotFound(_))));

    // Nothing was written
    assert!(service.list_all_transactions().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_non_positive_amount_leaves_balance_unchanged() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = customer_with_history(&service, "Meena").await?;

    for amount in [0.0, -50.0] {
        let result = service
            .create_transaction(
                customer.id,
                TransactionDraft::new(TransactionType::Debt, amount),
            )
            .await;
        match result {
            Err(AppError::Validation(e)) => assert!(e.has_field("amount")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    assert_eq!(service.customer_balance(customer.id).await?, 40000);
    assert_eq!(
        service
            .list_transactions_by_customer(customer.id)
            .await?
            .len(),
        3
    );
    Ok(())
}

#[tokio::test]
async fn test_invalid_update_keeps_stored_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = service.create_customer(CustomerDraft::new("Ravi")).await?;
    let created = service
        .create_transaction(
            customer.id,
            TransactionDraft::new(TransactionType::Debt, 80.0),
        )
        .await?;

    let mut draft = TransactionDraft::new(TransactionType::Debt, 10.0);
    draft.transaction_type = Some("refund".to_string());
    let result = service
        .update_transaction(created.transaction.id, draft)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let stored = service.get_transaction(created.transaction.id).await?;
    assert_eq!(stored.amount_cents, 8000);
    assert_eq!(service.customer_balance(customer.id).await?, 8000);
    Ok(())
}

#[tokio::test]
async fn test_unknown_transaction_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let missing = Uuid::new_v4();

    assert!(matches!(
        service
            .update_transaction(missing, TransactionDraft::new(TransactionType::Debt, 1.0))
            .await,
        Err(AppError::TransactionNotFound(_))
    ));
    assert!(matches!(
        service.delete_transaction(missing).await,
        Err(AppError::TransactionNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_customer_transactions_most_recent_first() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = customer_with_history(&service, "Meena").await?;

    let transactions = service.list_transactions_by_customer(customer.id).await?;
    let dates: Vec<String> = transactions
        .iter()
        .map(|t| t.date.format("%Y-%m-%d").to_string())
        .collect();
    assert_eq!(dates, ["2024-01-09", "2024-01-05", "2024-01-01"]);

    // Unknown customers simply have no transactions
    assert!(service
        .list_transactions_by_customer(Uuid::new_v4())
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn test_customers_sorted_by_name_ignoring_case() -> Result<()> {
    let (service, _temp) = test_service().await?;
    for name in ["zara", "Bilal", "anita"] {
        service.create_customer(CustomerDraft::new(name)).await?;
    }

    let names: Vec<String> = service
        .list_customers(None)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["anita", "Bilal", "zara"]);
    Ok(())
}

#[tokio::test]
async fn test_customer_search_matches_name_and_phone() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_customer(CustomerDraft::new("Sunita Devi").with_phone("98765 43210"))
        .await?;
    service
        .create_customer(CustomerDraft::new("Mohan Lal").with_phone("9123456780"))
        .await?;

    let by_name = service.list_customers(Some("sunita")).await?;
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "Sunita Devi");

    let by_phone = service.list_customers(Some("91234")).await?;
    assert_eq!(by_phone.len(), 1);
    assert_eq!(by_phone[0].name, "Mohan Lal");

    assert_eq!(service.list_customers(Some("  ")).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_update_customer_replaces_all_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = service
        .create_customer(
            CustomerDraft::new("Kiran")
                .with_phone("9876543210")
                .with_address("12 Market Road"),
        )
        .await?;

    let updated = service
        .update_customer(customer.id, CustomerDraft::new("Kiran Rao"))
        .await?;
    assert_eq!(updated.name, "Kiran Rao");
    assert_eq!(updated.phone, None);
    assert_eq!(updated.address, None);
    assert_eq!(updated.created_at, customer.created_at);

    let stored = service.get_customer(customer.id).await?;
    assert_eq!(stored.name, "Kiran Rao");
    assert_eq!(stored.phone, None);
    Ok(())
}

#[tokio::test]
async fn test_update_customer_rejects_invalid_phone() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = service.create_customer(CustomerDraft::new("Kiran")).await?;

    let result = service
        .update_customer(customer.id, CustomerDraft::new("Kiran").with_phone("12ab"))
        .await;
    match result {
        Err(AppError::Validation(e)) => assert!(e.has_field("phone")),
        other => panic!("expected validation error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_deleted_customer_leaves_orphans_for_integrity_check() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let kept = customer_with_history(&service, "Meena").await?;
    let removed = customer_with_history(&service, "Ravi").await?;

    let report = service.check_integrity().await?;
    assert!(report.is_healthy());
    assert_eq!(report.total_outstanding, 80000);

    service.delete_customer(removed.id).await?;
    assert!(matches!(
        service.get_customer(removed.id).await,
        Err(AppError::CustomerNotFound(_))
    ));

    let report = service.check_integrity().await?;
    assert_eq!(report.customer_count, 1);
    assert_eq!(report.transaction_count, 6);
    assert_eq!(report.orphaned_transactions, 3);
    assert_eq!(report.total_outstanding, 40000);
    assert!(!report.is_healthy());

    // The remaining customer is unaffected
    assert_eq!(service.customer_balance(kept.id).await?, 40000);
    Ok(())
}

#[tokio::test]
async fn test_customer_balances_listing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    customer_with_history(&service, "Meena").await?;
    let quiet = service.create_customer(CustomerDraft::new("Arjun")).await?;

    let entries = service.list_customer_balances(None).await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].customer.id, quiet.id);
    assert_eq!(entries[0].balance, 0);
    assert_eq!(entries[1].customer.name, "Meena");
    assert_eq!(entries[1].balance, 40000);
    Ok(())
}

#[tokio::test]
async fn test_amount_cap_keeps_balances_in_range() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = service.create_customer(CustomerDraft::new("Big")).await?;

    for _ in 0..2 {
        service
            .create_transaction(
                customer.id,
                TransactionDraft::new(TransactionType::Debt, 1e12),
            )
            .await?;
    }
    assert_eq!(
        service.customer_balance(customer.id).await?,
        2 * MAX_AMOUNT_CENTS
    );

    let result = service
        .create_transaction(
            customer.id,
            TransactionDraft::new(TransactionType::Debt, 9.0e16),
        )
        .await;
    match result {
        Err(AppError::Validation(e)) => assert!(e.has_field("amount")),
        other => panic!("expected validation error, got {:?}", other),
    }

    let entries = service.list_customer_balances(None).await?;
    assert_eq!(entries[0].balance, 2 * MAX_AMOUNT_CENTS);
    assert_eq!(
        service.check_integrity().await?.total_outstanding,
        2 * MAX_AMOUNT_CENTS
    );
    Ok(())
}

#[tokio::test]
async fn test_date_beyond_year_9999_is_a_validation_error() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = customer_with_history(&service, "Meena").await?;

    let result = service
        .create_transaction(
            customer.id,
            TransactionDraft::new(TransactionType::Debt, 10.0).with_date("+12345-01-01"),
        )
        .await;
    match result {
        Err(AppError::Validation(e)) => assert!(e.has_field("date")),
        other => panic!("expected validation error, got {:?}", other),
    }

    assert_eq!(
        service
            .list_transactions_by_customer(customer.id)
            .await?
            .len(),
        3
    );
    assert_eq!(service.customer_balance(customer.id).await?, 40000);
    Ok(())
}

#[tokio::test]
async fn test_expired_session_is_rejected_and_purged() -> Result<()> {
    let temp_dir = tempfile::TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;

    let auth = AuthService::new(repo.clone(), Duration::hours(-1));
    auth.create_user("shopkeeper", "s3cret-pass").await?;
    let session = auth.login("shopkeeper", "s3cret-pass").await?;
    assert!(session.expires_at < Utc::now());
    assert!(matches!(
        auth.authenticate(&session.token).await,
        Err(AppError::InvalidToken)
    ));

    // A stale session and a live one: only the stale one is purged
    let user = session.user;
    let now = Utc::now();
    repo.save_session(&hash_token("stale"), user.id, now, now - Duration::minutes(5))
        .await?;
    repo.save_session(&hash_token("live"), user.id, now, now + Duration::hours(1))
        .await?;
    assert_eq!(repo.delete_expired_sessions(now).await?, 1);

    let live = AuthService::new(repo, Duration::hours(1));
    assert_eq!(live.authenticate("live").await?.id, user.id);
    assert!(matches!(
        live.authenticate("stale").await,
        Err(AppError::InvalidToken)
    ));
    Ok(())
}
