use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{
    describe_balance, format_cents, saturate_cents, signed_amount, Customer, CustomerId,
    Transaction,
};

/// Database snapshot for a full JSON export
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub customers: Vec<Customer>,
    pub transactions: Vec<Transaction>,
}

/// Exporter for converting ledger data to CSV and JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export one customer's statement: oldest first, with the running
    /// balance after each row. Fails if the customer does not exist.
    pub async fn export_statement_csv<W: Write>(
        &self,
        customer_id: CustomerId,
        writer: W,
    ) -> Result<usize> {
        self.service.get_customer(customer_id).await?;
        let mut transactions = self
            .service
            .list_transactions_by_customer(customer_id)
            .await?;
        transactions.reverse();

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["id", "date", "type", "amount", "description", "balance"])?;

        let mut balance: i128 = 0;
        for transaction in &transactions {
            balance += i128::from(signed_amount(transaction));
            csv_writer.write_record([
                transaction.id.to_string(),
                transaction.date.format("%Y-%m-%d").to_string(),
                transaction.transaction_type.as_str().to_string(),
                format_cents(transaction.amount_cents),
                transaction.description.clone().unwrap_or_default(),
                format_cents(saturate_cents(balance)),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export every customer's balance to CSV
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let entries = self.service.list_customer_balances(None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["customer_id", "name", "phone", "balance", "label"])?;

        for entry in &entries {
            csv_writer.write_record([
                entry.customer.id.to_string(),
                entry.customer.name.clone(),
                entry.customer.phone.clone().unwrap_or_default(),
                format_cents(entry.balance),
                describe_balance(entry.balance),
            ])?;
        }

        csv_writer.flush()?;
        Ok(entries.len())
    }

    /// Export the whole ledger as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DatabaseSnapshot> {
        let customers = self.service.list_customers(None).await?;
        let transactions = self.service.list_all_transactions().await?;

        let snapshot = DatabaseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            customers,
            transactions,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
