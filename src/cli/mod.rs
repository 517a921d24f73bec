use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::api::{self, AppState};
use crate::application::{AuthService, LedgerService, DEFAULT_TOKEN_TTL_HOURS};
use crate::domain::{describe_balance, format_cents, parse_cents, sum_cents, Cents};
use crate::storage::Repository;

/// Khata - Shop Credit Ledger
#[derive(Parser)]
#[command(name = "khata")]
#[command(about = "A shop ledger of customer debts and payments, served over HTTP")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "KHATA_DATABASE", default_value = "khata.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Run the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = 5000)]
        port: u16,

        /// How long a login token stays valid, in hours
        #[arg(long, env = "KHATA_TOKEN_TTL_HOURS", default_value_t = DEFAULT_TOKEN_TTL_HOURS)]
        token_ttl_hours: i64,
    },

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// List customers with their balances
    Customers {
        /// Only customers whose name or phone contains this
        #[arg(short, long)]
        search: Option<String>,

        /// Only customers owing at least this much (e.g., "100.00")
        #[arg(long)]
        min_balance: Option<String>,
    },

    /// Verify ledger integrity
    Check,

    /// Export data to CSV or JSON
    #[command(subcommand)]
    Export(ExportCommands),
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user who can log in to the API
    Create {
        /// Username (must be unique)
        username: String,

        /// Password
        #[arg(long, env = "KHATA_PASSWORD")]
        password: String,
    },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// One customer's transactions with a running balance (CSV)
    Statement {
        /// Customer ID
        #[arg(short, long)]
        customer: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Every customer's current balance (CSV)
    Balances {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// All customers and transactions (JSON)
    Full {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve {
                host,
                port,
                token_ttl_hours,
            } => {
                let token_ttl = token_ttl(token_ttl_hours)?;
                init_tracing(self.verbose);
                run_server(&self.database, &host, port, token_ttl).await?;
            }

            Commands::User(user_cmd) => {
                let repo = open_repository(&self.database).await?;
                run_user_command(repo, user_cmd).await?;
            }

            Commands::Customers {
                search,
                min_balance,
            } => {
                let service = LedgerService::init(&self.database).await?;
                let min_balance = min_balance
                    .map(|a| parse_cents(&a))
                    .transpose()
                    .context("Invalid amount format. Use '100.00' or '100'")?;
                run_customers_command(&service, search.as_deref(), min_balance, self.verbose)
                    .await?;
            }

            Commands::Check => {
                let service = LedgerService::init(&self.database).await?;
                run_check_command(&service).await?;
            }

            Commands::Export(export_cmd) => {
                let service = LedgerService::init(&self.database).await?;
                run_export_command(&service, export_cmd).await?;
            }
        }

        Ok(())
    }
}

/// Longest accepted login lifetime: one hundred years.
const MAX_TOKEN_TTL_HOURS: i64 = 100 * 366 * 24;

fn token_ttl(hours: i64) -> Result<Duration> {
    anyhow::ensure!(hours > 0, "Token TTL must be at least one hour");
    anyhow::ensure!(
        hours <= MAX_TOKEN_TTL_HOURS,
        "Token TTL must be at most {} hours",
        MAX_TOKEN_TTL_HOURS
    );
    Duration::try_hours(hours).context("Token TTL is out of range")
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "khata=debug,tower_http=debug"
    } else {
        "khata=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn open_repository(database_path: &str) -> Result<Repository> {
    let url = crate::application::service::database_url(database_path);
    Repository::init(&url)
        .await
        .with_context(|| format!("Failed to open database: {}", database_path))
}

async fn run_server(database_path: &str, host: &str, port: u16, token_ttl: Duration) -> Result<()> {
    let state = AppState::open(database_path, token_ttl).await?;
    let app = api::router(state);

    let address = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to address {}", address))?;

    tracing::info!(%address, database = %database_path, "khata API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Completes on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

async fn run_user_command(repo: Repository, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Create { username, password } => {
            let auth = AuthService::new(repo, Duration::hours(DEFAULT_TOKEN_TTL_HOURS));
            let user = auth.create_user(&username, &password).await?;
            println!("Created user: {} ({})", user.username, user.id);
        }
    }
    Ok(())
}

async fn run_customers_command(
    service: &LedgerService,
    search: Option<&str>,
    min_balance: Option<Cents>,
    verbose: bool,
) -> Result<()> {
    let mut entries = service.list_customer_balances(search).await?;
    if let Some(min) = min_balance {
        entries.retain(|entry| entry.balance >= min);
    }

    if entries.is_empty() {
        println!("No customers found.");
        return Ok(());
    }

    println!("{:<24} {:<16} {:>18}", "NAME", "PHONE", "BALANCE");
    println!("{}", "-".repeat(60));

    for entry in &entries {
        println!(
            "{:<24} {:<16} {:>18}",
            entry.customer.name,
            entry.customer.phone.as_deref().unwrap_or("-"),
            describe_balance(entry.balance)
        );
        if verbose {
            println!("  id: {}", entry.customer.id);
        }
    }

    println!("{}", "-".repeat(60));
    let total = sum_cents(entries.iter().map(|entry| entry.balance));
    println!("{:<41} {:>18}", "Total outstanding:", describe_balance(total));

    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Customers:    {}", report.customer_count);
    println!("Transactions: {}", report.transaction_count);
    println!("Outstanding:  {}", format_cents(report.total_outstanding));
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(service: &LedgerService, cmd: ExportCommands) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    fn open_output(output: Option<&str>) -> Result<Box<dyn Write>> {
        Ok(match output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path))?;
                Box::new(file)
            }
            None => Box::new(stdout()),
        })
    }

    let exporter = Exporter::new(service);

    match cmd {
        ExportCommands::Statement { customer, output } => {
            let customer_id = Uuid::parse_str(customer.trim())
                .context("Invalid customer ID format (expected UUID)")?;
            let writer = open_output(output.as_deref())?;
            let count = exporter.export_statement_csv(customer_id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        ExportCommands::Balances { output } => {
            let writer = open_output(output.as_deref())?;
            let count = exporter.export_balances_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        ExportCommands::Full { output } => {
            let writer = open_output(output.as_deref())?;
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full database: {} customers, {} transactions",
                    snapshot.customers.len(),
                    snapshot.transactions.len()
                );
            }
        }
    }

    Ok(())
}
