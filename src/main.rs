//! Expense Tracker - Entry Point
//!
//! CLI over the ledger: record, summarize and list transactions, or serve
//! the metrics endpoint with a periodic refresh.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn, Level};

use expense_tracker::aggregate::{KindFilter, LedgerFilter, Period};
use expense_tracker::ledger::{
    write_ledger_to, FinancialRecord, Ledger, RecordDate, RecordQuery, SortOrder, TransactionKind,
    DATE_FORMAT,
};
use expense_tracker::{App, Config, VERSION};

/// Expense Tracker - personal ledger with Prometheus metrics
#[derive(Parser)]
#[command(name = "expense-tracker")]
#[command(version = VERSION)]
#[command(about = "Personal expense ledger with Prometheus metrics and structured logs")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ledger CSV file (overrides configuration and LEDGER_PATH)
    #[arg(short, long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an expense or income record
    Add {
        description: String,
        category: String,
        amount: f64,
        /// Transaction type
        #[arg(short, long, value_enum, default_value_t = KindArg::Expense)]
        kind: KindArg,
        /// Date as DD/MM/YYYY (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Show total expenses, income and balance
    Summary,
    /// Show the category breakdown
    Analysis {
        #[arg(long, value_enum, default_value_t = PeriodArg::All)]
        period: PeriodArg,
        #[arg(long, value_enum, default_value_t = KindFilterArg::Both)]
        kind: KindFilterArg,
    },
    /// List records
    Records {
        /// Only these categories (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long, value_enum, default_value_t = SortArg::Newest)]
        sort: SortArg,
        /// Print in ledger file format
        #[arg(long)]
        csv: bool,
    },
    /// List categories offered for new records
    Categories,
    /// Serve /metrics and refresh ledger metrics periodically
    Serve {
        /// Seconds between ledger reloads
        #[arg(long, default_value_t = 15)]
        refresh_secs: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Expense,
    Income,
}

#[derive(Clone, Copy, ValueEnum)]
enum PeriodArg {
    All,
    CurrentMonth,
    LastThreeMonths,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindFilterArg {
    Both,
    Expenses,
    Income,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Newest,
    Oldest,
    Highest,
    Lowest,
}

impl From<KindArg> for TransactionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Expense => TransactionKind::Expense,
            KindArg::Income => TransactionKind::Income,
        }
    }
}

impl From<PeriodArg> for Period {
    fn from(period: PeriodArg) -> Self {
        match period {
            PeriodArg::All => Period::All,
            PeriodArg::CurrentMonth => Period::CurrentMonth,
            PeriodArg::LastThreeMonths => Period::LastThreeMonths,
        }
    }
}

impl From<KindFilterArg> for KindFilter {
    fn from(kind: KindFilterArg) -> Self {
        match kind {
            KindFilterArg::Both => KindFilter::Both,
            KindFilterArg::Expenses => KindFilter::Expenses,
            KindFilterArg::Income => KindFilter::Income,
        }
    }
}

impl From<SortArg> for SortOrder {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Newest => SortOrder::DateNewest,
            SortArg::Oldest => SortOrder::DateOldest,
            SortArg::Highest => SortOrder::AmountHighest,
            SortArg::Lowest => SortOrder::AmountLowest,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    if let Some(ledger) = cli.ledger {
        config.ledger.path = ledger;
    }

    expense_tracker::util::init_tracing(&config.logging)?;

    info!(
        version = VERSION,
        ledger = %config.ledger.path.display(),
        "Starting Expense Tracker"
    );

    let app = Arc::new(App::bootstrap(config));
    let outcome = run(cli.command, app.clone()).await;
    // flush spans still queued for the collector
    app.telemetry().shutdown();
    outcome
}

async fn run(command: Commands, app: Arc<App>) -> Result<ExitCode> {
    match command {
        Commands::Add {
            description,
            category,
            amount,
            kind,
            date,
        } => add(&app, date, description, category, amount, kind),
        Commands::Summary => {
            let totals = app.summary();
            println!("Total expenses: R$ {:.2}", totals.expense);
            println!("Total income:   R$ {:.2}", totals.income);
            println!("Balance:        R$ {:.2}", totals.balance);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Analysis { period, kind } => {
            let shares = app.analysis(LedgerFilter::new(period.into(), kind.into()));
            if shares.is_empty() {
                println!("No records for the selected filters.");
            }
            for share in shares {
                println!(
                    "{:<20} R$ {:>12.2} {:>6.2}%",
                    share.category, share.total, share.percentage
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Records {
            categories,
            sort,
            csv,
        } => {
            let query = RecordQuery {
                categories,
                order: sort.into(),
            };
            let records = app.records(&query);
            if csv {
                let ledger: Ledger = records.into_iter().collect();
                write_ledger_to(std::io::stdout().lock(), &ledger)
                    .context("Failed to write records")?;
            } else {
                for record in &records {
                    println!(
                        "{}  {:<8} {:<16} R$ {:>10.2}  {}",
                        record.date, record.kind, record.category, record.amount, record.description
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Categories => {
            for category in app.categories() {
                println!("{category}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve { refresh_secs } => {
            serve(app, Duration::from_secs(refresh_secs.max(1))).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn add(
    app: &App,
    date: Option<String>,
    description: String,
    category: String,
    amount: f64,
    kind: KindArg,
) -> Result<ExitCode> {
    let date = match date {
        Some(raw) => NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .with_context(|| format!("Invalid date {raw:?}, expected DD/MM/YYYY"))?,
        None => Local::now().date_naive(),
    };

    let record = FinancialRecord::new(RecordDate::from(date), description, category, amount, kind.into());
    match app.submit(record) {
        Ok(receipt) => {
            println!(
                "Adicionado: {} - R$ {:.2} ({})",
                receipt.record.description, receipt.record.amount, receipt.record.category
            );
            println!("Balance: R$ {:.2}", receipt.totals.balance);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn serve(app: Arc<App>, every: Duration) -> Result<()> {
    match app.telemetry().start_exporter() {
        Some(addr) => info!(%addr, "Metrics endpoint listening"),
        None => warn!("Metrics endpoint unavailable, continuing without it"),
    }
    app.telemetry().log(
        Level::INFO,
        "serving",
        json!({ "refresh_secs": every.as_secs() }),
    );

    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately; bootstrap already loaded
    ticker.tick().await;

    let refresh_loop = async {
        loop {
            ticker.tick().await;
            let app = app.clone();
            match tokio::task::spawn_blocking(move || app.refresh()).await {
                Ok(totals) => info!(balance = totals.balance, "Ledger metrics refreshed"),
                Err(e) => error!(error = %e, "Refresh task failed"),
            }
        }
    };

    tokio::select! {
        _ = refresh_loop => {}
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Expense Tracker stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
