use clap::{Parser, Subcommand};
use commission_ledger::application::ledger::CommissionLedger;
use commission_ledger::config::LedgerConfig;
use commission_ledger::domain::ports::LedgerStoreRef;
use commission_ledger::infrastructure::audit::TracingAuditSink;
use commission_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use commission_ledger::interfaces::admin::{self, AdminAction};
use commission_ledger::interfaces::csv::affiliate_writer::AffiliateWriter;
use commission_ledger::interfaces::csv::command_reader::CommandReader;
use commission_ledger::interfaces::replay;
use commission_ledger::telemetry;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Parser)]
#[command(author, version, about = "Affiliate commission ledger", long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "LEDGER_DB_PATH", global = true)]
    db_path: Option<PathBuf>,

    /// How long an operation waits for a row lock, in milliseconds.
    #[arg(
        long,
        env = "LEDGER_LOCK_TIMEOUT_MS",
        global = true,
        default_value_t = 5000
    )]
    lock_timeout_ms: u64,

    /// Rows in the report's top earner list.
    #[arg(
        long,
        env = "LEDGER_TOP_EARNERS",
        global = true,
        default_value_t = LedgerConfig::DEFAULT_TOP_EARNERS
    )]
    top_earners: usize,

    /// Rows in the report's recent payout list.
    #[arg(
        long,
        env = "LEDGER_RECENT_PAYOUTS",
        global = true,
        default_value_t = LedgerConfig::DEFAULT_RECENT_PAYOUTS
    )]
    recent_payouts: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a CSV command stream and print affiliate balances.
    Replay {
        /// Input commands CSV file
        input: PathBuf,
        /// Print the JSON commission report instead of the balance CSV.
        #[arg(long)]
        report: bool,
    },
    /// Print the JSON commission report.
    Report,
    /// Re-derive balances and print any drift as JSON.
    Reconcile,
    /// Apply one JSON admin action and print the outcome.
    Admin {
        /// e.g. '{"op":"process_payout","withdrawal_id":1,"admin_id":"ops"}'
        action: String,
    },
}

impl Cli {
    fn config(&self) -> LedgerConfig {
        LedgerConfig {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            top_earner_limit: self.top_earners,
            recent_payout_limit: self.recent_payouts,
        }
    }

    fn store(&self) -> Result<LedgerStoreRef> {
        match &self.db_path {
            #[cfg(feature = "storage-rocksdb")]
            Some(db_path) => {
                use commission_ledger::infrastructure::rocksdb::RocksDBStore;
                let store = RocksDBStore::open(db_path).into_diagnostic()?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "storage-rocksdb"))]
            Some(_) => {
                warn!(
                    "Persistent storage requested via --db-path, but 'storage-rocksdb' feature \
                     is not enabled. Falling back to in-memory storage."
                );
                Ok(Arc::new(InMemoryLedgerStore::new()))
            }
            None => Ok(Arc::new(InMemoryLedgerStore::new())),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    telemetry::init_tracing();
    let cli = Cli::parse();

    let ledger = CommissionLedger::new(cli.store()?, Arc::new(TracingAuditSink), cli.config());

    match cli.command {
        Command::Replay { input, report } => {
            let file = File::open(input).into_diagnostic()?;
            let summary = replay::replay(&ledger, CommandReader::new(file)).await;
            if report {
                print_report(&ledger).await?;
            } else {
                let affiliates = ledger.directory().list().await.into_diagnostic()?;
                let stdout = io::stdout();
                let mut writer = AffiliateWriter::new(stdout.lock());
                writer.write_affiliates(&affiliates).into_diagnostic()?;
            }
            if summary.is_clean() {
                Ok(ExitCode::SUCCESS)
            } else {
                error!(
                    failed = summary.failed,
                    "commands failed in storage and were not applied"
                );
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Report => {
            print_report(&ledger).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Reconcile => {
            let drifts = ledger.balances().reconcile().await.into_diagnostic()?;
            print_json(&drifts)?;
            if drifts.is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                warn!(count = drifts.len(), "affiliate balances drifted");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Admin { action } => {
            let action: AdminAction = serde_json::from_str(&action).into_diagnostic()?;
            let outcome = admin::handle(&ledger, action).await;
            print_json(&outcome)?;
            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn print_report(ledger: &CommissionLedger) -> Result<()> {
    let report = ledger.reports().build().await.into_diagnostic()?;
    print_json(&report)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).into_diagnostic()?;
    writeln!(out).into_diagnostic()?;
    Ok(())
}
