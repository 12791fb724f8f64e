// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;

// Use library instead of local modules
use ledger_recon::{
    logging, statement_label, BankSource, Config, DefaultReconciliationService, ReconcileRequest,
    ReconciliationResult, ReconciliationService,
};

#[derive(Parser)]
#[command(name = "ledger-recon", version, about = "Reconcile a system ledger against bank statements")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level for diagnostics on stderr
    #[arg(long, global = true, default_value = "warn", env = "LOG_LEVEL")]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile and print a summary (or JSON)
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile and browse the result in a terminal UI
    View {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// System ledger CSV (trx_id,amount,type,timestamp)
    #[arg(long)]
    system: PathBuf,

    /// Bank statement CSV (unique_id,amount,date); repeatable
    #[arg(long = "bank")]
    banks: Vec<PathBuf>,

    /// First day of the window (YYYY-MM-DD)
    #[arg(long)]
    start: String,

    /// Last day of the window, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::with_overrides([("log_format", "text"), ("log_level", cli.log_level.as_str())])
        .context("invalid --log-level")?;
    logging::init(&config);

    match cli.command {
        Command::Run { input, json } => {
            let result = run_reconciliation(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_report(&result);
            }
        }
        Command::View { input } => {
            let result = run_reconciliation(&input)?;
            run_ui_mode(result)?;
        }
    }

    Ok(())
}

fn run_reconciliation(input: &InputArgs) -> Result<ReconciliationResult> {
    let system = File::open(&input.system)
        .with_context(|| format!("Failed to open system ledger: {}", input.system.display()))?;

    let mut request = ReconcileRequest::new(input.start.as_str(), input.end.as_str(), system);
    let mut unopened = Vec::new();

    // Unreadable statements are skipped, same as the HTTP service
    for path in &input.banks {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.csv")
            .to_string();

        match File::open(path) {
            Ok(file) => request = request.with_bank(BankSource::new(file_name, file)),
            Err(e) => {
                eprintln!("⚠️  Skipping {}: {}", path.display(), e);
                unopened.push(statement_label(&file_name));
            }
        }
    }

    let service = DefaultReconciliationService::new();
    let mut result = service.reconcile(request)?;
    result.diagnostics.failed_bank_sources.extend(unopened);

    Ok(result)
}

fn print_report(result: &ReconciliationResult) {
    println!("⚖️  Ledger Reconciliation");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Processed:    {}", result.total_processed);
    println!("Matched:      {}", result.total_matched);
    println!("Unmatched:    {}", result.total_unmatched);
    println!("Discrepancy:  {}", result.total_discrepancy);

    if !result.discrepancies.is_empty() {
        println!("\n🔍 Same-day discrepancies");
        for d in &result.discrepancies {
            println!(
                "  {}  {} ↔ {} ({})  system {}  bank {}  diff {}",
                d.date, d.system_id, d.bank_id, d.bank_label, d.system_amount, d.bank_amount, d.difference
            );
        }
    }

    if !result.unmatched_system.is_empty() {
        println!("\n📒 Unmatched system transactions");
        for tx in &result.unmatched_system {
            println!("  {}  {}  {:>12}  {}", tx.timestamp, tx.id, tx.amount.to_string(), tx.kind);
        }
    }

    for (label, txs) in &result.unmatched_bank {
        println!("\n🏦 Unmatched in {}", label);
        for tx in txs {
            println!("  {}  {}  {:>12}", tx.date, tx.external_id, tx.amount.to_string());
        }
    }

    let diag = &result.diagnostics;
    if diag.skipped_system_rows + diag.skipped_bank_rows > 0 || !diag.failed_bank_sources.is_empty() {
        println!(
            "\n⚠️  Skipped rows: {} system, {} bank; failed statements: {}",
            diag.skipped_system_rows,
            diag.skipped_bank_rows,
            diag.failed_bank_sources.len()
        );
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if result.is_fully_reconciled() {
        println!("✅ Fully reconciled");
    } else {
        println!("❌ {}", result.summary());
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(result: ReconciliationResult) -> Result<()> {
    let mut app = ui::App::new(result);
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_result: ReconciliationResult) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: ledger-recon run --json");
    std::process::exit(1);
}
