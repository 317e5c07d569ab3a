use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_cargo::style::CLAP_STYLING;
use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::{Cell, Color, Table};
use mimalloc::MiMalloc;
use tallykv::{Builder, CounterError, CounterService, ErrorKind, LocalStore};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(about, version, styles = CLAP_STYLING)]
struct Cli {
    /// Path to the store directory
    #[arg(long, default_value = "./tallykv", value_name = "PATH")]
    db: PathBuf,

    /// Compare-and-swap attempts before an increment reports contention
    #[arg(long, default_value = "10", value_name = "N")]
    max_attempts: u32,

    /// Timeout for each store call in milliseconds
    #[arg(long, default_value = "5000", value_name = "MS")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value of a counter
    Get {
        /// Counter name
        name: String,
    },

    /// Set a counter to an integer value
    Set {
        /// Counter name
        name: String,

        /// New value, e.g. 42 or -7
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Increment a counter by one, creating it at 1 if missing
    Incr {
        /// Counter name
        name: String,
    },

    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let counters = Builder::new()
        .path(&cli.db)
        .max_attempts(cli.max_attempts)
        .request_timeout(Duration::from_millis(cli.timeout_ms))
        .build()
        .await
        .with_context(|| format!("Failed to open store at `{}`", cli.db.display()))?;

    let outcome = run(&counters, cli.command).await;
    counters.close().await.context("Failed to close store")?;

    Ok(match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_code(err.kind()))
        }
    })
}

/// Logs go to stderr, filtered by `RUST_LOG` (default: warn)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(
    counters: &CounterService<LocalStore>,
    command: Commands,
) -> std::result::Result<(), CounterError> {
    match command {
        Commands::Get { name } => {
            println!("{}", counters.get_counter(&name).await?);
        }
        Commands::Set { name, value } => {
            let version = counters.set_counter(&name, &value).await?;
            println!("ok (version {version})");
        }
        Commands::Incr { name } => {
            let incremented = counters.increment_counter(&name).await?;
            println!("{} (version {})", incremented.value, incremented.version);
        }
        Commands::Stats => display_stats(counters).await,
    }
    Ok(())
}

async fn display_stats(counters: &CounterService<LocalStore>) {
    let stats = counters.store().stats().await;

    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN);
    table.set_header(vec![Cell::new("Stat").fg(Color::Green), Cell::new("Value").fg(Color::Cyan)]);
    table.add_row(vec!["path".to_string(), counters.store().path().display().to_string()]);
    table.add_row(vec!["counters".to_string(), stats.keys.to_string()]);
    table.add_row(vec!["next version".to_string(), stats.current_version.to_string()]);
    table.add_row(vec!["wal bytes".to_string(), stats.wal_bytes.to_string()]);

    println!("{table}");
}

/// Distinct exit status per outcome kind, so scripts can branch on it
fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Invalid => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Corrupt => 4,
        ErrorKind::Contention => 5,
        ErrorKind::Overflow => 6,
        ErrorKind::Unavailable => 7,
    }
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}

#[test]
fn parses_negative_set_value() {
    let cli = Cli::try_parse_from(["tallykv", "set", "balance", "-5"]).unwrap();
    assert!(matches!(cli.command, Commands::Set { ref value, .. } if value == "-5"));
}
