use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use storefront::application::Storefront;
use storefront::config::Config;
use storefront::domain::ports::Stores;
use storefront::infrastructure::in_memory::InMemoryStore;
use storefront::interfaces::csv::batch::BatchRunner;
use storefront::interfaces::csv::catalog_reader::CatalogReader;
use storefront::interfaces::csv::command_reader::CommandReader;
use storefront::interfaces::csv::report_writer::ReportWriter;
use storefront::telemetry;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Report {
    Stock,
    Orders,
    All,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    commands: PathBuf,

    /// Catalog CSV file loaded before any command runs
    #[arg(long)]
    catalog: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `checkout.max_attempts`
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Which report to print on stdout
    #[arg(long, value_enum, default_value_t = Report::All)]
    report: Report,
}

fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = storefront::infrastructure::rocksdb::RocksDBStore::open(path)
                .into_diagnostic()?;
            Ok(Stores::from_backend(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(path) => {
            tracing::warn!(
                path = %path.display(),
                "RocksDB support is not compiled in. Falling back to in-memory storage."
            );
            Ok(Stores::from_backend(InMemoryStore::new()))
        }
        None => Ok(Stores::from_backend(InMemoryStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_level);

    let mut config = match &cli.config {
        Some(path) => Config::load(path).into_diagnostic()?,
        None => Config::default(),
    };
    if let Some(max_attempts) = cli.max_attempts {
        config.checkout.max_attempts = max_attempts;
    }

    let stores = open_stores(cli.db_path)?;
    let mut runner = BatchRunner::new(Storefront::new(stores, &config));

    // Load catalog
    let file = File::open(&cli.catalog).into_diagnostic()?;
    for row_result in CatalogReader::new(file).rows() {
        match row_result {
            Ok(row) => {
                let sku = row.sku;
                if let Err(e) = runner.load_catalog_row(row).await {
                    tracing::warn!(sku, error = %e, "Error loading catalog row");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error reading catalog row");
            }
        }
    }

    // Process commands
    let file = File::open(&cli.commands).into_diagnostic()?;
    for command_result in CommandReader::new(file).commands() {
        match command_result {
            Ok(command) => {
                if let Err(e) = runner.apply(command).await {
                    tracing::warn!(?command, error = %e, "Error processing command");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error reading command");
            }
        }
    }

    // Output final state
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if matches!(cli.report, Report::Stock | Report::All) {
        let rows = runner.stock_report().await.into_diagnostic()?;
        ReportWriter::new(&mut out)
            .write_rows(rows)
            .into_diagnostic()?;
    }
    if cli.report == Report::All {
        writeln!(out).into_diagnostic()?;
    }
    if matches!(cli.report, Report::Orders | Report::All) {
        let rows = runner.order_report().await.into_diagnostic()?;
        ReportWriter::new(&mut out)
            .write_rows(rows)
            .into_diagnostic()?;
    }

    Ok(())
}
