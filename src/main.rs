use car_rental::config::AppConfig;
use car_rental::domain::ports::SharedRepository;
use car_rental::infrastructure::in_memory::InMemoryRepository;
use car_rental::interfaces::console::Console;
use car_rental::interfaces::csv::ledger_writer::LedgerWriter;
use car_rental::interfaces::csv::request_reader::RequestReader;
use car_rental::interfaces::fixtures::Fixtures;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input requests CSV file
    input: PathBuf,

    /// JSON file with the users and products to start from
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(flatten)]
    config: AppConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let repository = open_repository(cli.db_path.as_deref())?;
    let console = Console::wire(repository, &cli.config.auth(), &cli.config.mail_from);

    if let Some(path) = cli.fixtures {
        let fixtures = Fixtures::load(path).into_diagnostic()?;
        console.seed(fixtures).await.into_diagnostic()?;
    }

    let file = File::open(cli.input).into_diagnostic()?;
    console.replay(RequestReader::new(file)).await;

    let ledger = console.ledger().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = LedgerWriter::new(stdout.lock());
    writer
        .write_ledger(ledger.iter().map(|(user, rentals)| (user, *rentals)))
        .into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_repository(db_path: Option<&Path>) -> Result<SharedRepository> {
    use car_rental::infrastructure::rocksdb::RocksDbRepository;

    Ok(match db_path {
        Some(path) => Arc::new(RocksDbRepository::open(path).into_diagnostic()?),
        None => Arc::new(InMemoryRepository::new()),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_repository(db_path: Option<&Path>) -> Result<SharedRepository> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Arc::new(InMemoryRepository::new()))
}
