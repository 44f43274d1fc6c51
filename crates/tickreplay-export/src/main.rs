//! Daily CSV export for the tick replay service.
//!
//! Dumps every record one instrument recorded on a UTC calendar day into
//! `export_<date>.csv` and a gzip-compressed `export_<date>.csv.gz`. The
//! database and default instrument come from the same configuration the
//! replay server uses.
//!
//! # Output format
//!
//! The CSV starts with an `id,datetime,data` header row, and datetimes are
//! RFC 3339 UTC with millisecond precision. The compressed copy is a gzip
//! stream at level 9, not a `.zip` archive. Earlier exporters wrote a
//! headerless CSV and `export_<date>.csv.zip`, so consumers of those files
//! need to skip the header and decompress with `gunzip`.
//!
//! Exported rows are left in the tick log.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::Parser;
use tickreplay_core::config::{ConfigError, ServiceConfig};
use tickreplay_db::{DbError, PostgresConfig, PostgresPool, export};
use tickreplay_types::{Instrument, InstrumentError};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Config file used when `TICKREPLAY_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "tickreplay-config.yaml";

/// Errors that abort an export.
#[derive(Debug, thiserror::Error)]
enum ExportError {
    /// Configuration loading failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The instrument argument is not a valid identifier.
    #[error("invalid instrument: {0}")]
    Instrument(#[from] InstrumentError),

    /// Querying or writing failed.
    #[error("export failed: {0}")]
    Db(#[from] DbError),
}

/// Export one day of recorded ticks to CSV.
#[derive(Debug, Parser)]
#[clap(name = "tickreplay-export")]
struct Args {
    /// Day to export, `YYYY-MM-DD` (UTC). Defaults to today.
    #[clap(long)]
    date: Option<NaiveDate>,

    /// Instrument to export. Defaults to the configured replay instrument.
    #[clap(long)]
    instrument: Option<String>,

    /// Directory the files are written to.
    #[clap(long, default_value = ".")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    run(args).await?;
    Ok(())
}

async fn run(args: Args) -> Result<(), ExportError> {
    let config_path = std::env::var_os("TICKREPLAY_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = ServiceConfig::load_or_default(&config_path)?;

    let instrument = match &args.instrument {
        Some(raw) => Instrument::new(raw)?,
        None => config.replay.instrument()?,
    };
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    info!(%instrument, %date, out_dir = %args.out_dir.display(), "Export start");

    let pg = PostgresPool::connect(&PostgresConfig::from_infrastructure(&config.infrastructure)).await?;
    let result = export::export_day(pg.pool(), &instrument, date, &args.out_dir).await;
    pg.close().await;
    let summary = result?;

    info!(
        records = summary.records,
        csv = %summary.csv_path.display(),
        gzip = %summary.gzip_path.display(),
        "Export done"
    );
    Ok(())
}
