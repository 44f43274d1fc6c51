//! Daily CSV export of one instrument's tick log.
//!
//! Produces `export_<date>.csv` holding every record recorded on the given
//! UTC calendar day, ordered by sequence id, plus a gzip-compressed copy
//! `export_<date>.csv.gz` next to it. The CSV carries an `id,datetime,data`
//! header row; the compressed copy is gzip, not a `.zip` archive.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeDelta, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use sqlx::PgPool;
use tickreplay_types::{Instrument, TickRecord};

use crate::error::DbError;
use crate::tick_store::TickRow;

/// Result of one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Number of records written.
    pub records: usize,
    /// Path of the plain CSV file.
    pub csv_path: PathBuf,
    /// Path of the gzip-compressed copy.
    pub gzip_path: PathBuf,
}

/// One CSV line.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: i64,
    datetime: String,
    data: &'a str,
}

/// Name of the CSV file for `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("export_{date}.csv")
}

/// Half-open UTC bounds `[date 00:00, date+1 00:00)`.
///
/// # Errors
///
/// Returns [`DbError::Config`] if the day is not representable.
pub fn day_bounds(date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), DbError> {
    let start = date
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DbError::Config(format!("invalid export date {date}")))?;
    let end = start
        .checked_add_signed(TimeDelta::days(1))
        .ok_or_else(|| DbError::Config(format!("export date {date} out of range")))?;
    Ok((start, end))
}

/// Read every record of `instrument` recorded on `date`.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the query fails.
pub async fn records_on_date(
    pool: &PgPool,
    instrument: &Instrument,
    date: NaiveDate,
) -> Result<Vec<TickRecord>, DbError> {
    let (start, end) = day_bounds(date)?;
    let sql = format!(
        "SELECT id, datetime, data::TEXT AS data FROM {} \
         WHERE datetime >= $1 AND datetime < $2 \
         ORDER BY id ASC",
        instrument.table_name()
    );
    let rows = sqlx::query_as::<_, TickRow>(&sql)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(TickRecord::from).collect())
}

/// Write `records` as CSV with an `id,datetime,data` header.
///
/// Returns the number of data rows written.
///
/// # Errors
///
/// Returns [`DbError::Csv`] if a row cannot be written.
pub fn write_csv<W: Write>(writer: W, records: &[TickRecord]) -> Result<usize, DbError> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(CsvRow {
            id: record.sequence_id,
            datetime: record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            data: &record.payload,
        })?;
    }
    csv.flush()?;
    Ok(records.len())
}

/// Compress `path` to `<path>.gz` at the best compression level.
///
/// # Errors
///
/// Returns [`DbError::Io`] if reading or writing fails.
pub fn gzip_file(path: &Path) -> Result<PathBuf, DbError> {
    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);

    let mut input = BufReader::new(File::open(path)?);
    let output = BufWriter::new(File::create(&gz_path)?);
    let mut encoder = GzEncoder::new(output, Compression::best());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(gz_path)
}

/// Export `instrument`'s records for `date` into `dir`.
///
/// # Errors
///
/// Returns [`DbError`] if the query, the CSV write, or compression fails.
pub async fn export_day(
    pool: &PgPool,
    instrument: &Instrument,
    date: NaiveDate,
    dir: &Path,
) -> Result<ExportSummary, DbError> {
    let records = records_on_date(pool, instrument, date).await?;
    tracing::info!(%instrument, %date, records = records.len(), "Fetched records for export");

    let csv_path = dir.join(export_file_name(date));
    let written = write_csv(BufWriter::new(File::create(&csv_path)?), &records)?;
    let gzip_path = gzip_file(&csv_path)?;

    tracing::info!(
        csv = %csv_path.display(),
        gzip = %gzip_path.display(),
        records = written,
        "Export written"
    );

    Ok(ExportSummary {
        records: written,
        csv_path,
        gzip_path,
    })
}
