//! [`StorageQuery`] over the recorded `stock_<instrument>_raw` tables.
//!
//! Each table has the shape `(id BIGSERIAL, datetime TIMESTAMPTZ, data)`.
//! `id` is the ingestion sequence; `data` is returned as text whatever its
//! column type, so JSONB payloads reach the wire unchanged.
//!
//! Table names are interpolated into the SQL. That is safe because
//! [`Instrument`] only admits `[a-z0-9_]`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tickreplay_core::storage::{DEFAULT_MAX_WINDOW_RECORDS, StorageError, StorageQuery, window_end};
use tickreplay_types::{Instrument, TickRecord};

/// `PostgreSQL` SQLSTATE for "relation does not exist".
const UNDEFINED_TABLE: &str = "42P01";

/// One row of a tick table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TickRow {
    /// Ingestion sequence number.
    pub id: i64,
    /// Recorded instant.
    pub datetime: DateTime<Utc>,
    /// Raw payload text.
    pub data: String,
}

impl From<TickRow> for TickRecord {
    fn from(row: TickRow) -> Self {
        Self::new(row.id, row.datetime, row.data)
    }
}

/// Read-only access to the tick log.
#[derive(Debug, Clone)]
pub struct TickStore {
    pool: PgPool,
    max_window_records: i64,
}

impl TickStore {
    /// Create a store over `pool` with the default window cap.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            max_window_records: i64::try_from(DEFAULT_MAX_WINDOW_RECORDS).unwrap_or(i64::MAX),
        }
    }

    /// Set the cap on records returned by one window query.
    #[must_use]
    pub fn with_max_window_records(mut self, max: u32) -> Self {
        self.max_window_records = i64::from(max);
        self
    }
}

/// Classify a driver error: a missing table means the instrument was
/// never recorded, everything else is treated as transient.
fn classify(err: &sqlx::Error, instrument: &Instrument, from: DateTime<Utc>) -> StorageError {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNDEFINED_TABLE) => {
            StorageError::NotFound {
                instrument: instrument.clone(),
                from,
            }
        }
        _ => StorageError::Unavailable(err.to_string()),
    }
}

impl StorageQuery for TickStore {
    async fn first_timestamp_at_or_after(
        &self,
        instrument: &Instrument,
        from: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, StorageError> {
        let sql = format!(
            "SELECT datetime FROM {} WHERE datetime >= $1 ORDER BY id ASC LIMIT 1",
            instrument.table_name()
        );
        let found: Option<DateTime<Utc>> = sqlx::query_scalar(&sql)
            .bind(from)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(&e, instrument, from))?;

        tracing::debug!(%instrument, %from, found = ?found, "Resolved first timestamp");

        found.ok_or_else(|| StorageError::NotFound {
            instrument: instrument.clone(),
            from,
        })
    }

    async fn records_in_window(
        &self,
        instrument: &Instrument,
        from: DateTime<Utc>,
        duration_seconds: u32,
    ) -> Result<Vec<TickRecord>, StorageError> {
        let until = window_end(from, duration_seconds)?;
        let sql = format!(
            "SELECT id, datetime, data::TEXT AS data FROM {} \
             WHERE datetime >= $1 AND datetime < $2 \
             ORDER BY id ASC LIMIT $3",
            instrument.table_name()
        );
        let rows = sqlx::query_as::<_, TickRow>(&sql)
            .bind(from)
            .bind(until)
            .bind(self.max_window_records)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        tracing::debug!(
            %instrument,
            %from,
            %until,
            rows = rows.len(),
            "Fetched tick window"
        );

        Ok(rows.into_iter().map(TickRecord::from).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgresql://postgres@localhost:5432/postgres")
            .unwrap()
    }

    #[test]
    fn row_converts_into_record() {
        let at = Utc.with_ymd_and_hms(2022, 6, 21, 9, 0, 2).unwrap();
        let record = TickRecord::from(TickRow {
            id: 7,
            datetime: at,
            data: r#"{"CurrentPrice":54850}"#.to_owned(),
        });
        assert_eq!(record.sequence_id, 7);
        assert_eq!(record.timestamp, at);
        assert_eq!(record.payload, r#"{"CurrentPrice":54850}"#);
    }

    #[tokio::test]
    async fn window_cap_defaults_and_overrides() {
        let store = TickStore::new(lazy_pool());
        assert_eq!(
            store.max_window_records,
            i64::try_from(DEFAULT_MAX_WINDOW_RECORDS).unwrap()
        );
        assert_eq!(store.with_max_window_records(250).max_window_records, 250);
    }

    #[test]
    fn non_database_errors_are_unavailable() {
        let instrument = Instrument::new("7974").unwrap();
        let from = Utc.with_ymd_and_hms(2022, 6, 21, 9, 0, 0).unwrap();
        let err = classify(&sqlx::Error::PoolTimedOut, &instrument, from);
        assert!(matches!(err, StorageError::Unavailable(_)));
    }
}
