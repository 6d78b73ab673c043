mod record;
mod state;
mod stats;

use std::{collections::BTreeMap, path::Path, sync::Arc};

use anyhow::Context;
use sqlx::Connection;
use state::StoreState;
use time::OffsetDateTime;

pub use record::{DetectionRecord, NewRecord, RecordRepository, StoreSummary};
pub use stats::{StatsAggregator, StatsSnapshot};

use record::{RecordRow, format_timestamp};

const SELECT_RECORD: &str =
    "SELECT id, filename, label, confidence, timestamp FROM detection_record";

/// SQLite-backed detection record store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct DetectionDb {
    state: Arc<StoreState>,
}

impl DetectionDb {
    /// Open (creating if needed) the database file and apply migrations.
    pub async fn open<P: AsRef<Path>>(database_file: P) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::new(database_file).await?),
        })
    }

    pub fn database_file(&self) -> &Path {
        self.state.database_file()
    }

    /// Flush and close the underlying pool. Must be called before shutdown in
    /// async contexts; the store is unusable afterwards.
    pub async fn close(&self) -> anyhow::Result<()> {
        self.state.close().await
    }
}

fn to_records(rows: Vec<RecordRow>) -> anyhow::Result<Vec<DetectionRecord>> {
    rows.into_iter().map(DetectionRecord::try_from).collect()
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

async fn insert_record(
    conn: &mut sqlx::SqliteConnection,
    record: &NewRecord,
    timestamp: &str,
) -> anyhow::Result<DetectionRecord> {
    record.check()?;
    let row = sqlx::query_as::<_, RecordRow>(
        r#"INSERT INTO detection_record (filename, label, confidence, timestamp)
        VALUES ($1, $2, $3, $4)
        RETURNING id, filename, label, confidence, timestamp"#,
    )
    .bind(&record.filename)
    .bind(&record.label)
    .bind(record.confidence)
    .bind(timestamp)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert detection record for {:?}", record.filename))?;
    DetectionRecord::try_from(row)
}

impl RecordRepository for DetectionDb {
    async fn append(&self, record: &NewRecord) -> anyhow::Result<DetectionRecord> {
        let _writer = self.state.writer().await;
        let mut conn = self.state.conn().await?;
        let mut tx = conn.begin().await?;
        let timestamp = format_timestamp(OffsetDateTime::now_utc())?;
        let stored = insert_record(&mut tx, record, &timestamp).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn append_batch(&self, records: &[NewRecord]) -> anyhow::Result<Vec<DetectionRecord>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let _writer = self.state.writer().await;
        let mut conn = self.state.conn().await?;
        let mut tx = conn.begin().await?;
        let timestamp = format_timestamp(OffsetDateTime::now_utc())?;
        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            // an early return drops `tx`, rolling back everything inserted so far
            stored.push(insert_record(&mut tx, record, &timestamp).await?);
        }
        tx.commit().await?;
        Ok(stored)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<DetectionRecord>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, RecordRow>(&format!("{SELECT_RECORD} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut **conn)
            .await?
            .map(DetectionRecord::try_from)
            .transpose()
    }

    async fn query(
        &self,
        offset: u32,
        limit: u32,
        label: Option<&str>,
    ) -> anyhow::Result<Vec<DetectionRecord>> {
        let mut conn = self.state.conn().await?;
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "{SELECT_RECORD}
            WHERE ($1 IS NULL OR label = $1)
            ORDER BY timestamp DESC, id DESC
            LIMIT $2 OFFSET $3"
        ))
        .bind(label)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&mut **conn)
        .await?;
        to_records(rows)
    }

    async fn count(&self, label: Option<&str>) -> anyhow::Result<u64> {
        let mut conn = self.state.conn().await?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM detection_record WHERE ($1 IS NULL OR label = $1)",
        )
        .bind(label)
        .fetch_one(&mut **conn)
        .await?;
        Ok(to_count(count))
    }

    async fn count_since(&self, since: OffsetDateTime) -> anyhow::Result<u64> {
        let mut conn = self.state.conn().await?;
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM detection_record WHERE timestamp >= $1")
                .bind(format_timestamp(since)?)
                .fetch_one(&mut **conn)
                .await?;
        Ok(to_count(count))
    }

    async fn recent(&self, limit: u32) -> anyhow::Result<Vec<DetectionRecord>> {
        self.query(0, limit, None).await
    }

    async fn range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> anyhow::Result<Vec<DetectionRecord>> {
        let mut conn = self.state.conn().await?;
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "{SELECT_RECORD}
            WHERE timestamp >= $1 AND timestamp <= $2
            ORDER BY timestamp DESC, id DESC"
        ))
        .bind(format_timestamp(start)?)
        .bind(format_timestamp(end)?)
        .fetch_all(&mut **conn)
        .await?;
        to_records(rows)
    }

    async fn category_counts(&self) -> anyhow::Result<BTreeMap<String, u64>> {
        let mut conn = self.state.conn().await?;
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT label, COUNT(*) FROM detection_record GROUP BY label")
                .fetch_all(&mut **conn)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(label, count)| (label, to_count(count)))
            .collect())
    }

    async fn average_confidence(&self) -> anyhow::Result<Option<f64>> {
        let mut conn = self.state.conn().await?;
        let avg: Option<f64> = sqlx::query_scalar("SELECT AVG(confidence) FROM detection_record")
            .fetch_one(&mut **conn)
            .await?;
        Ok(avg)
    }

    async fn summarize(&self, since: OffsetDateTime) -> anyhow::Result<StoreSummary> {
        let since = format_timestamp(since)?;
        let mut conn = self.state.conn().await?;
        // one read transaction so every figure sees the same store state
        let mut tx = conn.begin().await?;

        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT label, COUNT(*) FROM detection_record GROUP BY label")
                .fetch_all(&mut *tx)
                .await?;
        let (total, average, recent): (i64, Option<f64>, i64) = sqlx::query_as(
            r#"SELECT
                COUNT(*),
                AVG(confidence),
                COALESCE(SUM(CASE WHEN timestamp >= $1 THEN 1 ELSE 0 END), 0)
            FROM detection_record"#,
        )
        .bind(since)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(StoreSummary {
            total: to_count(total),
            category_counts: rows
                .into_iter()
                .map(|(label, count)| (label, to_count(count)))
                .collect(),
            average_confidence: average,
            count_since: to_count(recent),
        })
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let _writer = self.state.writer().await;
        let mut conn = self.state.conn().await?;
        let result = sqlx::query("DELETE FROM detection_record WHERE id = $1")
            .bind(id)
            .execute(&mut **conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
