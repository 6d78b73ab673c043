use std::collections::BTreeMap;

use serde::Serialize;
use time::{OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::config::{MAX_FILENAME_LEN, MAX_LABEL_LEN};

/// Storage format of record timestamps: UTC with nanoseconds, fixed width.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub id: i64,
    pub filename: String,
    pub label: String,
    pub confidence: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub filename: String,
    pub label: String,
    pub confidence: f64,
}

impl NewRecord {
    pub fn new(filename: impl Into<String>, label: impl Into<String>, confidence: f64) -> Self {
        Self {
            filename: filename.into(),
            label: label.into(),
            confidence,
        }
    }

    pub(super) fn check(&self) -> anyhow::Result<()> {
        if self.filename.chars().count() > MAX_FILENAME_LEN {
            anyhow::bail!("filename longer than {} characters", MAX_FILENAME_LEN);
        }
        if self.label.chars().count() > MAX_LABEL_LEN {
            anyhow::bail!("label longer than {} characters", MAX_LABEL_LEN);
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            anyhow::bail!("confidence {} outside [0, 1]", self.confidence);
        }
        Ok(())
    }
}

/// Aggregates read in one consistent snapshot of the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreSummary {
    pub total: u64,
    pub category_counts: BTreeMap<String, u64>,
    pub average_confidence: Option<f64>,
    pub count_since: u64,
}

/// Append-mostly store of accepted detections.
///
/// Listings are ordered newest first; records sharing a timestamp are
/// ordered by descending id.
pub trait RecordRepository {
    fn append(&self, record: &NewRecord) -> impl Future<Output = anyhow::Result<DetectionRecord>>;
    /// All-or-nothing insert of several records.
    fn append_batch(
        &self,
        records: &[NewRecord],
    ) -> impl Future<Output = anyhow::Result<Vec<DetectionRecord>>>;
    fn get(&self, id: i64) -> impl Future<Output = anyhow::Result<Option<DetectionRecord>>>;
    fn query(
        &self,
        offset: u32,
        limit: u32,
        label: Option<&str>,
    ) -> impl Future<Output = anyhow::Result<Vec<DetectionRecord>>>;
    fn count(&self, label: Option<&str>) -> impl Future<Output = anyhow::Result<u64>>;
    fn count_since(&self, since: OffsetDateTime) -> impl Future<Output = anyhow::Result<u64>>;
    fn recent(&self, limit: u32) -> impl Future<Output = anyhow::Result<Vec<DetectionRecord>>>;
    /// Records with `start <= timestamp <= end`.
    fn range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> impl Future<Output = anyhow::Result<Vec<DetectionRecord>>>;
    fn category_counts(&self) -> impl Future<Output = anyhow::Result<BTreeMap<String, u64>>>;
    fn average_confidence(&self) -> impl Future<Output = anyhow::Result<Option<f64>>>;
    fn summarize(&self, since: OffsetDateTime) -> impl Future<Output = anyhow::Result<StoreSummary>>;
    /// Returns `false` when no record has this id.
    fn delete(&self, id: i64) -> impl Future<Output = anyhow::Result<bool>>;
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct RecordRow {
    pub id: i64,
    pub filename: String,
    pub label: String,
    pub confidence: f64,
    pub timestamp: String,
}

impl TryFrom<RecordRow> for DetectionRecord {
    type Error = anyhow::Error;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(DetectionRecord {
            id: row.id,
            filename: row.filename,
            label: row.label,
            confidence: row.confidence,
            timestamp: parse_timestamp(&row.timestamp)?,
        })
    }
}

pub(super) fn format_timestamp(timestamp: OffsetDateTime) -> anyhow::Result<String> {
    let utc = timestamp.to_offset(time::UtcOffset::UTC);
    Ok(utc.format(TIMESTAMP_FORMAT)?)
}

pub(super) fn parse_timestamp(value: &str) -> anyhow::Result<OffsetDateTime> {
    let parsed = PrimitiveDateTime::parse(value, TIMESTAMP_FORMAT)
        .map_err(|e| anyhow::anyhow!("Invalid record timestamp {:?}: {}", value, e))?;
    Ok(parsed.assume_utc())
}
