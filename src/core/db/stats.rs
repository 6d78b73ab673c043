use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::config::{RECENCY_WINDOW, round_confidence};
use crate::core::db::record::RecordRepository;

/// Summary statistics over all stored records, derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_count: u64,
    pub category_counts: BTreeMap<String, u64>,
    /// Mean confidence rounded to three decimals, `0.0` for an empty store.
    pub avg_confidence: f64,
    /// Records within the trailing recency window.
    pub recent_count: u64,
}

/// Computes [`StatsSnapshot`]s from a record store. Nothing is cached.
#[derive(Debug)]
pub struct StatsAggregator<'a, R> {
    store: &'a R,
}

impl<'a, R: RecordRepository> StatsAggregator<'a, R> {
    pub fn new(store: &'a R) -> Self {
        Self { store }
    }

    pub async fn snapshot(&self) -> anyhow::Result<StatsSnapshot> {
        self.snapshot_at(OffsetDateTime::now_utc()).await
    }

    /// Snapshot with the recency window ending at `now`.
    pub async fn snapshot_at(&self, now: OffsetDateTime) -> anyhow::Result<StatsSnapshot> {
        let summary = self.store.summarize(now - RECENCY_WINDOW).await?;
        Ok(StatsSnapshot {
            total_count: summary.total,
            category_counts: summary.category_counts,
            avg_confidence: summary.average_confidence.map(round_confidence).unwrap_or(0.0),
            recent_count: summary.count_since,
        })
    }
}
