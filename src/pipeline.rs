use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::{
    DetectorConfig, FALLBACK_FILENAME, MAX_FILENAME_LEN, MAX_HISTORY_LIMIT, MAX_RECENT_LIMIT,
    round_confidence,
};
use crate::core::db::{
    DetectionDb, DetectionRecord, NewRecord, RecordRepository, StatsAggregator, StatsSnapshot,
};
use crate::detection::filter::DetectionFilter;
use crate::detection::inference::{InferenceMode, InferenceProvider, select_provider};
use crate::detection::mapping::display_name;
use crate::detection::validate::ImageValidator;
use crate::error::DetectError;
use crate::models::{FinalDetection, TrashCategory};

/// Outcome of one successful detection request.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub filename: String,
    pub mode: InferenceMode,
    pub detections: Vec<FinalDetection>,
    /// One stored record per detection, in the same order.
    pub records: Vec<DetectionRecord>,
    #[serde(serialize_with = "serialize_seconds")]
    pub processing_time: Duration,
}

fn serialize_seconds<S: serde::Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((value.as_secs_f64() * 1000.0).round() / 1000.0)
}

/// Validation, inference, filtering and persistence for uploaded images,
/// plus the read side (history and statistics) over the same store.
pub struct TrashDetector<R = DetectionDb> {
    validator: ImageValidator,
    provider: Arc<dyn InferenceProvider>,
    filter: DetectionFilter,
    store: R,
}

impl TrashDetector<DetectionDb> {
    /// Open the configured database and pick the inference provider.
    pub async fn from_config(config: &DetectorConfig) -> anyhow::Result<Self> {
        let store = DetectionDb::open(&config.database_path).await?;
        Ok(Self::new(store, select_provider(config)))
    }
}

impl<R: RecordRepository> TrashDetector<R> {
    pub fn new(store: R, provider: Arc<dyn InferenceProvider>) -> Self {
        Self {
            validator: ImageValidator,
            provider,
            filter: DetectionFilter::new(),
            store,
        }
    }

    pub fn mode(&self) -> InferenceMode {
        self.provider.mode()
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    /// Run the whole pipeline on one image file.
    ///
    /// `filename` is the name recorded on the stored records; it defaults to
    /// the file name of `image_path`. Records are written only after the full
    /// detection list is known, in one transaction, so a failed request
    /// leaves the store untouched.
    pub async fn detect_file(
        &self,
        image_path: &Path,
        filename: Option<&str>,
    ) -> Result<DetectionReport, DetectError> {
        let started = Instant::now();
        self.validator.check(image_path)?;

        let provider = self.provider.clone();
        let owned_path: PathBuf = image_path.to_path_buf();
        let raw = tokio::task::spawn_blocking(move || provider.detect(&owned_path))
            .await
            .map_err(|e| DetectError::Inference(anyhow::anyhow!("inference task failed: {}", e)))?
            .map_err(DetectError::Inference)?;

        let detections = self.filter.filter(&raw);
        log::debug!(
            "{:?}: {} raw detections, {} kept ({} mode)",
            image_path,
            raw.len(),
            detections.len(),
            self.mode()
        );

        let filename = record_filename(
            filename.or_else(|| image_path.file_name().and_then(|name| name.to_str())),
        );
        let new_records: Vec<NewRecord> = detections
            .iter()
            .map(|d| {
                NewRecord::new(
                    filename.clone(),
                    d.category.display_name(),
                    round_confidence(f64::from(d.confidence)),
                )
            })
            .collect();
        let records = self
            .store
            .append_batch(&new_records)
            .await
            .map_err(DetectError::Persistence)?;

        Ok(DetectionReport {
            filename,
            mode: self.mode(),
            detections,
            records,
            processing_time: started.elapsed(),
        })
    }

    /// Stored records, newest first. `label` may be a stored label or a
    /// category key such as `plastic_bottle`.
    pub async fn history(
        &self,
        offset: u32,
        limit: u32,
        label: Option<&str>,
    ) -> Result<Vec<DetectionRecord>, DetectError> {
        let label = label.map(display_name);
        self.store
            .query(offset, limit.clamp(1, MAX_HISTORY_LIMIT), label)
            .await
            .map_err(DetectError::Persistence)
    }

    pub async fn count(&self, label: Option<&str>) -> Result<u64, DetectError> {
        self.store
            .count(label.map(display_name))
            .await
            .map_err(DetectError::Persistence)
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<DetectionRecord>, DetectError> {
        self.store
            .recent(limit.clamp(1, MAX_RECENT_LIMIT))
            .await
            .map_err(DetectError::Persistence)
    }

    pub async fn stats(&self) -> Result<StatsSnapshot, DetectError> {
        StatsAggregator::new(&self.store)
            .snapshot()
            .await
            .map_err(DetectError::Persistence)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, DetectError> {
        let deleted = self.store.delete(id).await.map_err(DetectError::Persistence)?;
        if deleted {
            log::info!("Deleted detection record {}", id);
        }
        Ok(deleted)
    }
}

/// Name stored on records: never empty, at most [`MAX_FILENAME_LEN`] characters.
pub fn record_filename(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.chars().take(MAX_FILENAME_LEN).collect(),
        None => FALLBACK_FILENAME.to_string(),
    }
}

/// Category keys with their stored labels, for listing.
pub fn category_table() -> Vec<(&'static str, &'static str)> {
    TrashCategory::ALL
        .into_iter()
        .map(|category| (category.key(), category.display_name()))
        .collect()
}
