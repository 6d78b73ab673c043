use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Detections at or below this confidence are dropped.
pub const CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Confidence range of fabricated detections in simulated mode.
pub const SIMULATED_CONFIDENCE_RANGE: RangeInclusive<f32> = 0.4..=0.95;

/// Number of fabricated detections per image in simulated mode.
pub const SIMULATED_COUNT_RANGE: RangeInclusive<usize> = 1..=3;

/// Trailing window used for the `recent_count` statistic.
pub const RECENCY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Image extensions accepted by the validator (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "tiff"];

pub const DEFAULT_MODEL_PATH: &str = "weights.rten";
pub const DEFAULT_DATABASE_PATH: &str = "ocean_trash_detection.db";

pub const MAX_FILENAME_LEN: usize = 255;
pub const MAX_LABEL_LEN: usize = 100;
pub const FALLBACK_FILENAME: &str = "unknown.jpg";

pub const DEFAULT_HISTORY_LIMIT: u32 = 100;
pub const MAX_HISTORY_LIMIT: u32 = 1000;
pub const DEFAULT_RECENT_LIMIT: u32 = 10;
pub const MAX_RECENT_LIMIT: u32 = 50;

/// Decimal places kept on persisted confidences and on the average confidence.
pub const CONFIDENCE_DECIMALS: i32 = 3;

/// Box decoding parameters of the YOLO detector.
///
/// These belong to the detector itself and are applied before any domain
/// filtering; `box_threshold` is intentionally below [`CONFIDENCE_THRESHOLD`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,
    pub box_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            box_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Location of the trained model. Its presence selects real inference.
    pub model_path: PathBuf,
    pub database_path: PathBuf,
    pub model: YoloParams,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            model: YoloParams::default(),
        }
    }
}

/// Round to [`CONFIDENCE_DECIMALS`] places.
pub fn round_confidence(value: f64) -> f64 {
    let factor = 10f64.powi(CONFIDENCE_DECIMALS);
    (value * factor).round() / factor
}
