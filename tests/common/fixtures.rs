use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageBuffer, Rgb};
use seatrash::{DetectionDb, InferenceMode, InferenceProvider, NewRecord, RawDetection};
use tempfile::NamedTempFile;

/// Creates a 100x100 blue test image and returns the temp file.
/// The file will be automatically cleaned up when dropped.
pub fn create_test_image() -> NamedTempFile {
    create_test_image_with_suffix(".png")
}

pub fn create_test_image_with_suffix(suffix: &str) -> NamedTempFile {
    let img = ImageBuffer::from_fn(100, 100, |_, _| Rgb([20u8, 60u8, 200u8]));
    let file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Creates a DetectionDb in a temporary directory.
/// Returns both the store and the temp directory (which must be kept alive).
pub async fn create_test_db() -> (DetectionDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("detections.db");
    let db = DetectionDb::open(&path)
        .await
        .expect("Failed to create test database");
    (db, dir)
}

pub fn make_record(label: &str, confidence: f64) -> NewRecord {
    NewRecord::new("ocean_trash_001.jpg", label, confidence)
}

/// Provider returning a fixed detection list, or failing.
pub struct FixedProvider {
    pub detections: Vec<RawDetection>,
    pub fail: bool,
}

impl FixedProvider {
    pub fn returning(detections: &[(&str, f32)]) -> Arc<Self> {
        Arc::new(Self {
            detections: detections
                .iter()
                .map(|(label, confidence)| RawDetection::new(*label, *confidence))
                .collect(),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            detections: Vec::new(),
            fail: true,
        })
    }
}

impl InferenceProvider for FixedProvider {
    fn detect(&self, _image_path: &Path) -> anyhow::Result<Vec<RawDetection>> {
        if self.fail {
            anyhow::bail!("detector crashed");
        }
        Ok(self.detections.clone())
    }

    fn mode(&self) -> InferenceMode {
        InferenceMode::Model
    }
}

pub fn missing_model_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("weights.rten")
}
