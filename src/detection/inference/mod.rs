mod cache;
mod model;
mod simulated;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::DetectorConfig;
use crate::models::RawDetection;

pub use cache::ModelCache;
pub use model::{COCO_CLASS_NAMES, ModelProvider, YoloModel, decode_output, iou, letterbox};
pub use simulated::{SIMULATED_CATEGORIES, SimulatedProvider};

/// Which provider produced a set of detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    Model,
    Simulated,
}

impl std::fmt::Display for InferenceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceMode::Model => f.write_str("model"),
            InferenceMode::Simulated => f.write_str("simulated"),
        }
    }
}

/// Produces raw detections for an image.
///
/// Implementations return detections ordered by descending confidence, ties
/// in emission order, and apply no domain filtering. Errors are inference
/// failures; an empty vector means nothing was found.
pub trait InferenceProvider: Send + Sync {
    fn detect(&self, image_path: &Path) -> anyhow::Result<Vec<RawDetection>>;

    fn mode(&self) -> InferenceMode;
}

/// Pick the provider by probing for the model artifact.
///
/// The probe happens once here; the returned provider never switches mode.
pub fn select_provider(config: &DetectorConfig) -> Arc<dyn InferenceProvider> {
    if config.model_path.is_file() {
        log::info!("Using model at {:?}", config.model_path);
        Arc::new(ModelProvider::new(&config.model_path, config.model.clone()))
    } else {
        log::warn!(
            "Model file not found at {:?}, using simulated detections",
            config.model_path
        );
        Arc::new(SimulatedProvider::new())
    }
}
