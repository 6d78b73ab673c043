use std::path::Path;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{InferenceMode, InferenceProvider};
use crate::config::{SIMULATED_CONFIDENCE_RANGE, SIMULATED_COUNT_RANGE};
use crate::detection::filter::sort_by_confidence;
use crate::models::{RawDetection, TrashCategory};

pub const SIMULATED_CATEGORIES: [TrashCategory; 4] = [
    TrashCategory::PlasticBottle,
    TrashCategory::PlasticBag,
    TrashCategory::Can,
    TrashCategory::Paper,
];

/// Fabricates plausible detections when no model is available.
///
/// The image content is ignored. Labels are category keys, which the
/// category mapper passes through unchanged, and every confidence lies above
/// the domain cutoff so simulated output is never filtered away.
#[derive(Debug)]
pub struct SimulatedProvider {
    rng: Mutex<StdRng>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceProvider for SimulatedProvider {
    fn detect(&self, image_path: &Path) -> anyhow::Result<Vec<RawDetection>> {
        if !image_path.is_file() {
            anyhow::bail!("image file not found: {:?}", image_path);
        }
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| anyhow::anyhow!("simulated provider rng poisoned"))?;

        let count = rng.gen_range(SIMULATED_COUNT_RANGE);
        let mut detections: Vec<RawDetection> = (0..count)
            .map(|_| {
                let category = SIMULATED_CATEGORIES[rng.gen_range(0..SIMULATED_CATEGORIES.len())];
                let confidence = rng.gen_range(SIMULATED_CONFIDENCE_RANGE);
                RawDetection::new(category.key(), confidence)
            })
            .collect();
        sort_by_confidence(&mut detections, |d| d.confidence);

        log::debug!("simulated {} detections for {:?}", detections.len(), image_path);
        Ok(detections)
    }

    fn mode(&self) -> InferenceMode {
        InferenceMode::Simulated
    }
}
