pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;

pub use config::DetectorConfig;
pub use core::db::{DetectionDb, DetectionRecord, NewRecord, RecordRepository, StatsAggregator, StatsSnapshot};
pub use detection::{
    CategoryMapper, DetectionFilter, ImageValidator, InferenceMode, InferenceProvider,
    ModelProvider, SimulatedProvider, select_provider,
};
pub use error::{DetectError, ValidationFailure};
pub use models::{FinalDetection, RawDetection, TrashCategory};
pub use pipeline::{DetectionReport, TrashDetector};
