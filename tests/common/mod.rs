mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from seatrash for tests
pub use seatrash::{
    DetectError, DetectionDb, DetectionRecord, DetectorConfig, InferenceMode, NewRecord,
    RecordRepository, StatsAggregator, StatsSnapshot, TrashDetector, ValidationFailure,
};
