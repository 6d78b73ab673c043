use std::path::PathBuf;

use thiserror::Error;

/// Why an image was rejected before inference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("image file not found: {0}")]
    Missing(PathBuf),
    #[error("unsupported image extension: {0}")]
    UnsupportedExtension(PathBuf),
    #[error("image could not be decoded: {0}")]
    Undecodable(PathBuf),
}

/// Failure of a detection request. A request that fails persists nothing.
///
/// An empty detection list is a successful outcome and never maps to one of these.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid image: {0}")]
    Validation(#[from] ValidationFailure),
    #[error("inference failed: {0:#}")]
    Inference(#[source] anyhow::Error),
    #[error("failed to persist detections: {0:#}")]
    Persistence(#[source] anyhow::Error),
}
