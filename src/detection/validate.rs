use std::path::Path;

use anyhow::Context;
use image::{DynamicImage, ImageReader};

use crate::config::SUPPORTED_EXTENSIONS;
use crate::error::ValidationFailure;

/// Gatekeeper run before any inference.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageValidator;

impl ImageValidator {
    /// Returns `true` when the file exists, has a supported extension and decodes.
    /// Never panics and never returns an error.
    pub fn validate(&self, path: &Path) -> bool {
        self.check(path).is_ok()
    }

    /// Same checks as [`validate`](Self::validate), reporting the first failure.
    pub fn check(&self, path: &Path) -> Result<(), ValidationFailure> {
        if !path.is_file() {
            return Err(ValidationFailure::Missing(path.to_path_buf()));
        }
        if !has_supported_extension(path) {
            return Err(ValidationFailure::UnsupportedExtension(path.to_path_buf()));
        }
        match open_image(path) {
            Ok(_) => Ok(()),
            Err(e) => {
                log::debug!("decode of {:?} failed: {:#}", path, e);
                Err(ValidationFailure::Undecodable(path.to_path_buf()))
            }
        }
    }
}

/// Decode an image, sniffing the format from its content rather than its
/// extension. Used both for validation and for inference input.
pub fn open_image(path: &Path) -> anyhow::Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .with_context(|| format!("Failed to open image {:?}", path))?
        .with_guessed_format()
        .with_context(|| format!("Failed to read image {:?}", path))?;
    reader
        .decode()
        .with_context(|| format!("Failed to decode image {:?}", path))
}

pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
