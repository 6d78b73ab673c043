pub mod filter;
pub mod inference;
pub mod mapping;
pub mod validate;

pub use filter::DetectionFilter;
pub use inference::{InferenceMode, InferenceProvider, ModelProvider, SimulatedProvider, select_provider};
pub use mapping::{CategoryMapper, LabelRule, Resolution};
pub use validate::{ImageValidator, open_image};
