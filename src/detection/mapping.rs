use crate::models::TrashCategory;

/// An entry of the label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRule {
    Mapped(TrashCategory),
    /// The label names something that is never trash; detections are dropped.
    Excluded,
}

/// Outcome of resolving a native label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Mapped(TrashCategory),
    Excluded,
    /// The label is not in the table and falls back to [`TrashCategory::OtherTrash`].
    DefaultOther,
}

impl Resolution {
    /// The category a detection ends up in, or `None` when it is dropped.
    pub fn category(self) -> Option<TrashCategory> {
        match self {
            Resolution::Mapped(category) => Some(category),
            Resolution::DefaultOther => Some(TrashCategory::OtherTrash),
            Resolution::Excluded => None,
        }
    }
}

use LabelRule::{Excluded, Mapped};

const LABEL_TABLE: &[(&str, LabelRule)] = &[
    ("bottle", Mapped(TrashCategory::PlasticBottle)),
    ("cup", Mapped(TrashCategory::PlasticBottle)),
    ("book", Mapped(TrashCategory::Paper)),
    ("cell phone", Mapped(TrashCategory::OtherTrash)),
    ("scissors", Mapped(TrashCategory::OtherTrash)),
    ("teddy bear", Mapped(TrashCategory::OtherTrash)),
    ("toothbrush", Mapped(TrashCategory::OtherTrash)),
    ("person", Excluded),
    ("bicycle", Excluded),
    ("car", Excluded),
    ("motorcycle", Excluded),
    ("airplane", Excluded),
    ("bus", Excluded),
    ("train", Excluded),
    ("truck", Excluded),
    ("boat", Excluded),
];

/// Maps the detector's vocabulary onto trash categories.
///
/// Lookup is exact and case-sensitive. Labels that already are category keys
/// (as produced by the simulated provider or a trash-specific model) map to themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryMapper;

impl CategoryMapper {
    pub fn resolve(&self, label: &str) -> Resolution {
        if let Some((_, rule)) = LABEL_TABLE.iter().find(|(name, _)| *name == label) {
            return match rule {
                Mapped(category) => Resolution::Mapped(*category),
                Excluded => Resolution::Excluded,
            };
        }
        match TrashCategory::from_key(label) {
            Some(category) => Resolution::Mapped(category),
            None => Resolution::DefaultOther,
        }
    }

    pub fn map(&self, label: &str) -> Option<TrashCategory> {
        self.resolve(label).category()
    }

    /// The explicit table, for listing.
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, LabelRule)> {
        LABEL_TABLE.iter().copied()
    }
}

/// Localized name of a category key; unknown keys are returned unchanged.
pub fn display_name(key: &str) -> &str {
    TrashCategory::from_key(key)
        .map(TrashCategory::display_name)
        .unwrap_or(key)
}
