use serde::Serialize;

/// A detection as emitted by an inference provider, in the detector's own vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDetection {
    pub label: String,
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Trash categories reported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrashCategory {
    PlasticBottle,
    PlasticBag,
    Can,
    Paper,
    GlassBottle,
    OtherTrash,
}

impl TrashCategory {
    pub const ALL: [TrashCategory; 6] = [
        TrashCategory::PlasticBottle,
        TrashCategory::PlasticBag,
        TrashCategory::Can,
        TrashCategory::Paper,
        TrashCategory::GlassBottle,
        TrashCategory::OtherTrash,
    ];

    /// Internal key, e.g. `plastic_bottle`.
    pub fn key(self) -> &'static str {
        match self {
            TrashCategory::PlasticBottle => "plastic_bottle",
            TrashCategory::PlasticBag => "plastic_bag",
            TrashCategory::Can => "can",
            TrashCategory::Paper => "paper",
            TrashCategory::GlassBottle => "glass_bottle",
            TrashCategory::OtherTrash => "other_trash",
        }
    }

    /// Localized name stored on detection records.
    pub fn display_name(self) -> &'static str {
        match self {
            TrashCategory::PlasticBottle => "塑料瓶",
            TrashCategory::PlasticBag => "塑料袋",
            TrashCategory::Can => "罐头",
            TrashCategory::Paper => "纸张",
            TrashCategory::GlassBottle => "玻璃瓶",
            TrashCategory::OtherTrash => "其他垃圾",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl std::fmt::Display for TrashCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A detection that survived category mapping and the confidence cutoff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalDetection {
    pub category: TrashCategory,
    pub confidence: f32,
}
