use crate::config::CONFIDENCE_THRESHOLD;
use crate::detection::mapping::CategoryMapper;
use crate::models::{FinalDetection, RawDetection};

/// Reduces raw detector output to the final detection list.
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    mapper: CategoryMapper,
    threshold: f32,
}

impl DetectionFilter {
    pub fn new() -> Self {
        Self {
            mapper: CategoryMapper,
            threshold: CONFIDENCE_THRESHOLD,
        }
    }

    /// Keeps a detection iff its label is not excluded and its confidence is
    /// strictly above the threshold. Output is sorted by descending confidence;
    /// the sort is stable so ties keep their input order.
    pub fn filter(&self, raw: &[RawDetection]) -> Vec<FinalDetection> {
        let mut kept: Vec<FinalDetection> = raw
            .iter()
            .filter_map(|detection| {
                let category = self.mapper.map(&detection.label)?;
                (detection.confidence > self.threshold).then_some(FinalDetection {
                    category,
                    confidence: detection.confidence,
                })
            })
            .collect();
        sort_by_confidence(&mut kept, |d| d.confidence);
        kept
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable sort, highest confidence first.
pub fn sort_by_confidence<T>(items: &mut [T], confidence: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| confidence(b).total_cmp(&confidence(a)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrashCategory;

    #[test]
    fn mixed_input_keeps_only_mapped_confident_items() {
        let raw = vec![
            RawDetection::new("bottle", 0.80),
            RawDetection::new("person", 0.90),
            RawDetection::new("cup", 0.20),
        ];
        let result = DetectionFilter::new().filter(&raw);
        assert_eq!(
            result,
            vec![FinalDetection {
                category: TrashCategory::PlasticBottle,
                confidence: 0.80
            }]
        );
    }

    #[test]
    fn threshold_is_strict() {
        let raw = vec![
            RawDetection::new("bottle", 0.3),
            RawDetection::new("bottle", 0.3001),
        ];
        let result = DetectionFilter::new().filter(&raw);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].confidence, 0.3001);
    }

    #[test]
    fn excluded_labels_dropped_regardless_of_confidence() {
        let raw = vec![RawDetection::new("person", 1.0), RawDetection::new("car", 0.99)];
        assert!(DetectionFilter::new().filter(&raw).is_empty());
    }

    #[test]
    fn unknown_labels_become_other_trash() {
        let raw = vec![RawDetection::new("unknown", 0.5)];
        let result = DetectionFilter::new().filter(&raw);
        assert_eq!(result[0].category, TrashCategory::OtherTrash);
    }

    #[test]
    fn sorted_descending_with_stable_ties() {
        let raw = vec![
            RawDetection::new("book", 0.5),
            RawDetection::new("bottle", 0.9),
            RawDetection::new("kite", 0.5),
            RawDetection::new("cup", 0.7),
        ];
        let result = DetectionFilter::new().filter(&raw);
        let categories: Vec<_> = result.iter().map(|d| d.category).collect();
        assert_eq!(
            categories,
            vec![
                TrashCategory::PlasticBottle,
                TrashCategory::PlasticBottle,
                TrashCategory::Paper,
                TrashCategory::OtherTrash,
            ]
        );
        assert!(result.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(DetectionFilter::new().filter(&[]).is_empty());
    }
}
