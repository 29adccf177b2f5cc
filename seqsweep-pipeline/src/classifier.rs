//! Classifiers over sparse binary patterns.

use std::collections::{BTreeMap, HashMap};

use seqsweep_core::error::PipelineError;
use seqsweep_core::structure::{RegionConfig, Stage};

/// Which classifier a `regionType` selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    Knn,
    BitHistogram,
}

impl ClassifierKind {
    pub fn from_region_type(region_type: &str) -> Option<Self> {
        if region_type.contains("KNNClassifier") {
            Some(Self::Knn)
        } else if region_type.contains("CLAClassifier") {
            Some(Self::BitHistogram)
        } else {
            None
        }
    }
}

/// A classifier the network can train and query.
#[derive(Debug, Clone)]
pub enum Classifier {
    Knn(KnnClassifier),
    BitHistogram(BitHistogramClassifier),
}

impl Classifier {
    pub fn from_region(region: &RegionConfig) -> Result<Self, PipelineError> {
        match ClassifierKind::from_region_type(&region.region_type) {
            Some(ClassifierKind::Knn) => {
                let k = region.param_usize("k").unwrap_or(1);
                if k == 0 {
                    return Err(PipelineError::stage(Stage::Classifier, "k must be positive"));
                }
                Ok(Self::Knn(KnnClassifier::new(k)))
            }
            Some(ClassifierKind::BitHistogram) => Ok(Self::BitHistogram(BitHistogramClassifier::default())),
            None => Err(PipelineError::UnsupportedStage {
                stage: Stage::Classifier,
                region_type: region.region_type.clone(),
            }),
        }
    }

    /// Best guess for `pattern`, or `None` before anything was learned.
    pub fn infer(&self, pattern: &[usize]) -> Option<u32> {
        match self {
            Self::Knn(knn) => knn.infer(pattern),
            Self::BitHistogram(hist) => hist.infer(pattern),
        }
    }

    pub fn learn(&mut self, pattern: &[usize], category: u32) {
        match self {
            Self::Knn(knn) => knn.learn(pattern, category),
            Self::BitHistogram(hist) => hist.learn(pattern, category),
        }
    }
}

/// k-nearest-neighbour vote over stored patterns, by overlap distance.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    k: usize,
    patterns: Vec<(Vec<usize>, u32)>,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            patterns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn learn(&mut self, pattern: &[usize], category: u32) {
        if !self.patterns.iter().any(|(p, c)| *c == category && p == pattern) {
            self.patterns.push((pattern.to_vec(), category));
        }
    }

    pub fn infer(&self, pattern: &[usize]) -> Option<u32> {
        let mut distances: Vec<(usize, u32)> = self
            .patterns
            .iter()
            .map(|(stored, category)| (symmetric_difference(stored, pattern), *category))
            .collect();
        distances.sort_by_key(|(distance, _)| *distance);

        let mut votes: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
        for (rank, (_, category)) in distances.iter().take(self.k).enumerate() {
            let entry = votes.entry(*category).or_insert((0, rank));
            entry.0 += 1;
        }
        // Most votes wins; ties go to the nearer neighbour.
        votes
            .into_iter()
            .max_by(|a, b| a.1.0.cmp(&b.1.0).then(b.1.1.cmp(&a.1.1)))
            .map(|(category, _)| category)
    }
}

/// Size of the symmetric difference of two sorted index lists.
fn symmetric_difference(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    a.len() + b.len() - 2 * shared
}

/// Per-bit category histograms; each active bit votes with its category
/// frequencies.
#[derive(Debug, Clone, Default)]
pub struct BitHistogramClassifier {
    histograms: HashMap<usize, HashMap<u32, u32>>,
}

impl BitHistogramClassifier {
    pub fn learn(&mut self, pattern: &[usize], category: u32) {
        for &bit in pattern {
            *self
                .histograms
                .entry(bit)
                .or_default()
                .entry(category)
                .or_insert(0) += 1;
        }
    }

    pub fn infer(&self, pattern: &[usize]) -> Option<u32> {
        let mut scores: BTreeMap<u32, f64> = BTreeMap::new();
        for bit in pattern {
            let Some(histogram) = self.histograms.get(bit) else {
                continue;
            };
            let total: u32 = histogram.values().sum();
            for (&category, &count) in histogram {
                *scores.entry(category).or_insert(0.0) += f64::from(count) / f64::from(total);
            }
        }
        // Highest score wins; ties go to the lower category.
        scores
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(category, _)| category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(region_type: &str) -> RegionConfig {
        serde_json::from_value(serde_json::json!({
            "regionEnabled": true,
            "regionType": region_type,
            "regionParams": {"k": 1}
        }))
        .unwrap()
    }

    #[test]
    fn test_kind_from_region_type() {
        assert_eq!(
            ClassifierKind::from_region_type("py.KNNClassifierRegion"),
            Some(ClassifierKind::Knn)
        );
        assert_eq!(
            ClassifierKind::from_region_type("py.CLAClassifierRegion"),
            Some(ClassifierKind::BitHistogram)
        );
        assert_eq!(ClassifierKind::from_region_type("py.SDRClassifierRegion"), None);
    }

    #[test]
    fn test_unsupported_type() {
        let err = Classifier::from_region(&region("py.Mystery")).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedStage { stage: Stage::Classifier, .. }));
    }

    #[test]
    fn test_knn_nearest_pattern() {
        let mut knn = KnnClassifier::new(1);
        assert_eq!(knn.infer(&[1, 2, 3]), None);
        knn.learn(&[1, 2, 3], 1);
        knn.learn(&[10, 11, 12], 2);
        knn.learn(&[1, 2, 3], 1);
        assert_eq!(knn.len(), 2);
        assert_eq!(knn.infer(&[1, 2, 4]), Some(1));
        assert_eq!(knn.infer(&[11, 12, 13]), Some(2));
    }

    #[test]
    fn test_knn_majority_vote() {
        let mut knn = KnnClassifier::new(3);
        knn.learn(&[1, 2], 1);
        knn.learn(&[1, 3], 2);
        knn.learn(&[1, 4], 2);
        assert_eq!(knn.infer(&[1, 2]), Some(2));
    }

    #[test]
    fn test_histogram_votes() {
        let mut hist = BitHistogramClassifier::default();
        assert_eq!(hist.infer(&[0]), None);
        hist.learn(&[0, 1, 2], 1);
        hist.learn(&[2, 3, 4], 2);
        assert_eq!(hist.infer(&[0, 1]), Some(1));
        assert_eq!(hist.infer(&[3, 4]), Some(2));
        assert_eq!(hist.infer(&[9]), None);
    }

    #[test]
    fn test_symmetric_difference() {
        assert_eq!(symmetric_difference(&[1, 2, 3], &[2, 3, 4]), 2);
        assert_eq!(symmetric_difference(&[], &[5]), 1);
    }
}
