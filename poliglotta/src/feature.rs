//! Classifier features and training examples.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::lang::Lang;

/// A classifier feature.
///
/// One feature per configured gram width, plus the derived linear-combination
/// score. The declaration order is the canonical feature order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureKind {
    /// The combined linear-weight score over all gram widths.
    LinearCombination,
    Gram1,
    Gram2,
    Gram3,
    Gram4,
    Gram5,
    Gram6,
}

impl FeatureKind {
    /// The gram width backing this feature, if any.
    pub const fn ngram_size(self) -> Option<usize> {
        match self {
            Self::LinearCombination => None,
            Self::Gram1 => Some(1),
            Self::Gram2 => Some(2),
            Self::Gram3 => Some(3),
            Self::Gram4 => Some(4),
            Self::Gram5 => Some(5),
            Self::Gram6 => Some(6),
        }
    }

    /// The feature for a gram width.
    pub const fn for_ngram_size(n: usize) -> Option<Self> {
        match n {
            1 => Some(Self::Gram1),
            2 => Some(Self::Gram2),
            3 => Some(Self::Gram3),
            4 => Some(Self::Gram4),
            5 => Some(Self::Gram5),
            6 => Some(Self::Gram6),
            _ => None,
        }
    }
}

/// A half-open value bucket used by decision-tree splits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl ValueRange {
    /// Whether `value` falls in `[low, high)`, with a missing bound open.
    pub fn contains(&self, value: f64) -> bool {
        match (self.low, self.high) {
            (None, Some(high)) => value < high,
            (Some(low), None) => value >= low,
            (Some(low), Some(high)) => low <= value && value < high,
            (None, None) => true,
        }
    }
}

const fn bucket(low: f64, high: f64) -> ValueRange {
    ValueRange {
        low: Some(low),
        high: Some(high),
    }
}

/// Split buckets shared by every feature: a catch-all below 0.0, nine
/// buckets of width 0.1, and a catch-all at and above 0.9 (weighted
/// similarities can exceed 1.0).
pub const SPLIT_RANGES: [ValueRange; 11] = [
    ValueRange {
        low: None,
        high: Some(0.0),
    },
    bucket(0.0, 0.1),
    bucket(0.1, 0.2),
    bucket(0.2, 0.3),
    bucket(0.3, 0.4),
    bucket(0.4, 0.5),
    bucket(0.5, 0.6),
    bucket(0.6, 0.7),
    bucket(0.7, 0.8),
    bucket(0.8, 0.9),
    ValueRange {
        low: Some(0.9),
        high: None,
    },
];

/// A labeled (training) or unlabeled (query) feature vector: per-feature
/// similarity scores for every candidate language.
#[derive(Debug, Clone)]
pub struct Example {
    label: Option<Lang>,
    values: BTreeMap<FeatureKind, HashMap<Lang, f64>>,
}

impl Example {
    pub fn new(label: Option<Lang>) -> Self {
        Self {
            label,
            values: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> Option<Lang> {
        self.label
    }

    pub fn is_positive(&self, lang: Lang) -> bool {
        self.label == Some(lang)
    }

    pub fn set_feature(&mut self, feature: FeatureKind, values: HashMap<Lang, f64>) {
        self.values.insert(feature, values);
    }

    /// The score of one feature for one language; 0.0 when unset.
    pub fn feature_value(&self, feature: FeatureKind, lang: Lang) -> f64 {
        self.values
            .get(&feature)
            .and_then(|m| m.get(&lang))
            .copied()
            .unwrap_or(0.0)
    }

    /// The scores of all set features for `lang`, in canonical feature
    /// order. The length equals the number of set features.
    pub fn feature_values(&self, lang: Lang) -> Vec<f64> {
        self.values
            .values()
            .map(|m| m.get(&lang).copied().unwrap_or(0.0))
            .collect()
    }

    /// The set features, in canonical order.
    pub fn features(&self) -> impl Iterator<Item = FeatureKind> + '_ {
        self.values.keys().copied()
    }
}
