//! Bagged decision trees over the static split-range table.

use std::io::{Read, Write};

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::errors::{PoliglottaError, Result};
use crate::feature::{Example, FeatureKind, ValueRange, SPLIT_RANGES};
use crate::lang::Lang;

use super::Classifier;

/// Default number of bootstrap resamples in the ensemble.
pub const DEFAULT_BAGS: usize = 10;

/// A trained decision tree. Internal nodes split one feature over
/// [`SPLIT_RANGES`]; leaves carry the positive fraction of the training
/// examples that reached them.
#[derive(Debug)]
enum DecisionTree {
    Node {
        feature: FeatureKind,
        branches: Vec<(ValueRange, DecisionTree)>,
    },
    Leaf {
        confidence: f64,
    },
}

impl DecisionTree {
    /// Grows a tree on `examples`. A negative `level` means no depth budget:
    /// growth stops on purity or feature exhaustion.
    fn grow(examples: &[&Example], features: &[FeatureKind], level: i32, positive: Lang) -> Self {
        let positives = examples.iter().filter(|e| e.is_positive(positive)).count();
        let negatives = examples.len() - positives;
        if level == 0 || positives == 0 || negatives == 0 || features.is_empty() {
            return Self::Leaf {
                confidence: positives as f64 / examples.len() as f64,
            };
        }
        let feature = max_gain_feature(examples, features, positive, positives, negatives);
        let remaining: Vec<FeatureKind> =
            features.iter().copied().filter(|f| *f != feature).collect();
        let mut branches = Vec::new();
        for range in SPLIT_RANGES {
            let subset: Vec<&Example> = examples
                .iter()
                .copied()
                .filter(|e| range.contains(e.feature_value(feature, positive)))
                .collect();
            if subset.is_empty() {
                continue;
            }
            branches.push((range, Self::grow(&subset, &remaining, level - 1, positive)));
        }
        Self::Node { feature, branches }
    }

    fn predict(&self, example: &Example, positive: Lang) -> f64 {
        match self {
            Self::Leaf { confidence } => *confidence,
            Self::Node { feature, branches } => {
                let value = example.feature_value(*feature, positive);
                for (range, child) in branches {
                    if range.contains(value) {
                        return child.predict(example, positive);
                    }
                }
                // no training example fell in this bucket
                0.5
            }
        }
    }
}

fn entropy(positives: usize, negatives: usize) -> f64 {
    if positives == 0 || negatives == 0 {
        return 0.0;
    }
    let p = positives as f64;
    let n = negatives as f64;
    let total = p + n;
    -(p / total) * (p / total).log2() - (n / total) * (n / total).log2()
}

fn max_gain_feature(
    examples: &[&Example],
    features: &[FeatureKind],
    positive: Lang,
    positives: usize,
    negatives: usize,
) -> FeatureKind {
    let node_entropy = entropy(positives, negatives);
    let mut best = features[0];
    let mut best_gain = 0.0;
    for &feature in features {
        let mut gain = node_entropy;
        for range in SPLIT_RANGES {
            let mut subset_positives = 0;
            let mut subset_total = 0;
            for example in examples {
                if range.contains(example.feature_value(feature, positive)) {
                    subset_total += 1;
                    if example.is_positive(positive) {
                        subset_positives += 1;
                    }
                }
            }
            if subset_total > 0 {
                gain -= subset_total as f64 / examples.len() as f64
                    * entropy(subset_positives, subset_total - subset_positives);
            }
        }
        if gain > best_gain {
            best_gain = gain;
            best = feature;
        }
    }
    best
}

/// A bagged ensemble of decision trees for one positive language.
///
/// Training draws `bags` bootstrap resamples (with replacement, same size as
/// the training set) and grows one tree per resample; confidence is the mean
/// of the per-tree predictions.
pub struct BaggedTreeClassifier {
    positive: Lang,
    bags: usize,
    features: Vec<FeatureKind>,
    trees: Vec<DecisionTree>,
    rng: StdRng,
}

impl BaggedTreeClassifier {
    pub fn new(positive: Lang, bags: usize, features: Vec<FeatureKind>, rng: StdRng) -> Self {
        Self {
            positive,
            bags,
            features,
            trees: Vec::new(),
            rng,
        }
    }

    pub fn positive(&self) -> Lang {
        self.positive
    }
}

impl Classifier for BaggedTreeClassifier {
    fn train(&mut self, examples: &[Example]) -> Result<()> {
        if examples.is_empty() {
            return Err(PoliglottaError::invalid_argument(
                "examples",
                "training set is empty",
            ));
        }
        self.trees.clear();
        for bag in 0..self.bags {
            let sample: Vec<&Example> = (0..examples.len())
                .map(|_| &examples[self.rng.gen_range(0..examples.len())])
                .collect();
            self.trees
                .push(DecisionTree::grow(&sample, &self.features, -1, self.positive));
            debug!(lang = %self.positive, bag = bag + 1, "grew decision tree");
        }
        Ok(())
    }

    fn confidence(&self, example: &Example) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees
            .iter()
            .map(|tree| tree.predict(example, self.positive))
            .sum::<f64>()
            / self.trees.len() as f64
    }

    fn write_to(&self, _wtr: &mut dyn Write) -> Result<()> {
        Err(PoliglottaError::not_supported(
            "bagged decision trees have no persisted form",
        ))
    }

    fn read_from(&mut self, _rdr: &mut dyn Read) -> Result<bool> {
        Err(PoliglottaError::not_supported(
            "bagged decision trees have no persisted form",
        ))
    }
}
