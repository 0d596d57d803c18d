//! Classification strategies over example feature vectors.

mod decision_tree;
mod logistic;

pub use decision_tree::{BaggedTreeClassifier, DEFAULT_BAGS};
pub use logistic::{LogisticRegressionClassifier, DEFAULT_MAX_ITERATIONS};

use std::io::{Read, Write};

use crate::errors::Result;
use crate::feature::Example;

/// Selects how a detector turns similarity features into a language call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Linear-weight combination of the per-size cosine similarities.
    #[default]
    LinearWeights,
    /// Bagged decision-tree ensemble.
    BaggedTrees,
    /// One-vs-rest logistic regression.
    Logistic,
}

/// A one-vs-rest confidence scorer for a single positive language.
pub trait Classifier {
    /// Trains on labeled examples.
    fn train(&mut self, examples: &[Example]) -> Result<()>;

    /// Estimated probability that `example` belongs to the positive
    /// language. Always in `[0, 1]`.
    fn confidence(&self, example: &Example) -> f64;

    /// Persists the trained classifier.
    fn write_to(&self, wtr: &mut dyn Write) -> Result<()>;

    /// Restores a previously persisted classifier. Returns `false` when the
    /// stored form does not apply to this configuration; the caller should
    /// retrain.
    fn read_from(&mut self, rdr: &mut dyn Read) -> Result<bool>;
}
