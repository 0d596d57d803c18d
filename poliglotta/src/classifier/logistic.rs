//! One-vs-rest logistic regression.

use std::io::{BufRead, BufReader, Read, Write};

use tracing::debug;

use crate::errors::{PoliglottaError, Result};
use crate::feature::Example;
use crate::lang::Lang;

use super::Classifier;

const LEARNING_RATE: f64 = 10.0;
const MIN_ITERATIONS: usize = 10;
const SUM_UPDATES_THRESHOLD: f64 = 1.0;
const ERROR_EPSILON: f64 = 1e-6;

/// Default cap on training passes.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn dot(weights: &[f64], features: &[f64]) -> f64 {
    weights.iter().zip(features).map(|(w, f)| w * f).sum()
}

/// Logistic regression over the example feature vector for one positive
/// language.
///
/// Training is batch gradient ascent: per-dimension error sums are
/// accumulated against the pass-start weights and every dimension updates
/// together after the pass. Training runs at least [`MIN_ITERATIONS`] passes
/// and stops when the summed absolute update falls to 1.0 or the pass cap is
/// reached.
pub struct LogisticRegressionClassifier {
    positive: Lang,
    num_features: usize,
    max_iterations: usize,
    weights: Vec<f64>,
}

impl LogisticRegressionClassifier {
    pub fn new(positive: Lang, num_features: usize, max_iterations: usize) -> Self {
        Self {
            positive,
            num_features,
            max_iterations,
            weights: Vec::new(),
        }
    }

    pub fn positive(&self) -> Lang {
        self.positive
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl Classifier for LogisticRegressionClassifier {
    fn train(&mut self, examples: &[Example]) -> Result<()> {
        if examples.is_empty() {
            return Err(PoliglottaError::invalid_argument(
                "examples",
                "training set is empty",
            ));
        }
        for example in examples {
            if example.feature_values(self.positive).len() != self.num_features {
                return Err(PoliglottaError::invalid_argument(
                    "examples",
                    "example feature count differs from the configured count",
                ));
            }
        }
        self.weights = vec![1.0; self.num_features];
        let mut iteration = 0;
        loop {
            iteration += 1;
            let mut updates = vec![0.0; self.num_features];
            for example in examples {
                let features = example.feature_values(self.positive);
                let predicted = sigmoid(dot(&self.weights, &features));
                let label = if example.is_positive(self.positive) {
                    1.0
                } else {
                    0.0
                };
                let error = label - predicted;
                if error.abs() <= ERROR_EPSILON {
                    continue;
                }
                for (update, feature) in updates.iter_mut().zip(&features) {
                    *update += error * feature;
                }
            }
            let mut sum_updates = 0.0;
            for (weight, update) in self.weights.iter_mut().zip(&updates) {
                sum_updates += update.abs();
                *weight += LEARNING_RATE * update;
            }
            debug!(
                lang = %self.positive,
                iteration,
                sum_updates,
                "logistic training pass"
            );
            if iteration >= MIN_ITERATIONS
                && (iteration >= self.max_iterations || sum_updates <= SUM_UPDATES_THRESHOLD)
            {
                return Ok(());
            }
        }
    }

    fn confidence(&self, example: &Example) -> f64 {
        if self.weights.is_empty() {
            return 0.0;
        }
        sigmoid(dot(&self.weights, &example.feature_values(self.positive)))
    }

    /// Writes the feature count followed by one weight per line.
    fn write_to(&self, wtr: &mut dyn Write) -> Result<()> {
        writeln!(wtr, "{}", self.weights.len())?;
        for weight in &self.weights {
            writeln!(wtr, "{weight}")?;
        }
        Ok(())
    }

    /// Reads weights back. A count that differs from the configured feature
    /// count (or an empty file) yields `Ok(false)`: the stored form belongs
    /// to another configuration and the classifier must be retrained.
    ///
    /// # Errors
    ///
    /// [`PoliglottaError::InvalidModel`] on malformed or truncated content.
    fn read_from(&mut self, rdr: &mut dyn Read) -> Result<bool> {
        let mut lines = BufReader::new(rdr).lines();
        let count_line = match lines.next() {
            Some(line) => line?,
            None => return Ok(false),
        };
        let count: usize = count_line.trim().parse().map_err(|_| {
            PoliglottaError::invalid_model(format!("malformed weight count: {count_line}"))
        })?;
        if count != self.num_features {
            return Ok(false);
        }
        let mut weights = Vec::with_capacity(count);
        for _ in 0..count {
            let line = lines
                .next()
                .ok_or_else(|| PoliglottaError::invalid_model("truncated weight file"))??;
            let weight: f64 = line.trim().parse().map_err(|_| {
                PoliglottaError::invalid_model(format!("malformed weight: {line}"))
            })?;
            weights.push(weight);
        }
        self.weights = weights;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hashbrown::HashMap;

    use crate::feature::FeatureKind;

    fn example(label: Lang, value: f64) -> Example {
        let mut values = HashMap::new();
        for lang in Lang::ALL {
            values.insert(lang, if lang == label { value } else { 1.0 - value });
        }
        let mut example = Example::new(Some(label));
        example.set_feature(FeatureKind::Gram2, values);
        example
    }

    fn separable_examples() -> Vec<Example> {
        let mut examples = Vec::new();
        for i in 0..10 {
            examples.push(example(Lang::English, 0.9 + (i % 3) as f64 * 0.02));
            examples.push(example(Lang::French, 0.9 + (i % 3) as f64 * 0.02));
        }
        examples
    }

    #[test]
    fn test_separable_training_set() {
        let mut classifier =
            LogisticRegressionClassifier::new(Lang::English, 1, DEFAULT_MAX_ITERATIONS);
        classifier.train(&separable_examples()).unwrap();
        let conf_pos = classifier.confidence(&example(Lang::English, 0.93));
        let conf_neg = classifier.confidence(&example(Lang::French, 0.93));
        assert!(conf_pos > conf_neg, "{conf_pos} <= {conf_neg}");
        assert!((0.0..=1.0).contains(&conf_pos));
        assert!((0.0..=1.0).contains(&conf_neg));
    }

    #[test]
    fn test_feature_count_mismatch_fails() {
        let mut classifier =
            LogisticRegressionClassifier::new(Lang::English, 3, DEFAULT_MAX_ITERATIONS);
        assert!(classifier.train(&separable_examples()).is_err());
    }

    #[test]
    fn test_weight_file_round_trip() {
        let mut classifier =
            LogisticRegressionClassifier::new(Lang::English, 1, DEFAULT_MAX_ITERATIONS);
        classifier.train(&separable_examples()).unwrap();
        let mut buf = Vec::new();
        classifier.write_to(&mut buf).unwrap();
        let mut restored =
            LogisticRegressionClassifier::new(Lang::English, 1, DEFAULT_MAX_ITERATIONS);
        assert!(restored.read_from(&mut buf.as_slice()).unwrap());
        assert_eq!(classifier.weights(), restored.weights());
    }

    #[test]
    fn test_weight_count_mismatch_requests_retrain() {
        let mut classifier =
            LogisticRegressionClassifier::new(Lang::English, 2, DEFAULT_MAX_ITERATIONS);
        assert!(!classifier.read_from(&mut &b"3\n1.0\n2.0\n3.0\n"[..]).unwrap());
        assert!(!classifier.read_from(&mut &b""[..]).unwrap());
    }

    #[test]
    fn test_malformed_weight_file_fails() {
        let mut classifier =
            LogisticRegressionClassifier::new(Lang::English, 2, DEFAULT_MAX_ITERATIONS);
        assert!(classifier.read_from(&mut &b"2\n1.0\nbogus\n"[..]).is_err());
        assert!(classifier.read_from(&mut &b"2\n1.0\n"[..]).is_err());
        assert!(classifier.read_from(&mut &b"x\n"[..]).is_err());
    }
}
