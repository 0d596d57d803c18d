//! # Poliglotta
//!
//! Poliglotta is a statistical language identifier built on character n-gram
//! frequency models, with boundary detection for multilingual text.
//!
//! Trained models are plain text files holding the most frequent grams of a
//! training corpus per gram width. Queries score text against every model by
//! cosine similarity and combine the per-width scores with one of three
//! strategies: a linear-weight combination (the default), a bagged
//! decision-tree ensemble, or one-vs-rest logistic regression. A family of
//! sliding-window boundary detectors splits mixed-language text into
//! single-language spans.
//!
//! ## Examples
//!
//! ```no_run
//! use poliglotta::{BoundaryAlgorithm, Detector, DetectorConfig, Strategy};
//!
//! let detector = Detector::new(DetectorConfig::new("resources")).unwrap();
//!
//! let lang = detector.detect("una stringa di prova").unwrap();
//! println!("{:?}", lang);
//!
//! let spans = detector
//!     .segment(
//!         "this is english und das ist deutsch",
//!         Strategy::LinearWeights,
//!         BoundaryAlgorithm::WindowBigram(4),
//!     )
//!     .unwrap();
//! for span in spans {
//!     println!("{}: {}", span.lang, span.text);
//! }
//! ```
//!
//! Model and training files live under a configurable base directory; see
//! [`DetectorConfig`].

mod boundary;
mod classifier;
mod detector;
mod errors;
mod feature;
mod lang;
mod ngram_model;
mod tokenize;
mod worker;

#[cfg(test)]
mod test_corpus;

pub use boundary::{BoundaryAlgorithm, Span};
pub use classifier::{
    BaggedTreeClassifier, Classifier, LogisticRegressionClassifier, Strategy,
};
pub use detector::{Detector, DetectorConfig, LOGISTIC_DIR, NGRAM_MODEL_DIR, TRAINING_DIR};
pub use errors::{PoliglottaError, Result};
pub use feature::{Example, FeatureKind, ValueRange};
pub use lang::Lang;
pub use ngram_model::NgramModel;
pub use tokenize::{tokenize, NgramExtractor};
