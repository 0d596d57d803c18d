//! The language detector: model caches, scoring, and training orchestration.

use core::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use hashbrown::{HashMap, HashSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::boundary::{self, BoundaryAlgorithm, Span};
use crate::classifier::{
    BaggedTreeClassifier, Classifier, LogisticRegressionClassifier, Strategy,
};
use crate::classifier::{DEFAULT_BAGS, DEFAULT_MAX_ITERATIONS};
use crate::errors::{PoliglottaError, Result};
use crate::feature::{Example, FeatureKind};
use crate::lang::Lang;
use crate::ngram_model::NgramModel;
use crate::tokenize::NgramExtractor;
use crate::worker::{run_tasks, LazyShared};

/// Scores below this are ignored by the linear-weight combination.
const MIN_SCORE: f64 = 0.05;

/// Classifier training parallelism.
const NUM_TRAINING_WORKERS: usize = 2;

/// Subdirectory holding `<lang>_<n>` model files.
pub const NGRAM_MODEL_DIR: &str = "ngram_models";
/// Subdirectory holding `<lang>_training` corpora.
pub const TRAINING_DIR: &str = "training";
/// Subdirectory holding `<lang>.weights` logistic weight files.
pub const LOGISTIC_DIR: &str = "logistic";

const TRAINING_SUFFIX: &str = "_training";
const WEIGHTS_SUFFIX: &str = ".weights";

/// Detector configuration.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Directory containing the `ngram_models`, `training`, and `logistic`
    /// subdirectories.
    pub base_path: PathBuf,

    /// Gram widths to score with, each backed by its own model files.
    pub ngram_sizes: Vec<usize>,

    /// Bootstrap resamples per bagged-tree ensemble.
    pub bags: usize,

    /// Cap on logistic regression training passes.
    pub max_logistic_iterations: usize,

    /// Seed for bootstrap resampling and tie-breaking. `None` seeds from
    /// entropy.
    pub seed: Option<u64>,
}

impl DetectorConfig {
    pub fn new<P>(base_path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            base_path: base_path.into(),
            ngram_sizes: (1..=6).collect(),
            bags: DEFAULT_BAGS,
            max_logistic_iterations: DEFAULT_MAX_ITERATIONS,
            seed: None,
        }
    }
}

/// A statistical language detector over character n-gram models.
///
/// All shared state lives on the instance: the per-(language, size) trained
/// model cache, the two classifier caches, the boundary bigram table, and
/// the n-gram extraction memo. Every cache is lazy; resources for a language
/// that has no files on disk are skipped with a warning rather than failing
/// the whole detector.
///
/// # Examples
///
/// ```no_run
/// use poliglotta::{Detector, DetectorConfig};
///
/// let detector = Detector::new(DetectorConfig::new("resources")).unwrap();
/// let lang = detector.detect("ceci n'est pas une pipe").unwrap();
/// println!("{:?}", lang);
/// ```
pub struct Detector {
    config: DetectorConfig,
    extractor: NgramExtractor,
    models: RwLock<HashMap<(Lang, usize), Arc<NgramModel>>>,
    populated_sizes: RwLock<HashSet<usize>>,
    trees: LazyShared<HashMap<Lang, BaggedTreeClassifier>>,
    logistic: LazyShared<HashMap<Lang, LogisticRegressionClassifier>>,
    bigrams: LazyShared<HashMap<String, u32>>,
    rng: Mutex<StdRng>,
}

impl Detector {
    /// Creates a detector.
    ///
    /// # Errors
    ///
    /// [`PoliglottaError::InvalidArgument`] when the configuration names an
    /// unsupported gram width, an empty width list, or a zero bag count.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        if config.ngram_sizes.is_empty() {
            return Err(PoliglottaError::invalid_argument(
                "config",
                "at least one gram width is required",
            ));
        }
        for &size in &config.ngram_sizes {
            if FeatureKind::for_ngram_size(size).is_none() {
                return Err(PoliglottaError::invalid_argument(
                    "config",
                    format!("unsupported gram width: {size}"),
                ));
            }
        }
        if config.bags == 0 {
            return Err(PoliglottaError::invalid_argument(
                "config",
                "at least one bag is required",
            ));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            extractor: NgramExtractor::new(),
            models: RwLock::new(HashMap::new()),
            populated_sizes: RwLock::new(HashSet::new()),
            trees: LazyShared::new(),
            logistic: LazyShared::new(),
            bigrams: LazyShared::new(),
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn model_path(&self, lang: Lang, size: usize) -> PathBuf {
        self.config
            .base_path
            .join(NGRAM_MODEL_DIR)
            .join(format!("{}_{size}", lang.code()))
    }

    fn training_path(&self, lang: Lang) -> PathBuf {
        self.config
            .base_path
            .join(TRAINING_DIR)
            .join(format!("{}{TRAINING_SUFFIX}", lang.code()))
    }

    fn weights_path(&self, lang: Lang) -> PathBuf {
        self.config
            .base_path
            .join(LOGISTIC_DIR)
            .join(format!("{}{WEIGHTS_SUFFIX}", lang.code()))
    }

    /// Loads the model files for one gram width, once.
    fn populate_models(&self, size: usize) -> Result<()> {
        {
            let populated = self
                .populated_sizes
                .read()
                .unwrap_or_else(|e| e.into_inner());
            if populated.contains(&size) {
                return Ok(());
            }
        }
        let mut populated = self
            .populated_sizes
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if populated.contains(&size) {
            return Ok(());
        }
        for lang in Lang::ALL {
            let path = self.model_path(lang, size);
            if !path.exists() {
                warn!(lang = %lang, size, "no model file; skipping language");
                continue;
            }
            let model = NgramModel::read(BufReader::new(File::open(&path)?), lang, size)?;
            self.models
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert((lang, size), Arc::new(model));
        }
        info!(size, "loaded language models");
        populated.insert(size);
        Ok(())
    }

    /// Cosine similarity of `text` against every loaded model of one gram
    /// width, weighted by the width. Languages without a model file are
    /// absent from the result.
    pub fn raw_cosine_similarities(&self, text: &str, size: usize) -> Result<Vec<(Lang, f64)>> {
        let text = text.trim();
        self.populate_models(size)?;
        let query = if text.chars().count() >= size {
            let mut model = NgramModel::new(size);
            model.accumulate_text(text, &self.extractor, true)?;
            Some(model)
        } else {
            None
        };
        let models = self.models.read().unwrap_or_else(|e| e.into_inner());
        let mut similarities = Vec::new();
        for lang in Lang::ALL {
            let Some(model) = models.get(&(lang, size)) else {
                continue;
            };
            let similarity = match &query {
                Some(query) => model.cosine_similarity(query)? * size as f64,
                None => 0.0,
            };
            similarities.push((lang, similarity));
        }
        Ok(similarities)
    }

    /// Combined linear-weight scores over all configured gram widths, in
    /// descending order.
    ///
    /// Per width, the candidate list is sorted descending and every score is
    /// normalized by the list's reference maximum and the number of widths.
    /// With `ignore_low_scores`, zero scores never latch the maximum and
    /// scores below 0.05 do not contribute.
    pub fn rank_languages(&self, text: &str, ignore_low_scores: bool) -> Result<Vec<(Lang, f64)>> {
        let num_sizes = self.config.ngram_sizes.len() as f64;
        let mut combined: HashMap<Lang, f64> = HashMap::new();
        for &size in &self.config.ngram_sizes {
            let mut similarities = self.raw_cosine_similarities(text, size)?;
            sort_scores_descending(&mut similarities);
            let mut max_score = 0.0;
            let mut max_latched = false;
            for (lang, value) in similarities {
                if ignore_low_scores && value == 0.0 {
                    continue;
                }
                if !max_latched {
                    max_score = value;
                }
                if ignore_low_scores && value < MIN_SCORE {
                    continue;
                }
                let entry = combined.entry(lang).or_insert(0.0);
                if value > 0.0 {
                    *entry += value / (max_score * num_sizes);
                }
                max_latched = true;
            }
        }
        let mut ranked: Vec<(Lang, f64)> = Lang::ALL
            .iter()
            .filter_map(|lang| combined.get(lang).map(|score| (*lang, *score)))
            .collect();
        sort_scores_descending(&mut ranked);
        Ok(ranked)
    }

    /// Detects the language of `text` with the default strategy
    /// ([`Strategy::LinearWeights`]).
    ///
    /// # Returns
    ///
    /// `None` when no language can be scored, e.g. when every score is below
    /// the cutoff or no model files exist.
    pub fn detect(&self, text: &str) -> Result<Option<Lang>> {
        self.detect_with(text, Strategy::default())
    }

    /// Detects the language of `text` with the given strategy.
    ///
    /// Classifier strategies train (or load) their classifiers on first use;
    /// exact confidence ties are broken uniformly with the detector RNG.
    pub fn detect_with(&self, text: &str, strategy: Strategy) -> Result<Option<Lang>> {
        match strategy {
            Strategy::LinearWeights => Ok(self
                .rank_languages(text, true)?
                .first()
                .map(|(lang, _)| *lang)),
            Strategy::BaggedTrees => {
                let classifiers = self.trained_trees()?;
                self.classify(text, &classifiers)
            }
            Strategy::Logistic => {
                let classifiers = self.trained_logistic()?;
                self.classify(text, &classifiers)
            }
        }
    }

    /// Splits multilingual `text` into single-language spans.
    pub fn segment(
        &self,
        text: &str,
        strategy: Strategy,
        algorithm: BoundaryAlgorithm,
    ) -> Result<Vec<Span>> {
        boundary::segment(self, strategy, algorithm, text)
    }

    fn classify<C>(&self, text: &str, classifiers: &HashMap<Lang, C>) -> Result<Option<Lang>>
    where
        C: Classifier,
    {
        let example = self.example_for(text, None)?;
        let mut best = None;
        let mut highest = 0.0;
        let mut tied = Vec::new();
        for lang in Lang::ALL {
            let Some(classifier) = classifiers.get(&lang) else {
                continue;
            };
            let confidence = classifier.confidence(&example);
            match confidence.partial_cmp(&highest) {
                Some(Ordering::Greater) => {
                    highest = confidence;
                    best = Some(lang);
                    tied.clear();
                    tied.push(lang);
                }
                Some(Ordering::Equal) => {
                    tied.push(lang);
                    best = None;
                }
                _ => {}
            }
        }
        if best.is_none() && !tied.is_empty() {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            return Ok(Some(tied[rng.gen_range(0..tied.len())]));
        }
        Ok(best)
    }

    /// Assembles the feature vector of `text`: weighted raw similarities per
    /// gram width plus the combined linear-weight score.
    fn example_for(&self, text: &str, label: Option<Lang>) -> Result<Example> {
        let mut example = Example::new(label);
        for &size in &self.config.ngram_sizes {
            // widths were validated at construction
            if let Some(feature) = FeatureKind::for_ngram_size(size) {
                let similarities = self.raw_cosine_similarities(text, size)?;
                example.set_feature(feature, similarities.into_iter().collect());
            }
        }
        let ranked = self.rank_languages(text, false)?;
        example.set_feature(FeatureKind::LinearCombination, ranked.into_iter().collect());
        Ok(example)
    }

    /// One labeled example per training-corpus line, for every language with
    /// a training file.
    fn training_examples(&self) -> Result<(Vec<Example>, Vec<Lang>)> {
        let mut examples = Vec::new();
        let mut languages = Vec::new();
        for lang in Lang::ALL {
            let path = self.training_path(lang);
            if !path.exists() {
                warn!(lang = %lang, "no training file; skipping language");
                continue;
            }
            languages.push(lang);
            for line in BufReader::new(File::open(&path)?).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                examples.push(self.example_for(&line, Some(lang))?);
            }
        }
        Ok((examples, languages))
    }

    fn feature_set(&self) -> Vec<FeatureKind> {
        let mut features = vec![FeatureKind::LinearCombination];
        features.extend(
            self.config
                .ngram_sizes
                .iter()
                .filter_map(|&size| FeatureKind::for_ngram_size(size)),
        );
        features
    }

    fn child_rng(&self) -> StdRng {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        StdRng::seed_from_u64(rng.gen())
    }

    fn trained_trees(&self) -> Result<Arc<HashMap<Lang, BaggedTreeClassifier>>> {
        self.trees.get_or_try_init(|| self.train_trees())
    }

    fn train_trees(&self) -> Result<HashMap<Lang, BaggedTreeClassifier>> {
        let (examples, languages) = self.training_examples()?;
        if languages.is_empty() {
            return Ok(HashMap::new());
        }
        let features = self.feature_set();
        let bags = self.config.bags;
        let examples = &examples;
        let tasks: Vec<_> = languages
            .iter()
            .map(|&lang| {
                let features = features.clone();
                let rng = self.child_rng();
                move || {
                    let mut classifier = BaggedTreeClassifier::new(lang, bags, features, rng);
                    classifier.train(examples)?;
                    info!(lang = %lang, "trained bagged decision trees");
                    Ok((lang, classifier))
                }
            })
            .collect();
        let trained = run_tasks(tasks, NUM_TRAINING_WORKERS)?;
        Ok(trained.into_iter().collect())
    }

    fn trained_logistic(&self) -> Result<Arc<HashMap<Lang, LogisticRegressionClassifier>>> {
        self.logistic.get_or_try_init(|| self.train_logistic())
    }

    fn train_logistic(&self) -> Result<HashMap<Lang, LogisticRegressionClassifier>> {
        let (examples, languages) = self.training_examples()?;
        if languages.is_empty() {
            return Ok(HashMap::new());
        }
        let num_features = self.feature_set().len();
        let max_iterations = self.config.max_logistic_iterations;
        if let Err(e) = std::fs::create_dir_all(self.config.base_path.join(LOGISTIC_DIR)) {
            warn!(error = %e, "cannot create the weight-file directory");
        }
        let examples = &examples;
        let tasks: Vec<_> = languages
            .iter()
            .map(|&lang| {
                let path = self.weights_path(lang);
                move || {
                    let mut classifier =
                        LogisticRegressionClassifier::new(lang, num_features, max_iterations);
                    if let Ok(file) = File::open(&path) {
                        let mut rdr = BufReader::new(file);
                        if classifier.read_from(&mut rdr)? {
                            info!(lang = %lang, "loaded logistic weights");
                            return Ok((lang, classifier));
                        }
                        warn!(lang = %lang, "stale weight file; retraining");
                    }
                    classifier.train(examples)?;
                    info!(lang = %lang, "trained logistic regression");
                    // persistence is best effort
                    match File::create(&path) {
                        Ok(file) => {
                            let mut wtr = BufWriter::new(file);
                            if let Err(e) = classifier.write_to(&mut wtr) {
                                warn!(lang = %lang, error = %e, "cannot write weights");
                            }
                        }
                        Err(e) => warn!(lang = %lang, error = %e, "cannot write weights"),
                    }
                    Ok((lang, classifier))
                }
            })
            .collect();
        let trained = run_tasks(tasks, NUM_TRAINING_WORKERS)?;
        Ok(trained.into_iter().collect())
    }

    /// Adjacent-token bigram counts over all training corpora, built once.
    pub(crate) fn bigram_counts(&self) -> Result<Arc<HashMap<String, u32>>> {
        self.bigrams.get_or_try_init(|| {
            let mut counts: HashMap<String, u32> = HashMap::new();
            for lang in Lang::ALL {
                let path = self.training_path(lang);
                if !path.exists() {
                    continue;
                }
                for line in BufReader::new(File::open(&path)?).lines() {
                    let line = line?;
                    let mut prev: Option<&str> = None;
                    for token in line.split_whitespace() {
                        if let Some(prev) = prev {
                            *counts.entry(format!("{prev} {token}")).or_insert(0) += 1;
                        }
                        prev = Some(token);
                    }
                }
            }
            info!(bigrams = counts.len(), "built the training bigram table");
            Ok(counts)
        })
    }
}

fn sort_scores_descending(scores: &mut [(Lang, f64)]) {
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
}
