//! Sparse character n-gram frequency vectors.

use core::cmp::Ordering;
use std::io::{BufRead, BufReader, Read, Write};
use std::sync::OnceLock;

use hashbrown::HashMap;

use crate::errors::{PoliglottaError, Result};
use crate::lang::Lang;
use crate::tokenize::{tokenize, NgramExtractor};

/// Separator between the gram and its weight in model files.
const NGRAM_SEPARATOR: char = ':';

/// Per-size cap on the number of grams that take part in norms, similarity,
/// and model files: `min(50 * n, 150)`.
const BASE_TOP_NGRAMS: usize = 50;
const MAX_TOP_NGRAMS: usize = 150;

/// Tokens longer than this many characters contribute down-weighted grams
/// when a query model is accumulated.
const WORD_LENGTH_BOUNDARY: usize = 1;

/// A sparse n-gram frequency vector for one gram width.
///
/// A model is either *trained* (tagged with a [`Lang`], loaded from a model
/// file, frozen with norm 1.0) or a *query* model accumulated from input
/// text. Accumulation is open until the entry list or the norm is first
/// needed; the model freezes at that point and further [`Self::add_ngram`]
/// calls fail.
pub struct NgramModel {
    size: usize,
    lang: Option<Lang>,
    raw: HashMap<String, f64>,
    sorted: OnceLock<Vec<(String, f64)>>,
    norm: OnceLock<f64>,
}

impl NgramModel {
    /// Creates an empty query model for grams of `size` characters.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            lang: None,
            raw: HashMap::new(),
            sorted: OnceLock::new(),
            norm: OnceLock::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn lang(&self) -> Option<Lang> {
        self.lang
    }

    fn top_ngrams(&self) -> usize {
        (BASE_TOP_NGRAMS * self.size).min(MAX_TOP_NGRAMS)
    }

    /// Adds `weight` to the frequency of `gram`.
    ///
    /// # Errors
    ///
    /// [`PoliglottaError::InvalidArgument`] if the model has already been
    /// frozen by a similarity computation or a write.
    pub fn add_ngram(&mut self, gram: &str, weight: f64) -> Result<()> {
        if self.sorted.get().is_some() || self.norm.get().is_some() {
            return Err(PoliglottaError::invalid_argument(
                "gram",
                "cannot accumulate into a normalized model",
            ));
        }
        *self.raw.entry_ref(gram).or_insert(0.0) += weight;
        Ok(())
    }

    /// Accumulates the n-grams of every token of `text`.
    ///
    /// With `adjust_for_length` set (query models), each token's grams are
    /// weighted by `1 / len(token)` for tokens longer than one character so
    /// that long words do not dominate short queries. Corpus accumulation
    /// passes `false` and counts grams as-is.
    pub fn accumulate_text(
        &mut self,
        text: &str,
        extractor: &NgramExtractor,
        adjust_for_length: bool,
    ) -> Result<()> {
        for token in tokenize(text, 1) {
            let len = token.chars().count();
            let weight = if !adjust_for_length || len <= WORD_LENGTH_BOUNDARY {
                1.0
            } else {
                WORD_LENGTH_BOUNDARY as f64 / len as f64
            };
            for gram in extractor.ngrams(&token, self.size, true).iter() {
                self.add_ngram(gram, weight)?;
            }
        }
        Ok(())
    }

    /// Entries in descending (weight, gram) order. Freezes the model.
    fn sorted_entries(&self) -> &[(String, f64)] {
        self.sorted.get_or_init(|| {
            let mut entries: Vec<_> = self.raw.iter().map(|(g, w)| (g.clone(), *w)).collect();
            sort_descending(&mut entries);
            entries
        })
    }

    /// Euclidean norm over the top-K entries. Freezes the model.
    fn length_norm(&self) -> f64 {
        *self.norm.get_or_init(|| {
            self.sorted_entries()
                .iter()
                .take(self.top_ngrams())
                .map(|(_, w)| w * w)
                .sum::<f64>()
                .sqrt()
        })
    }

    /// Cosine similarity between a trained model and a query model.
    ///
    /// Exactly one of the two sides must be language-tagged. The trained
    /// side contributes only its top-K entries; the result is divided by the
    /// top-K norms of both sides and is 0.0 whenever either norm is zero.
    ///
    /// # Errors
    ///
    /// [`PoliglottaError::InvalidArgument`] if the sizes differ or both or
    /// neither side is language-tagged.
    pub fn cosine_similarity(&self, other: &Self) -> Result<f64> {
        if self.size != other.size {
            return Err(PoliglottaError::invalid_argument(
                "other",
                "gram sizes differ",
            ));
        }
        let (trained, query) = match (self.lang, other.lang) {
            (Some(_), None) => (self, other),
            (None, Some(_)) => (other, self),
            _ => {
                return Err(PoliglottaError::invalid_argument(
                    "other",
                    "exactly one side must be a trained language model",
                ))
            }
        };
        let trained_norm = trained.length_norm();
        let query_norm = query.length_norm();
        if trained_norm == 0.0 || query_norm == 0.0 {
            return Ok(0.0);
        }
        let mut dot = 0.0;
        for (gram, weight) in trained.sorted_entries().iter().take(trained.top_ngrams()) {
            if let Some(q) = query.raw.get(gram) {
                dot += weight * q;
            }
        }
        Ok(dot / (trained_norm * query_norm))
    }

    /// Writes the top-K entries as `<gram>:<weight>` lines, with weights
    /// divided by the top-K norm and printed to three decimals. A model with
    /// a zero norm writes nothing.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        let norm = self.length_norm();
        if norm == 0.0 {
            return Ok(());
        }
        for (gram, weight) in self.sorted_entries().iter().take(self.top_ngrams()) {
            writeln!(wtr, "{gram}{NGRAM_SEPARATOR}{:.3}", weight / norm)?;
        }
        Ok(())
    }

    /// Reads a trained model for `lang` from `<gram>:<weight>` lines.
    ///
    /// The loaded model is frozen with norm 1.0 since the stored weights are
    /// already normalized.
    ///
    /// # Errors
    ///
    /// [`PoliglottaError::InvalidModel`] on a malformed record.
    pub fn read<R>(rdr: R, lang: Lang, size: usize) -> Result<Self>
    where
        R: Read,
    {
        let mut entries = Vec::new();
        for line in BufReader::new(rdr).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (gram, weight) = line.split_once(NGRAM_SEPARATOR).ok_or_else(|| {
                PoliglottaError::invalid_model(format!("malformed model record: {line}"))
            })?;
            if gram.is_empty() {
                return Err(PoliglottaError::invalid_model(format!(
                    "malformed model record: {line}"
                )));
            }
            let weight: f64 = weight.parse().map_err(|_| {
                PoliglottaError::invalid_model(format!("malformed model weight: {line}"))
            })?;
            entries.push((gram.to_string(), weight));
        }
        sort_descending(&mut entries);
        let sorted = OnceLock::new();
        let _ = sorted.set(entries);
        let norm = OnceLock::new();
        let _ = norm.set(1.0);
        Ok(Self {
            size,
            lang: Some(lang),
            raw: HashMap::new(),
            sorted,
            norm,
        })
    }
}

fn sort_descending(entries: &mut [(String, f64)]) {
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.0.cmp(&a.0))
    });
}
