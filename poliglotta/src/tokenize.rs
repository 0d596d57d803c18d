//! Tokenization and character n-gram extraction.

use std::sync::{Arc, RwLock};

use hashbrown::{HashMap, HashSet};

/// Characters that terminate a token.
const DELIMITERS: &str =
    " \t\n\r\u{c}.()[]{}^+=|_*&%#\"',-:;/\\?!@~\u{201c}\u{201d}\u{3000}»«";

/// Tokens at or above this length are discarded as noise.
const MAX_TOKEN_LEN: usize = 200;

/// Marker placed around a token before n-gram extraction.
const BOUNDARY_MARKER: char = '$';

pub(crate) fn is_delimiter(c: char) -> bool {
    DELIMITERS.contains(c)
}

/// Splits `text` on the delimiter set and lowercases the pieces.
///
/// Pieces shorter than `min_len` characters or at least 200 characters long
/// are dropped.
pub fn tokenize(text: &str, min_len: usize) -> Vec<String> {
    text.split(is_delimiter)
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| {
            let len = w.chars().count();
            len >= min_len && len < MAX_TOKEN_LEN
        })
        .collect()
}

fn extract(marked: &str, n: usize) -> HashSet<String> {
    let chars: Vec<char> = marked
        .chars()
        .map(|c| if is_delimiter(c) { ' ' } else { c })
        .collect();
    let mut grams = HashSet::new();
    if chars.len() < n {
        return grams;
    }
    for window in chars.windows(n) {
        let gram: String = window
            .iter()
            .filter(|c| !c.is_whitespace() && !c.is_ascii_digit())
            .collect();
        // whitespace or digits shrank the candidate
        if gram.chars().count() != n {
            continue;
        }
        let gram = gram.to_lowercase();
        if n == 1 && !gram.chars().all(char::is_alphabetic) {
            continue;
        }
        grams.insert(gram);
    }
    grams
}

/// Extracts character n-grams of tokens, memoizing per (size, marked token).
///
/// The memo is populate-once and never evicted, so repeated windows over the
/// same tokens hit the cache.
pub struct NgramExtractor {
    cache: RwLock<HashMap<usize, HashMap<String, Arc<HashSet<String>>>>>,
}

impl NgramExtractor {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the n-grams of `token`.
    ///
    /// # Arguments
    ///
    /// * `token` - A single token, as produced by [`tokenize`].
    /// * `n` - The gram width in characters.
    /// * `boundary_markers` - If true, the token is wrapped in `$` markers so
    ///   that grams can anchor on the token edges.
    ///
    /// # Returns
    ///
    /// A shared set of grams. Tokens with fewer than `n - 2` characters have
    /// no grams even with markers, so the result is empty.
    pub fn ngrams(&self, token: &str, n: usize, boundary_markers: bool) -> Arc<HashSet<String>> {
        if token.chars().count() + 2 < n {
            return Arc::new(HashSet::new());
        }
        let marked = if boundary_markers {
            format!("{BOUNDARY_MARKER}{token}{BOUNDARY_MARKER}")
        } else {
            token.to_string()
        };
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(grams) = cache.get(&n).and_then(|m| m.get(&marked)) {
                return Arc::clone(grams);
            }
        }
        let grams = Arc::new(extract(&marked, n));
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            cache
                .entry(n)
                .or_default()
                .entry(marked)
                .or_insert(grams),
        )
    }
}

impl Default for NgramExtractor {
    fn default() -> Self {
        Self::new()
    }
}
