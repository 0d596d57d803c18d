//! Boundary detection: splitting multilingual text into single-language
//! spans.
//!
//! All algorithms work over whitespace tokens with case preserved; the
//! classifier sees the raw window text. Adjacent spans that end up with the
//! same language always merge, and every input token lands in exactly one
//! span.

use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::classifier::Strategy;
use crate::detector::Detector;
use crate::errors::{PoliglottaError, Result};
use crate::lang::Lang;

/// Window size of the recursive pass used by [`BoundaryAlgorithm::NestedWindow`].
const NESTED_WINDOW: usize = 3;

/// Chunks the classifier cannot place fall back to this language.
const FALLBACK_LANG: Lang = Lang::English;

/// A contiguous run of tokens tagged with one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub lang: Lang,
}

/// Boundary-detection algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryAlgorithm {
    /// Classify one token at a time; split where the call changes.
    OneWord,
    /// Classify a sliding two-token window.
    TwoWord,
    /// Classify a sliding three-token window.
    ThreeWord,
    /// Split wherever the adjacent-token bigram never occurs in the
    /// training corpora; no classifier windows.
    Bigram,
    /// Sliding window of 2 to 6 tokens; on a language change, cut at the
    /// rarest in-window bigram unless every candidate bigram is attested.
    WindowBigram(usize),
    /// Sliding window of more than 3 tokens that delegates cut placement to
    /// a recursive 3-token [`Self::WindowBigram`] pass over the window.
    NestedWindow(usize),
}

/// Preferred order of in-window boundary positions per window size.
/// Position `i` sits `i + 1` tokens from the window's newest edge; central
/// positions are tried first.
fn boundary_preference(window_size: usize) -> Option<&'static [usize]> {
    match window_size {
        2 => Some(&[0]),
        3 => Some(&[1, 0]),
        4 => Some(&[1, 2, 0]),
        5 => Some(&[2, 1, 3, 0]),
        6 => Some(&[2, 3, 1, 4, 0]),
        _ => None,
    }
}

pub(crate) fn segment(
    detector: &Detector,
    strategy: Strategy,
    algorithm: BoundaryAlgorithm,
    text: &str,
) -> Result<Vec<Span>> {
    match algorithm {
        BoundaryAlgorithm::OneWord => one_word(detector, strategy, text),
        BoundaryAlgorithm::TwoWord => n_word(detector, strategy, 2, text),
        BoundaryAlgorithm::ThreeWord => n_word(detector, strategy, 3, text),
        BoundaryAlgorithm::Bigram => bigram(detector, strategy, text),
        BoundaryAlgorithm::WindowBigram(window_size) => {
            if boundary_preference(window_size).is_none() {
                return Err(PoliglottaError::invalid_argument(
                    "algorithm",
                    format!("unsupported window size: {window_size}"),
                ));
            }
            window_bigram(detector, strategy, window_size, text)
        }
        BoundaryAlgorithm::NestedWindow(window_size) => {
            if window_size <= NESTED_WINDOW || boundary_preference(window_size).is_none() {
                return Err(PoliglottaError::invalid_argument(
                    "algorithm",
                    format!("unsupported window size: {window_size}"),
                ));
            }
            nested_window(detector, strategy, window_size, text)
        }
    }
}

/// Appends a span, merging into the previous one on an equal tag.
fn push_span(spans: &mut Vec<Span>, text: String, lang: Lang) {
    if let Some(last) = spans.last_mut() {
        if last.lang == lang {
            last.text.push(' ');
            last.text.push_str(&text);
            return;
        }
    }
    spans.push(Span { text, lang });
}

fn detect_or_default(detector: &Detector, strategy: Strategy, text: &str) -> Result<Lang> {
    Ok(detector
        .detect_with(text, strategy)?
        .unwrap_or(FALLBACK_LANG))
}

fn one_word(detector: &Detector, strategy: Strategy, text: &str) -> Result<Vec<Span>> {
    let mut spans = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut prev: Option<Lang> = None;
    for token in text.split_whitespace() {
        let lang = detector.detect_with(token, strategy)?;
        if let (Some(lang), Some(prev)) = (lang, prev) {
            if lang != prev && !current.is_empty() {
                push_span(&mut spans, current.join(" "), prev);
                current.clear();
            }
        }
        current.push(token);
        prev = lang;
    }
    flush(detector, strategy, &mut spans, &current, prev)?;
    Ok(spans)
}

/// Two- and three-token sliding windows: the oldest window token joins the
/// pending span right before the window is classified, and a language change
/// between consecutive windows emits the pending span.
fn n_word(
    detector: &Detector,
    strategy: Strategy,
    window_size: usize,
    text: &str,
) -> Result<Vec<Span>> {
    let mut spans = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut prev: Option<Lang> = None;
    for token in text.split_whitespace() {
        window.push_back(token);
        if window.len() < window_size {
            continue;
        }
        current.push(window[0]);
        let window_text = join(window.iter().copied());
        let lang = detector.detect_with(&window_text, strategy)?;
        if let (Some(lang), Some(prev)) = (lang, prev) {
            if lang != prev {
                push_span(&mut spans, current.join(" "), prev);
                current.clear();
            }
        }
        prev = lang;
        window.pop_front();
    }
    current.extend(window);
    flush(detector, strategy, &mut spans, &current, prev)?;
    Ok(spans)
}

/// Pure bigram splitting: a cut wherever the adjacent pair is unattested in
/// the training corpora; each chunk is classified at emission.
fn bigram(detector: &Detector, strategy: Strategy, text: &str) -> Result<Vec<Span>> {
    let counts = detector.bigram_counts()?;
    let mut spans = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut prev_token: Option<&str> = None;
    for token in text.split_whitespace() {
        if let Some(prev) = prev_token {
            current.push(prev);
            if bigram_count(&counts, prev, token) == 0 {
                let chunk = current.join(" ");
                let lang = detect_or_default(detector, strategy, &chunk)?;
                push_span(&mut spans, chunk, lang);
                current.clear();
            }
        }
        prev_token = Some(token);
    }
    if let Some(prev) = prev_token {
        current.push(prev);
    }
    flush(detector, strategy, &mut spans, &current, None)?;
    Ok(spans)
}

fn window_bigram(
    detector: &Detector,
    strategy: Strategy,
    window_size: usize,
    text: &str,
) -> Result<Vec<Span>> {
    let counts = detector.bigram_counts()?;
    // validated by the caller
    let preference = boundary_preference(window_size).unwrap_or(&[0]);
    let mut spans = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut prev: Option<Lang> = None;
    for token in text.split_whitespace() {
        window.push_back(token);
        if window.len() < window_size {
            continue;
        }
        let snapshot: Vec<&str> = window.iter().copied().collect();
        current.push(snapshot[0]);
        window.pop_front();
        let mut lang = Some(detect_or_default(
            detector,
            strategy,
            &join(snapshot.iter().copied()),
        )?);
        if lang != prev && prev.is_some() {
            // boundary position i sits between snapshot[w-2-i] and
            // snapshot[w-1-i]
            let mut all_attested = true;
            let mut smallest_count = u32::MAX;
            let mut cut = preference[0];
            for &position in preference {
                let older = snapshot[window_size - 2 - position];
                let newer = snapshot[window_size - 1 - position];
                let count = bigram_count(&counts, older, newer);
                all_attested &= count > 0;
                if count < smallest_count {
                    smallest_count = count;
                    cut = position;
                }
            }
            if !all_attested {
                cut_and_emit(
                    detector, strategy, &mut spans, &mut current, &mut window, window_size, cut,
                )?;
                lang = None;
            }
        }
        prev = lang;
    }
    current.extend(window);
    flush(detector, strategy, &mut spans, &current, None)?;
    Ok(spans)
}

fn nested_window(
    detector: &Detector,
    strategy: Strategy,
    window_size: usize,
    text: &str,
) -> Result<Vec<Span>> {
    let mut spans = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut prev: Option<Lang> = None;
    for token in text.split_whitespace() {
        window.push_back(token);
        if window.len() < window_size {
            continue;
        }
        let snapshot: Vec<&str> = window.iter().copied().collect();
        current.push(snapshot[0]);
        window.pop_front();
        let mut lang = Some(detect_or_default(
            detector,
            strategy,
            &join(snapshot.iter().copied()),
        )?);
        if lang != prev && prev.is_some() {
            if let Some(cut) = nested_cut(detector, strategy, window_size, &snapshot)? {
                cut_and_emit(
                    detector, strategy, &mut spans, &mut current, &mut window, window_size, cut,
                )?;
                lang = None;
            }
        }
        prev = lang;
    }
    current.extend(window);
    flush(detector, strategy, &mut spans, &current, None)?;
    Ok(spans)
}

/// Runs a 3-token [`window_bigram`] pass over the window and converts the
/// first resulting span boundary into a cut position; `None` suppresses the
/// cut (the recursive pass saw a single language).
fn nested_cut(
    detector: &Detector,
    strategy: Strategy,
    window_size: usize,
    snapshot: &[&str],
) -> Result<Option<usize>> {
    let inner = window_bigram(
        detector,
        strategy,
        NESTED_WINDOW,
        &join(snapshot.iter().copied()),
    )?;
    if inner.len() <= 1 {
        return Ok(None);
    }
    let Some(last_token) = inner[0].text.split_whitespace().last() else {
        return Ok(None);
    };
    // first occurrence wins when the window repeats a token
    if let Some(index) = snapshot.iter().position(|token| *token == last_token) {
        if index + 2 <= window_size {
            return Ok(Some(window_size - 2 - index));
        }
    }
    Ok(None)
}

/// Moves everything older than the cut out of the window, emits it as a
/// classified span, and leaves the newer tokens windowed.
fn cut_and_emit<'a>(
    detector: &Detector,
    strategy: Strategy,
    spans: &mut Vec<Span>,
    current: &mut Vec<&'a str>,
    window: &mut VecDeque<&'a str>,
    window_size: usize,
    cut: usize,
) -> Result<()> {
    for _ in 0..window_size - 2 - cut {
        if let Some(token) = window.pop_front() {
            current.push(token);
        }
    }
    let chunk = current.join(" ");
    let lang = detect_or_default(detector, strategy, &chunk)?;
    push_span(spans, chunk, lang);
    current.clear();
    Ok(())
}

/// Emits the trailing tokens. `prev` tags them when the scan already knows
/// their language; otherwise the flushed text is classified on its own.
fn flush(
    detector: &Detector,
    strategy: Strategy,
    spans: &mut Vec<Span>,
    current: &[&str],
    prev: Option<Lang>,
) -> Result<()> {
    if current.is_empty() {
        return Ok(());
    }
    let chunk = current.join(" ");
    let lang = match prev {
        Some(lang) => lang,
        None => detect_or_default(detector, strategy, &chunk)?,
    };
    push_span(spans, chunk, lang);
    Ok(())
}

fn bigram_count(counts: &HashMap<String, u32>, older: &str, newer: &str) -> u32 {
    counts
        .get(&format!("{older} {newer}"))
        .copied()
        .unwrap_or(0)
}

fn join<'a, I>(tokens: I) -> String
where
    I: Iterator<Item = &'a str>,
{
    tokens.collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_corpus::{fixture_detector, multilingual_text, sentence};

    fn retokenized(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn assert_segmentation_invariants(spans: &[Span], input: &str) {
        let rebuilt = spans
            .iter()
            .map(|span| span.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(retokenized(input), rebuilt);
        for pair in spans.windows(2) {
            assert_ne!(pair[0].lang, pair[1].lang, "unmerged adjacent spans");
        }
    }

    #[test]
    fn test_window_bigram_tags_six_languages_in_order() {
        let (_dir, detector) = fixture_detector(42);
        let text = multilingual_text(1);
        let spans = detector
            .segment(
                &text,
                Strategy::LinearWeights,
                BoundaryAlgorithm::WindowBigram(4),
            )
            .unwrap();
        assert_eq!(6, spans.len());
        for (span, lang) in spans.iter().zip(Lang::ALL) {
            assert_eq!(lang, span.lang);
        }
        assert_segmentation_invariants(&spans, &text);
        // the cuts land exactly on the sentence boundaries here
        for (span, lang) in spans.iter().zip(Lang::ALL) {
            assert_eq!(retokenized(sentence(lang)), span.text);
        }
    }

    #[test]
    fn test_window_bigram_tags_repeated_languages_in_order() {
        let (_dir, detector) = fixture_detector(42);
        let repetitions = 100;
        let text = multilingual_text(repetitions);
        let spans = detector
            .segment(
                &text,
                Strategy::LinearWeights,
                BoundaryAlgorithm::WindowBigram(4),
            )
            .unwrap();
        assert_eq!(6 * repetitions, spans.len());
        for (index, span) in spans.iter().enumerate() {
            assert_eq!(Lang::ALL[index % 6], span.lang, "span {index}");
        }
        assert_segmentation_invariants(&spans, &text);
    }

    #[test]
    fn test_window_bigram_is_idempotent() {
        let (_dir, detector) = fixture_detector(42);
        let text = multilingual_text(2);
        let first = detector
            .segment(
                &text,
                Strategy::LinearWeights,
                BoundaryAlgorithm::WindowBigram(4),
            )
            .unwrap();
        let second = detector
            .segment(
                &text,
                Strategy::LinearWeights,
                BoundaryAlgorithm::WindowBigram(4),
            )
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_window_sizes_two_to_six() {
        let (_dir, detector) = fixture_detector(42);
        let text = multilingual_text(1);
        for window_size in 2..=6 {
            let spans = detector
                .segment(
                    &text,
                    Strategy::LinearWeights,
                    BoundaryAlgorithm::WindowBigram(window_size),
                )
                .unwrap();
            assert!(!spans.is_empty());
            assert_segmentation_invariants(&spans, &text);
        }
    }

    #[test]
    fn test_invalid_window_sizes() {
        let (_dir, detector) = fixture_detector(42);
        for algorithm in [
            BoundaryAlgorithm::WindowBigram(1),
            BoundaryAlgorithm::WindowBigram(7),
            BoundaryAlgorithm::NestedWindow(3),
            BoundaryAlgorithm::NestedWindow(7),
        ] {
            assert!(detector
                .segment("some text", Strategy::LinearWeights, algorithm)
                .is_err());
        }
    }

    #[test]
    fn test_nested_window_splits_multilingual_text() {
        // the recursive pass only cuts when the classifier flips inside a
        // 3-token window, so it finds fewer boundaries than the plain
        // window scan; the structural guarantees still hold
        let (_dir, detector) = fixture_detector(42);
        let text = multilingual_text(1);
        for window_size in [4, 5, 6] {
            let spans = detector
                .segment(
                    &text,
                    Strategy::LinearWeights,
                    BoundaryAlgorithm::NestedWindow(window_size),
                )
                .unwrap();
            assert!(spans.len() >= 2, "window {window_size} found no boundary");
            assert_segmentation_invariants(&spans, &text);
        }
    }

    #[test]
    fn test_bigram_splits_and_reconstructs() {
        let (_dir, detector) = fixture_detector(42);
        let text = multilingual_text(1);
        let spans = detector
            .segment(&text, Strategy::LinearWeights, BoundaryAlgorithm::Bigram)
            .unwrap();
        assert_segmentation_invariants(&spans, &text);
        let tags: Vec<Lang> = spans.iter().map(|span| span.lang).collect();
        assert_eq!(Lang::ALL.to_vec(), tags);
    }

    #[test]
    fn test_single_language_text_is_one_span() {
        let (_dir, detector) = fixture_detector(42);
        for algorithm in [
            BoundaryAlgorithm::Bigram,
            BoundaryAlgorithm::WindowBigram(3),
            BoundaryAlgorithm::WindowBigram(4),
        ] {
            let spans = detector
                .segment(
                    sentence(Lang::German),
                    Strategy::LinearWeights,
                    algorithm,
                )
                .unwrap();
            assert_eq!(1, spans.len(), "{algorithm:?}");
            assert_eq!(Lang::German, spans[0].lang);
            assert_eq!(retokenized(sentence(Lang::German)), spans[0].text);
        }
    }

    #[test]
    fn test_simple_windows_reconstruct_input() {
        let (_dir, detector) = fixture_detector(42);
        let text = multilingual_text(1);
        for algorithm in [
            BoundaryAlgorithm::OneWord,
            BoundaryAlgorithm::TwoWord,
            BoundaryAlgorithm::ThreeWord,
        ] {
            let spans = detector
                .segment(&text, Strategy::LinearWeights, algorithm)
                .unwrap();
            assert!(!spans.is_empty());
            assert_segmentation_invariants(&spans, &text);
        }
    }

    #[test]
    fn test_empty_input_yields_no_spans() {
        let (_dir, detector) = fixture_detector(42);
        for algorithm in [
            BoundaryAlgorithm::OneWord,
            BoundaryAlgorithm::TwoWord,
            BoundaryAlgorithm::ThreeWord,
            BoundaryAlgorithm::Bigram,
            BoundaryAlgorithm::WindowBigram(4),
            BoundaryAlgorithm::NestedWindow(4),
        ] {
            let spans = detector
                .segment("   ", Strategy::LinearWeights, algorithm)
                .unwrap();
            assert!(spans.is_empty(), "{algorithm:?}");
        }
    }

    #[test]
    fn test_input_shorter_than_window_is_flushed() {
        let (_dir, detector) = fixture_detector(42);
        let spans = detector
            .segment(
                "Spracherkennung",
                Strategy::LinearWeights,
                BoundaryAlgorithm::WindowBigram(4),
            )
            .unwrap();
        assert_eq!(1, spans.len());
        assert_eq!("Spracherkennung", spans[0].text);
        assert_eq!(Lang::German, spans[0].lang);
    }
}
