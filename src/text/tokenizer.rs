// Tokenizer/normalizer: raw article text → token sequence.
//
// Steps, in order: strip the trailing source attribution, lowercase,
// segment into words, keep alphabetic non-stopwords, stem (optional).
//
// Segmentation goes through the WordSegmenter trait. The library segmenter
// (Unicode UAX #29 via unicode-segmentation) is tried first; if it fails,
// the regex segmenter takes over. The regex segmenter never fails.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use super::stopwords::StopwordSet;
use crate::config::{Language, PipelineConfig};
use crate::error::PipelineError;

/// Maximal runs of word characters (Unicode-aware `\w`).
static WORD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word-run pattern is valid"));

/// Splits lowercase text into candidate words.
pub trait WordSegmenter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn segment(&self, text: &str) -> Result<Vec<String>>;
}

/// UAX #29 word segmentation, with Italian elisions split at the apostrophe
/// (`l'economia` → `l`, `economia`).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSegmenter;

impl WordSegmenter for UnicodeSegmenter {
    fn name(&self) -> &'static str {
        "unicode"
    }

    fn segment(&self, text: &str) -> Result<Vec<String>> {
        Ok(text
            .unicode_words()
            .flat_map(|word| word.split(['\'', '\u{2019}']))
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Regex fallback: every maximal alphanumeric run is a word.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexSegmenter;

impl RegexSegmenter {
    /// Infallible split, used directly as the fallback path.
    pub fn split(&self, text: &str) -> Vec<String> {
        WORD_RUN
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

impl WordSegmenter for RegexSegmenter {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn segment(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.split(text))
    }
}

/// Language-configured tokenizer. Owns the stopword set and stemmer for
/// the duration of a run.
pub struct Tokenizer {
    /// None when the library tokenizer is disabled
    segmenter: Option<Box<dyn WordSegmenter>>,
    fallback: RegexSegmenter,
    stopwords: StopwordSet,
    stemmer: Option<Stemmer>,
    attribution: Option<Regex>,
}

impl Tokenizer {
    /// Build a tokenizer from the pipeline configuration.
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let segmenter: Option<Box<dyn WordSegmenter>> = if config.library_tokenizer {
            Some(Box::new(UnicodeSegmenter))
        } else {
            None
        };

        Ok(Self {
            segmenter,
            fallback: RegexSegmenter,
            stopwords: StopwordSet::for_language(config.language),
            stemmer: config
                .stemming
                .then(|| Stemmer::create(stemmer_algorithm(config.language))),
            attribution: attribution_pattern(&config.attribution_marker)?,
        })
    }

    /// Replace the library segmenter.
    pub fn with_segmenter(mut self, segmenter: Box<dyn WordSegmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    /// Replace the stopword set.
    pub fn with_stopwords(mut self, stopwords: StopwordSet) -> Self {
        self.stopwords = stopwords;
        self
    }

    /// Turn one text into its token sequence. Never fails; empty or
    /// whitespace-only input gives an empty sequence.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let stripped = match &self.attribution {
            Some(pattern) => pattern.replace(text, ""),
            None => text.into(),
        };
        let lowered = stripped.to_lowercase();
        if lowered.trim().is_empty() {
            return Vec::new();
        }

        let words = match &self.segmenter {
            Some(segmenter) => match segmenter.segment(&lowered) {
                Ok(words) => words,
                Err(e) => {
                    warn!(
                        segmenter = segmenter.name(),
                        error = %e,
                        "Word segmentation failed, using regex fallback"
                    );
                    self.fallback.split(&lowered)
                }
            },
            None => self.fallback.split(&lowered),
        };

        words
            .into_iter()
            .filter(|w| is_alphabetic(w) && !self.stopwords.contains(w))
            .map(|w| match &self.stemmer {
                Some(stemmer) => stemmer.stem(&w).into_owned(),
                None => w,
            })
            .collect()
    }
}

/// Remove the source attribution and everything after it.
pub fn strip_attribution(text: &str, marker: &str) -> Result<String, PipelineError> {
    Ok(match attribution_pattern(marker)? {
        Some(pattern) => pattern.replace(text, "").into_owned(),
        None => text.to_string(),
    })
}

/// `(?is)\s*<marker>.*$` — case-insensitive, across line breaks.
fn attribution_pattern(marker: &str) -> Result<Option<Regex>, PipelineError> {
    let marker = marker.trim();
    if marker.is_empty() {
        return Ok(None);
    }
    let pattern = format!(r"(?is)\s*{}.*$", regex::escape(marker));
    Regex::new(&pattern).map(Some).map_err(|e| {
        PipelineError::invalid_parameter(format!("attribution marker '{marker}': {e}"))
    })
}

/// Python's `str.isalpha`: non-empty and every char alphabetic.
fn is_alphabetic(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphabetic)
}

fn stemmer_algorithm(language: Language) -> Algorithm {
    match language {
        Language::Italian => Algorithm::Italian,
        Language::English => Algorithm::English,
        Language::French => Algorithm::French,
        Language::German => Algorithm::German,
        Language::Spanish => Algorithm::Spanish,
        Language::Portuguese => Algorithm::Portuguese,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSegmenter;

    impl WordSegmenter for FailingSegmenter {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn segment(&self, _text: &str) -> Result<Vec<String>> {
            anyhow::bail!("tokenizer data unavailable")
        }
    }

    fn italian() -> Tokenizer {
        Tokenizer::new(&PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_strips_attribution_case_insensitive() {
        let out = strip_attribution("Nuove misure Proviene Da ANSA oggi", "proviene da").unwrap();
        assert_eq!(out, "Nuove misure");
    }

    #[test]
    fn test_strips_attribution_across_lines() {
        let out = strip_attribution("Testo\nproviene da Roma\naltro", "proviene da").unwrap();
        assert_eq!(out, "Testo");
    }

    #[test]
    fn test_empty_marker_leaves_text() {
        assert_eq!(strip_attribution("abc", "  ").unwrap(), "abc");
    }

    #[test]
    fn test_unicode_segmenter_splits_elisions() {
        let words = UnicodeSegmenter.segment("l'economia dell’italia").unwrap();
        assert_eq!(words, vec!["l", "economia", "dell", "italia"]);
    }

    #[test]
    fn test_filters_numbers_and_stopwords() {
        let tokens = italian().tokenize("Il 2024 sarà l'inverno della squadra");
        assert!(tokens.contains(&"inverno".to_string()));
        assert!(tokens.contains(&"squadra".to_string()));
        assert!(!tokens.iter().any(|t| t == "il" || t == "2024"));
    }

    #[test]
    fn test_falls_back_when_segmenter_fails() {
        let tokens = italian()
            .with_segmenter(Box::new(FailingSegmenter))
            .tokenize("Campionato vinto dalla squadra");
        assert_eq!(tokens, vec!["campionato", "vinto", "squadra"]);
    }

    #[test]
    fn test_library_tokenizer_disabled_uses_regex() {
        let config = PipelineConfig {
            library_tokenizer: false,
            ..PipelineConfig::default()
        };
        let tokens = Tokenizer::new(&config).unwrap().tokenize("campionato, tifosi!");
        assert_eq!(tokens, vec!["campionato", "tifosi"]);
    }

    #[test]
    fn test_stemming_applies_once() {
        let config = PipelineConfig {
            stemming: true,
            ..PipelineConfig::default()
        };
        let tokens = Tokenizer::new(&config).unwrap().tokenize("campionati");
        assert_eq!(tokens.len(), 1);
        let stemmer = Stemmer::create(Algorithm::Italian);
        assert_eq!(tokens[0], stemmer.stem("campionati"));
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        assert!(italian().tokenize("   \n\t ").is_empty());
        assert!(italian().tokenize("").is_empty());
    }
}
