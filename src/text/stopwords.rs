// Stopword sets, one per configured language.
//
// Lists come from the `stop-words` crate. A set is acquired once when the
// tokenizer is built and dropped with it at the end of the run.

use std::collections::HashSet;

use stop_words::{get, LANGUAGE};

use crate::config::Language;

/// A lowercase stopword set.
#[derive(Debug, Clone, Default)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    /// The stock list for a language.
    pub fn for_language(language: Language) -> Self {
        let words: Vec<String> = get(stop_words_language(language));
        Self::from_words(words)
    }

    /// Build from an explicit word list (lowercased).
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

fn stop_words_language(language: Language) -> LANGUAGE {
    match language {
        Language::Italian => LANGUAGE::Italian,
        Language::English => LANGUAGE::English,
        Language::French => LANGUAGE::French,
        Language::German => LANGUAGE::German,
        Language::Spanish => LANGUAGE::Spanish,
        Language::Portuguese => LANGUAGE::Portuguese,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_italian_list_has_articles_and_prepositions() {
        let set = StopwordSet::for_language(Language::Italian);
        assert!(!set.is_empty());
        for word in ["il", "per", "i", "la", "da"] {
            assert!(set.contains(word), "expected '{word}' to be a stopword");
        }
        assert!(!set.contains("campionato"));
    }

    #[test]
    fn test_from_words_normalizes() {
        let set = StopwordSet::from_words([" Il ", "", "PER"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("il"));
        assert!(set.contains("per"));
    }
}
