// Vocabulary and bag-of-words construction.
//
// Indices are handed out in first-occurrence order over the corpus, so the
// same token lists always produce the same vocabulary. The vocabulary is
// frozen once the Corpus is built; fitting only ever reads it.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// Token ↔ index mapping. Indices are exactly `0..len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    ids: HashMap<String, usize>,
    tokens: Vec<String>,
}

impl Vocabulary {
    /// Build from every token in every document.
    pub fn build(corpus: &[Vec<String>]) -> Self {
        let mut vocab = Self::default();
        for doc in corpus {
            for token in doc {
                if !vocab.ids.contains_key(token) {
                    vocab.ids.insert(token.clone(), vocab.tokens.len());
                    vocab.tokens.push(token.clone());
                }
            }
        }
        vocab
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn id(&self, token: &str) -> Option<usize> {
        self.ids.get(token).copied()
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    /// All tokens, indexed by id.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Count the tokens of one document. Tokens outside the vocabulary are ignored.
    pub fn doc2bow(&self, tokens: &[String]) -> BagOfWords {
        let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
        for id in tokens.iter().filter_map(|t| self.id(t)) {
            *counts.entry(id).or_insert(0) += 1;
        }
        BagOfWords {
            entries: counts.into_iter().collect(),
        }
    }
}

/// Sparse word counts for one document, sorted by vocabulary index.
/// Absent indices count zero; present counts are always > 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BagOfWords {
    entries: Vec<(usize, u32)>,
}

impl BagOfWords {
    pub fn entries(&self) -> &[(usize, u32)] {
        &self.entries
    }

    /// Count for one index (zero if absent).
    pub fn count(&self, id: usize) -> u32 {
        self.entries
            .binary_search_by_key(&id, |&(i, _)| i)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0)
    }

    /// Sum of all counts — the number of tokens in the document.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|&(_, c)| c as u64).sum()
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A frozen corpus: vocabulary, one bag per document, and each document's
/// token ids in their original order (sliding-window coherence needs order).
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub vocabulary: Vocabulary,
    pub bags: Vec<BagOfWords>,
    pub texts: Vec<Vec<usize>>,
}

impl Corpus {
    pub fn from_token_lists(token_lists: &[Vec<String>]) -> Self {
        let vocabulary = Vocabulary::build(token_lists);
        let bags = token_lists.iter().map(|doc| vocabulary.doc2bow(doc)).collect();
        let texts = token_lists
            .iter()
            .map(|doc| doc.iter().filter_map(|t| vocabulary.id(t)).collect())
            .collect();
        Self {
            vocabulary,
            bags,
            texts,
        }
    }

    pub fn num_documents(&self) -> usize {
        self.bags.len()
    }

    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn num_tokens(&self) -> u64 {
        self.bags.iter().map(BagOfWords::total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|d| d.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_first_occurrence_order() {
        let vocab = Vocabulary::build(&docs(&[&["roma", "governo"], &["governo", "calcio"]]));
        assert_eq!(vocab.tokens(), &["roma", "governo", "calcio"]);
        assert_eq!(vocab.id("calcio"), Some(2));
        assert_eq!(vocab.token(1), Some("governo"));
        assert_eq!(vocab.token(3), None);
    }

    #[test]
    fn test_doc2bow_counts_and_sorts() {
        let corpus = docs(&[&["b", "a", "b", "c", "b"]]);
        let vocab = Vocabulary::build(&corpus);
        let bow = vocab.doc2bow(&corpus[0]);
        assert_eq!(bow.entries(), &[(0, 3), (1, 1), (2, 1)]);
        assert_eq!(bow.count(0), 3);
        assert_eq!(bow.count(9), 0);
        assert_eq!(bow.total(), 5);
    }

    #[test]
    fn test_unknown_tokens_ignored() {
        let vocab = Vocabulary::build(&docs(&[&["a"]]));
        let bow = vocab.doc2bow(&["a".to_string(), "zzz".to_string()]);
        assert_eq!(bow.total(), 1);
    }

    #[test]
    fn test_empty_document_gives_empty_bag() {
        let corpus = Corpus::from_token_lists(&docs(&[&["a"], &[]]));
        assert!(corpus.bags[1].is_empty());
        assert_eq!(corpus.num_documents(), 2);
        assert_eq!(corpus.num_tokens(), 1);
    }

    #[test]
    fn test_texts_keep_order() {
        let corpus = Corpus::from_token_lists(&docs(&[&["x", "y", "x"]]));
        assert_eq!(corpus.texts[0], vec![0, 1, 0]);
    }
}
