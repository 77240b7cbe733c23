// TopicModel — a fitted model's topic-term and document-topic matrices.

use serde::Serialize;

use super::vocabulary::Vocabulary;
use crate::error::{PipelineError, Result};

/// Tolerance for a probability row summing to 1.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// A fitted topic model. K is fixed at fit time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicModel {
    pub k: usize,
    /// Document-topic Dirichlet prior actually used
    pub alpha: f64,
    /// Topic-word Dirichlet prior
    pub beta: f64,
    pub iterations: usize,
    pub seed: u64,
    /// K × V, each row sums to 1
    pub topic_term: Vec<Vec<f64>>,
    /// N × K, each row sums to 1
    pub doc_topic: Vec<Vec<f64>>,
}

impl TopicModel {
    pub fn num_topics(&self) -> usize {
        self.k
    }

    pub fn vocab_size(&self) -> usize {
        self.topic_term.first().map_or(0, Vec::len)
    }

    pub fn num_documents(&self) -> usize {
        self.doc_topic.len()
    }

    /// The `n` heaviest term ids of a topic, heaviest first. Equal weights
    /// keep vocabulary order.
    pub fn top_term_ids(&self, topic: usize, n: usize) -> Vec<(usize, f64)> {
        let Some(row) = self.topic_term.get(topic) else {
            return Vec::new();
        };
        let mut pairs: Vec<(usize, f64)> = row.iter().copied().enumerate().collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs.truncate(n);
        pairs
    }

    /// Top terms of a topic resolved through the vocabulary.
    pub fn top_terms<'v>(
        &self,
        topic: usize,
        n: usize,
        vocabulary: &'v Vocabulary,
    ) -> Vec<(&'v str, f64)> {
        self.top_term_ids(topic, n)
            .into_iter()
            .filter_map(|(id, w)| vocabulary.token(id).map(|t| (t, w)))
            .collect()
    }

    /// Highest-weight topic of a document.
    pub fn dominant_topic(&self, doc: usize) -> Option<usize> {
        let row = self.doc_topic.get(doc)?;
        row.iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(t, _)| t)
    }

    /// Mean document weight per topic (sums to 1 over topics).
    pub fn topic_prevalence(&self) -> Vec<f64> {
        let mut prevalence = vec![0.0; self.k];
        if self.doc_topic.is_empty() {
            return prevalence;
        }
        for row in &self.doc_topic {
            for (t, w) in row.iter().enumerate() {
                prevalence[t] += w;
            }
        }
        let n = self.doc_topic.len() as f64;
        prevalence.iter_mut().for_each(|p| *p /= n);
        prevalence
    }

    /// Check shapes, finiteness and row sums.
    pub fn validate(&self) -> Result<()> {
        if self.topic_term.len() != self.k {
            return Err(PipelineError::fit_degenerate(
                self.k,
                format!("topic-term matrix has {} rows", self.topic_term.len()),
            ));
        }
        check_rows(self.k, "topic", &self.topic_term, self.vocab_size())?;
        check_rows(self.k, "document", &self.doc_topic, self.k)
    }
}

fn check_rows(k: usize, what: &str, rows: &[Vec<f64>], width: usize) -> Result<()> {
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(PipelineError::fit_degenerate(
                k,
                format!("{what} row {i} has {} columns, expected {width}", row.len()),
            ));
        }
        if row.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(PipelineError::fit_degenerate(
                k,
                format!("{what} row {i} has a non-finite or negative weight"),
            ));
        }
        let sum: f64 = row.iter().sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(PipelineError::fit_degenerate(
                k,
                format!("{what} row {i} sums to {sum}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> TopicModel {
        TopicModel {
            k: 2,
            alpha: 0.5,
            beta: 0.01,
            iterations: 10,
            seed: 1,
            topic_term: vec![vec![0.2, 0.5, 0.3], vec![0.4, 0.4, 0.2]],
            doc_topic: vec![vec![0.9, 0.1], vec![0.3, 0.7], vec![0.5, 0.5]],
        }
    }

    #[test]
    fn test_top_term_ids_sorted_with_stable_ties() {
        let m = model();
        assert_eq!(m.top_term_ids(0, 2), vec![(1, 0.5), (2, 0.3)]);
        // tie between ids 0 and 1 keeps vocabulary order
        assert_eq!(m.top_term_ids(1, 2), vec![(0, 0.4), (1, 0.4)]);
        assert!(m.top_term_ids(5, 2).is_empty());
    }

    #[test]
    fn test_dominant_topic_prefers_lower_index_on_tie() {
        let m = model();
        assert_eq!(m.dominant_topic(0), Some(0));
        assert_eq!(m.dominant_topic(1), Some(1));
        assert_eq!(m.dominant_topic(2), Some(0));
        assert_eq!(m.dominant_topic(3), None);
    }

    #[test]
    fn test_prevalence_sums_to_one() {
        let p = model().topic_prevalence();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((p[0] - 1.7 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate_catches_bad_rows() {
        assert!(model().validate().is_ok());
        let mut bad = model();
        bad.doc_topic[1] = vec![0.3, 0.3];
        assert!(matches!(
            bad.validate(),
            Err(PipelineError::FitDegenerate { k: 2, .. })
        ));
        let mut nan = model();
        nan.topic_term[0][0] = f64::NAN;
        assert!(nan.validate().is_err());
    }
}
