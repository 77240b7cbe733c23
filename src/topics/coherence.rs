// Topic coherence — how often a topic's top terms actually occur together.
//
// Two measures:
//
// c_v: boolean sliding windows (110 tokens) over each document. For every
// pair of top terms, NPMI from window co-occurrence. Each term gets a context
// vector of its NPMI against all the topic's top terms; the term's score is
// the cosine between its vector and the sum of all the vectors. Topic score
// is the mean over terms, model score the mean over topics.
//
// u_mass: document co-occurrence. For terms in rank order, the mean of
// log((D(wi, wj) + 1) / D(wj)) over pairs with j ranked above i.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Window size used by c_v.
pub const CV_WINDOW: usize = 110;

const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoherenceMeasure {
    #[default]
    CV,
    UMass,
}

impl std::str::FromStr for CoherenceMeasure {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "c_v" | "cv" => Ok(CoherenceMeasure::CV),
            "u_mass" | "umass" => Ok(CoherenceMeasure::UMass),
            other => Err(PipelineError::invalid_parameter(format!(
                "unknown coherence measure '{other}' (expected c_v or u_mass)"
            ))),
        }
    }
}

impl std::fmt::Display for CoherenceMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoherenceMeasure::CV => f.write_str("c_v"),
            CoherenceMeasure::UMass => f.write_str("u_mass"),
        }
    }
}

/// Model-level coherence: the mean of the per-topic scores.
///
/// `topics` holds each topic's top term ids in rank order; `texts` holds
/// every document's term ids in reading order.
pub fn coherence(
    measure: CoherenceMeasure,
    topics: &[Vec<usize>],
    texts: &[Vec<usize>],
) -> Result<f64> {
    let scores = topic_coherences(measure, topics, texts)?;
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    if !mean.is_finite() {
        return Err(PipelineError::scoring_failed(format!(
            "{measure} coherence is not finite"
        )));
    }
    Ok(mean)
}

/// One coherence score per topic.
pub fn topic_coherences(
    measure: CoherenceMeasure,
    topics: &[Vec<usize>],
    texts: &[Vec<usize>],
) -> Result<Vec<f64>> {
    if topics.is_empty() {
        return Err(PipelineError::scoring_failed("no topics to score"));
    }
    if topics.iter().any(Vec::is_empty) {
        return Err(PipelineError::scoring_failed("a topic has no top terms"));
    }
    if texts.iter().all(Vec::is_empty) {
        return Err(PipelineError::scoring_failed("reference texts are empty"));
    }

    let scores = match measure {
        CoherenceMeasure::CV => {
            let stats = CooccurrenceStats::sliding_windows(topics, texts, CV_WINDOW);
            topics
                .iter()
                .map(|topic| cv_topic(topic, &stats))
                .collect::<Result<Vec<_>>>()?
        }
        CoherenceMeasure::UMass => {
            let stats = CooccurrenceStats::documents(topics, texts);
            topics
                .iter()
                .map(|topic| umass_topic(topic, &stats))
                .collect::<Result<Vec<_>>>()?
        }
    };

    if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
        return Err(PipelineError::scoring_failed(format!(
            "{measure} coherence of topic {pos} is not finite"
        )));
    }
    Ok(scores)
}

/// Occurrence and pairwise co-occurrence counts over "segments" (sliding
/// windows or whole documents), restricted to the terms being scored.
struct CooccurrenceStats {
    /// term id → row in the count tables
    slot: HashMap<usize, usize>,
    occurrences: Vec<u64>,
    /// upper triangle, [min slot][max slot]
    pairs: Vec<Vec<u64>>,
    segments: u64,
}

impl CooccurrenceStats {
    fn empty(topics: &[Vec<usize>]) -> Self {
        let terms: BTreeSet<usize> = topics.iter().flatten().copied().collect();
        let slot: HashMap<usize, usize> =
            terms.into_iter().enumerate().map(|(s, id)| (id, s)).collect();
        let n = slot.len();
        Self {
            slot,
            occurrences: vec![0; n],
            pairs: vec![vec![0; n]; n],
            segments: 0,
        }
    }

    fn sliding_windows(topics: &[Vec<usize>], texts: &[Vec<usize>], window: usize) -> Self {
        let mut stats = Self::empty(topics);
        for text in texts.iter().filter(|t| !t.is_empty()) {
            if text.len() <= window {
                stats.add_segment(text);
            } else {
                for segment in text.windows(window) {
                    stats.add_segment(segment);
                }
            }
        }
        stats
    }

    fn documents(topics: &[Vec<usize>], texts: &[Vec<usize>]) -> Self {
        let mut stats = Self::empty(topics);
        for text in texts.iter().filter(|t| !t.is_empty()) {
            stats.add_segment(text);
        }
        stats
    }

    fn add_segment(&mut self, segment: &[usize]) {
        let present: BTreeSet<usize> = segment
            .iter()
            .filter_map(|id| self.slot.get(id).copied())
            .collect();
        let present: Vec<usize> = present.into_iter().collect();
        for (i, &a) in present.iter().enumerate() {
            self.occurrences[a] += 1;
            for &b in &present[i + 1..] {
                self.pairs[a][b] += 1;
            }
        }
        self.segments += 1;
    }

    fn count(&self, term: usize) -> Result<u64> {
        self.slot
            .get(&term)
            .map(|&s| self.occurrences[s])
            .ok_or_else(|| PipelineError::scoring_failed(format!("term {term} was not counted")))
    }

    fn joint(&self, a: usize, b: usize) -> Result<u64> {
        let (Some(&sa), Some(&sb)) = (self.slot.get(&a), self.slot.get(&b)) else {
            return Err(PipelineError::scoring_failed(format!(
                "term pair ({a}, {b}) was not counted"
            )));
        };
        Ok(match sa.cmp(&sb) {
            std::cmp::Ordering::Equal => self.occurrences[sa],
            std::cmp::Ordering::Less => self.pairs[sa][sb],
            std::cmp::Ordering::Greater => self.pairs[sb][sa],
        })
    }

    /// Normalized PMI, in [-1, 1].
    fn npmi(&self, a: usize, b: usize) -> Result<f64> {
        let n = self.segments as f64;
        let (ca, cb) = (self.count(a)?, self.count(b)?);
        if ca == 0 || cb == 0 {
            return Err(PipelineError::scoring_failed(
                "a top term never occurs in the reference texts",
            ));
        }
        let p_ab = self.joint(a, b)? as f64 / n + EPSILON;
        let p_a = ca as f64 / n;
        let p_b = cb as f64 / n;
        let pmi = p_ab.ln() - (p_a * p_b).ln();
        Ok(pmi / -p_ab.ln())
    }
}

fn cv_topic(topic: &[usize], stats: &CooccurrenceStats) -> Result<f64> {
    let vectors: Vec<Vec<f64>> = topic
        .iter()
        .map(|&a| topic.iter().map(|&b| stats.npmi(a, b)).collect::<Result<Vec<_>>>())
        .collect::<Result<_>>()?;

    let mut topic_vector = vec![0.0; topic.len()];
    for vector in &vectors {
        for (sum, x) in topic_vector.iter_mut().zip(vector) {
            *sum += x;
        }
    }

    let total: f64 = vectors.iter().map(|v| cosine(v, &topic_vector)).sum();
    Ok(total / vectors.len() as f64)
}

fn umass_topic(topic: &[usize], stats: &CooccurrenceStats) -> Result<f64> {
    if topic.len() < 2 {
        return Err(PipelineError::scoring_failed(
            "u_mass needs at least two terms per topic",
        ));
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, &wi) in topic.iter().enumerate().skip(1) {
        for &wj in &topic[..i] {
            let dj = stats.count(wj)?;
            if dj == 0 {
                return Err(PipelineError::scoring_failed(
                    "a top term never occurs in the reference texts",
                ));
            }
            total += ((stats.joint(wi, wj)? as f64 + 1.0) / dj as f64).ln();
            pairs += 1;
        }
    }
    Ok(total / pairs as f64)
}

/// Cosine similarity; zero vectors score 0.
fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
