// Model selection — sweep K, score each fit by coherence, keep the best.
//
// Candidates are generated in strictly increasing K. The winner is the
// smallest K among the maximal scores; that rule is applied explicitly in
// `select_best` so it does not depend on iteration order.
//
// A candidate whose fit or scoring fails is recorded as Unavailable and left
// out of the max. If nothing scores, the selector falls back to `default_k`
// and logs a warning instead of failing the run. The one exception: a sweep
// with a single candidate that fits degenerately surfaces that error.
//
// With the `parallel` feature the candidates are fitted on the rayon pool.
// Each fit owns its own sampler state, so nothing is shared but the corpus.

use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{info, warn};

use super::coherence::{self, CoherenceMeasure};
use super::model::TopicModel;
use super::traits::TopicFitter;
use super::vocabulary::Corpus;
use crate::error::{PipelineError, Result};
use crate::pipeline::cancel::CancellationToken;

/// Sweep settings for the model selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionConfig {
    pub k_min: usize,
    /// Inclusive upper bound
    pub k_max: usize,
    pub step: usize,
    /// Top terms per topic fed to the coherence measure
    pub top_n: usize,
    pub measure: CoherenceMeasure,
    /// K used when every candidate fails
    pub default_k: usize,
    /// Fit candidates concurrently (needs the `parallel` feature)
    pub parallel: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            k_min: 3,
            k_max: 12,
            step: 1,
            top_n: 10,
            measure: CoherenceMeasure::CV,
            default_k: 5,
            parallel: true,
        }
    }
}

impl SelectionConfig {
    /// Candidate K values, strictly increasing.
    pub fn candidates(&self) -> Result<Vec<usize>> {
        if self.k_min == 0 {
            return Err(PipelineError::invalid_parameter("k_min must be at least 1"));
        }
        if self.k_min > self.k_max {
            return Err(PipelineError::invalid_parameter(format!(
                "k_min ({}) is greater than k_max ({})",
                self.k_min, self.k_max
            )));
        }
        if self.step == 0 {
            return Err(PipelineError::invalid_parameter("step must be at least 1"));
        }
        if self.top_n == 0 {
            return Err(PipelineError::invalid_parameter("top_n must be at least 1"));
        }
        if self.default_k == 0 {
            return Err(PipelineError::invalid_parameter("default_k must be at least 1"));
        }
        Ok((self.k_min..=self.k_max).step_by(self.step).collect())
    }
}

/// Outcome of one candidate. Unavailable is distinct from any score.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateScore {
    Score(f64),
    Unavailable(PipelineError),
}

impl CandidateScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            CandidateScore::Score(s) => Some(*s),
            CandidateScore::Unavailable(_) => None,
        }
    }
}

/// One K of the sweep, with its model when the fit succeeded.
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub k: usize,
    pub score: CandidateScore,
    pub model: Option<TopicModel>,
}

#[derive(Debug, Clone)]
pub struct Selection {
    /// Every candidate in increasing K
    pub candidates: Vec<CandidateResult>,
    pub best_k: usize,
    /// True when no candidate scored and `best_k` is the configured default
    pub fallback: bool,
    pub measure: CoherenceMeasure,
}

impl Selection {
    /// The winning candidate's model. None on fallback.
    pub fn best_model(&self) -> Option<&TopicModel> {
        if self.fallback {
            return None;
        }
        self.candidates
            .iter()
            .find(|c| c.k == self.best_k)
            .and_then(|c| c.model.as_ref())
    }

    /// (K, score) pairs; None marks an unavailable candidate.
    pub fn scores(&self) -> Vec<(usize, Option<f64>)> {
        self.candidates.iter().map(|c| (c.k, c.score.value())).collect()
    }

    pub fn failed(&self) -> usize {
        self.candidates.iter().filter(|c| c.score.value().is_none()).count()
    }
}

/// Smallest K among the maximal scores. None when nothing scored.
pub fn select_best(scores: &[(usize, Option<f64>)]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &(k, score) in scores {
        let Some(score) = score else { continue };
        best = match best {
            None => Some((k, score)),
            Some((best_k, best_score)) => {
                if score > best_score || (score == best_score && k < best_k) {
                    Some((k, score))
                } else {
                    Some((best_k, best_score))
                }
            }
        };
    }
    best.map(|(k, _)| k)
}

/// Coherence of a fitted model over the corpus it was fitted on.
pub fn score_model(
    model: &TopicModel,
    corpus: &Corpus,
    measure: CoherenceMeasure,
    top_n: usize,
) -> Result<f64> {
    let topics: Vec<Vec<usize>> = (0..model.num_topics())
        .map(|t| {
            model
                .top_term_ids(t, top_n)
                .into_iter()
                .map(|(id, _)| id)
                .collect()
        })
        .collect();
    coherence::coherence(measure, &topics, &corpus.texts)
}

/// Fit and score every candidate K and pick the winner.
///
/// Returns `InvalidParameter` for a bad range, `Cancelled` if the token
/// fires before or during a candidate fit, and the candidate's own `FitDegenerate` when
/// the sweep has exactly one candidate. Everything else is recorded per
/// candidate.
pub fn select_model(
    fitter: &dyn TopicFitter,
    corpus: &Corpus,
    seed: u64,
    config: &SelectionConfig,
    cancel: &CancellationToken,
    progress: &ProgressBar,
) -> Result<Selection> {
    let ks = config.candidates()?;
    info!(
        candidates = ks.len(),
        k_min = config.k_min,
        k_max = config.k_max,
        measure = %config.measure,
        "Sweeping topic counts"
    );
    progress.set_length(ks.len() as u64);

    let evaluate = |k: usize| -> Result<CandidateResult> {
        let result = evaluate_candidate(fitter, corpus, k, seed, config, cancel)?;
        progress.inc(1);
        Ok(result)
    };

    let candidates = if config.parallel {
        run_candidates_parallel(&ks, evaluate)?
    } else {
        ks.iter().map(|&k| evaluate(k)).collect::<Result<Vec<_>>>()?
    };
    progress.finish_and_clear();

    if let [only] = candidates.as_slice() {
        if let CandidateScore::Unavailable(err @ PipelineError::FitDegenerate { .. }) = &only.score {
            return Err(err.clone());
        }
    }

    let scores: Vec<(usize, Option<f64>)> =
        candidates.iter().map(|c| (c.k, c.score.value())).collect();

    let (best_k, fallback) = match select_best(&scores) {
        Some(k) => (k, false),
        None => {
            let err = PipelineError::AllCandidatesFailed {
                candidates: candidates.len(),
            };
            warn!(
                error = %err,
                default_k = config.default_k,
                "Falling back to the default topic count"
            );
            (config.default_k, true)
        }
    };

    if !fallback {
        info!(best_k, "Selected topic count");
    }

    Ok(Selection {
        candidates,
        best_k,
        fallback,
        measure: config.measure,
    })
}

fn evaluate_candidate(
    fitter: &dyn TopicFitter,
    corpus: &Corpus,
    k: usize,
    seed: u64,
    config: &SelectionConfig,
    cancel: &CancellationToken,
) -> Result<CandidateResult> {
    let model = match fitter.fit_cancellable(corpus, k, seed, cancel) {
        Ok(model) => model,
        Err(e @ PipelineError::Cancelled { .. }) => return Err(e),
        Err(e) => {
            warn!(k, error = %e, "Candidate fit failed");
            return Ok(CandidateResult {
                k,
                score: CandidateScore::Unavailable(e),
                model: None,
            });
        }
    };

    let result = match score_model(&model, corpus, config.measure, config.top_n) {
        Ok(score) => {
            info!(k, score, "Scored candidate");
            CandidateResult {
                k,
                score: CandidateScore::Score(score),
                model: Some(model),
            }
        }
        Err(e) => {
            warn!(k, error = %e, "Candidate scoring failed");
            CandidateResult {
                k,
                score: CandidateScore::Unavailable(e),
                model: Some(model),
            }
        }
    };
    Ok(result)
}

#[cfg(feature = "parallel")]
fn run_candidates_parallel<F>(ks: &[usize], evaluate: F) -> Result<Vec<CandidateResult>>
where
    F: Fn(usize) -> Result<CandidateResult> + Sync + Send,
{
    use rayon::prelude::*;

    // collect keeps input order, so K stays increasing
    ks.par_iter().map(|&k| evaluate(k)).collect()
}

#[cfg(not(feature = "parallel"))]
fn run_candidates_parallel<F>(ks: &[usize], evaluate: F) -> Result<Vec<CandidateResult>>
where
    F: Fn(usize) -> Result<CandidateResult>,
{
    ks.iter().map(|&k| evaluate(k)).collect()
}
