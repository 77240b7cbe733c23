// Collapsed Gibbs sampling for Latent Dirichlet Allocation.
//
// Each document is a mixture of K topics and each topic a distribution over
// the vocabulary. Every token carries a topic assignment; a sweep resamples
// each assignment from
//
//   p(t) ∝ (n_dt + α) · (n_tw + β) / (n_t + V·β)
//
// with the token's own assignment removed from the counts. After the last
// sweep the point estimates are
//
//   φ[t][w] = (n_tw + β) / (n_t + V·β)
//   θ[d][t] = (n_dt + α) / (N_d + K·α)
//
// All randomness comes from one StdRng seeded by the caller, and tokens are
// visited in a fixed order, so a (corpus, K, seed) triple always produces
// the same matrices.
//
// A topic that ends the run with no tokens assigned is a collapsed fit and
// is reported as FitDegenerate, even though the prior would still give it a
// well-formed uniform row.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use super::model::TopicModel;
use super::traits::TopicFitter;
use super::vocabulary::Corpus;
use crate::error::{PipelineError, Result};
use crate::pipeline::cancel::CancellationToken;

/// Sweeps between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 10;

/// Gibbs-sampled LDA with symmetric priors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GibbsLda {
    /// Document-topic prior. None means 1/K.
    pub alpha: Option<f64>,
    /// Topic-word prior
    pub beta: f64,
    /// Number of full sweeps over the corpus
    pub iterations: usize,
}

impl Default for GibbsLda {
    fn default() -> Self {
        Self {
            alpha: None,
            beta: 0.01,
            iterations: 500,
        }
    }
}

impl TopicFitter for GibbsLda {
    fn fit(&self, corpus: &Corpus, k: usize, seed: u64) -> Result<TopicModel> {
        self.run(corpus, k, seed, None)
    }

    fn fit_cancellable(
        &self,
        corpus: &Corpus,
        k: usize,
        seed: u64,
        cancel: &CancellationToken,
    ) -> Result<TopicModel> {
        self.run(corpus, k, seed, Some(cancel))
    }
}

impl GibbsLda {
    fn run(
        &self,
        corpus: &Corpus,
        k: usize,
        seed: u64,
        cancel: Option<&CancellationToken>,
    ) -> Result<TopicModel> {
        let n_docs = corpus.num_documents();
        let v = corpus.vocab_size();

        if n_docs == 0 || corpus.num_tokens() == 0 {
            return Err(PipelineError::empty_corpus("no tokens to fit a topic model on"));
        }
        if k == 0 || k > n_docs || k > v {
            return Err(PipelineError::invalid_parameter(format!(
                "number of topics must be between 1 and min(documents = {n_docs}, vocabulary = {v}), got {k}"
            )));
        }

        let alpha = self.alpha.unwrap_or(1.0 / k as f64);
        let beta = self.beta;
        if !(alpha.is_finite() && alpha > 0.0) || !(beta.is_finite() && beta > 0.0) {
            return Err(PipelineError::invalid_parameter(format!(
                "priors must be positive and finite (alpha = {alpha}, beta = {beta})"
            )));
        }
        if self.iterations == 0 {
            return Err(PipelineError::invalid_parameter("iterations must be at least 1"));
        }

        let mut state = SamplerState::init(corpus, k, seed);
        state.sample(self.iterations, alpha, beta, cancel)?;

        let empty: Vec<usize> = state
            .nk
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == 0)
            .map(|(t, _)| t)
            .collect();
        if !empty.is_empty() {
            return Err(PipelineError::fit_degenerate(
                k,
                format!("topics {empty:?} collapsed to zero mass"),
            ));
        }

        let model = TopicModel {
            k,
            alpha,
            beta,
            iterations: self.iterations,
            seed,
            topic_term: state.phi(beta),
            doc_topic: state.theta(alpha),
        };
        model.validate()?;

        info!(
            topics = k,
            documents = n_docs,
            vocabulary = v,
            iterations = self.iterations,
            "Fitted LDA model"
        );

        Ok(model)
    }
}

/// Counts and assignments for one sampling run.
struct SamplerState {
    k: usize,
    v: usize,
    /// Token word ids per document, bag order
    docs: Vec<Vec<usize>>,
    /// Topic assignment per token
    z: Vec<Vec<usize>>,
    /// [doc][topic]
    ndk: Vec<Vec<u32>>,
    /// [topic][word]
    nkw: Vec<Vec<u32>>,
    /// [topic]
    nk: Vec<u32>,
    rng: StdRng,
}

impl SamplerState {
    fn init(corpus: &Corpus, k: usize, seed: u64) -> Self {
        let v = corpus.vocab_size();
        let docs: Vec<Vec<usize>> = corpus
            .bags
            .iter()
            .map(|bag| {
                bag.entries()
                    .iter()
                    .flat_map(|&(id, count)| std::iter::repeat(id).take(count as usize))
                    .collect()
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut ndk = vec![vec![0u32; k]; docs.len()];
        let mut nkw = vec![vec![0u32; v]; k];
        let mut nk = vec![0u32; k];
        let mut z = Vec::with_capacity(docs.len());

        for (d, doc) in docs.iter().enumerate() {
            let mut assignments = Vec::with_capacity(doc.len());
            for &w in doc {
                let t = rng.random_range(0..k);
                assignments.push(t);
                ndk[d][t] += 1;
                nkw[t][w] += 1;
                nk[t] += 1;
            }
            z.push(assignments);
        }

        Self {
            k,
            v,
            docs,
            z,
            ndk,
            nkw,
            nk,
            rng,
        }
    }

    fn sample(
        &mut self,
        iterations: usize,
        alpha: f64,
        beta: f64,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        let vb = self.v as f64 * beta;
        let mut weights = vec![0.0f64; self.k];

        for it in 0..iterations {
            if it % CANCEL_CHECK_INTERVAL == 0 {
                if let Some(cancel) = cancel {
                    cancel.check(&format!("sweep {it} of the {}-topic fit", self.k))?;
                }
            }

            for d in 0..self.docs.len() {
                for i in 0..self.docs[d].len() {
                    let w = self.docs[d][i];
                    let old = self.z[d][i];

                    self.ndk[d][old] -= 1;
                    self.nkw[old][w] -= 1;
                    self.nk[old] -= 1;

                    let mut total = 0.0;
                    for (t, weight) in weights.iter_mut().enumerate() {
                        let doc_part = self.ndk[d][t] as f64 + alpha;
                        let word_part =
                            (self.nkw[t][w] as f64 + beta) / (self.nk[t] as f64 + vb);
                        *weight = doc_part * word_part;
                        total += *weight;
                    }

                    let new = draw(&weights, total, &mut self.rng);

                    self.z[d][i] = new;
                    self.ndk[d][new] += 1;
                    self.nkw[new][w] += 1;
                    self.nk[new] += 1;
                }
            }

            if (it + 1) % 100 == 0 {
                debug!(iteration = it + 1, total = iterations, "Gibbs sweep");
            }
        }
        Ok(())
    }

    fn phi(&self, beta: f64) -> Vec<Vec<f64>> {
        let vb = self.v as f64 * beta;
        (0..self.k)
            .map(|t| {
                let denom = self.nk[t] as f64 + vb;
                self.nkw[t]
                    .iter()
                    .map(|&n| (n as f64 + beta) / denom)
                    .collect()
            })
            .collect()
    }

    fn theta(&self, alpha: f64) -> Vec<Vec<f64>> {
        let ka = self.k as f64 * alpha;
        self.docs
            .iter()
            .enumerate()
            .map(|(d, doc)| {
                let denom = doc.len() as f64 + ka;
                self.ndk[d]
                    .iter()
                    .map(|&n| (n as f64 + alpha) / denom)
                    .collect()
            })
            .collect()
    }
}

/// Draw an index proportionally to `weights` (which sum to `total`).
fn draw(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (t, &w) in weights.iter().enumerate() {
        cumulative += w;
        if target < cumulative {
            return t;
        }
    }
    // rounding can leave target == total
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        let docs: Vec<Vec<String>> = [
            "calcio squadra campionato gol",
            "squadra tifosi vittoria campionato",
            "governo ministro legge parlamento",
            "parlamento legge voto governo",
        ]
        .iter()
        .map(|d| d.split(' ').map(str::to_string).collect())
        .collect();
        Corpus::from_token_lists(&docs)
    }

    #[test]
    fn test_fit_shapes_and_rows() {
        let model = GibbsLda::default().fit(&corpus(), 2, 7).unwrap();
        assert_eq!(model.topic_term.len(), 2);
        assert_eq!(model.vocab_size(), corpus().vocab_size());
        assert_eq!(model.doc_topic.len(), 4);
        for row in &model.doc_topic {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert!((model.alpha - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_k_out_of_range() {
        let lda = GibbsLda::default();
        assert!(matches!(
            lda.fit(&corpus(), 0, 1),
            Err(PipelineError::InvalidParameter { .. })
        ));
        assert!(matches!(
            lda.fit(&corpus(), 5, 1),
            Err(PipelineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_priors() {
        let lda = GibbsLda {
            beta: 0.0,
            ..GibbsLda::default()
        };
        assert!(matches!(
            lda.fit(&corpus(), 2, 1),
            Err(PipelineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_empty_corpus() {
        let lda = GibbsLda::default();
        assert!(matches!(
            lda.fit(&Corpus::default(), 1, 1),
            Err(PipelineError::EmptyCorpus { .. })
        ));
    }

    #[test]
    fn test_cancelled_token_stops_sampling() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = GibbsLda::default()
            .fit_cancellable(&corpus(), 2, 1, &cancel)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { .. }));
    }

    #[test]
    fn test_draw_respects_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(draw(&[0.0, 2.0, 0.0], 2.0, &mut rng), 1);
        }
    }
}
