// Topic fitter trait — swap-ready abstraction.
//
// The pipeline and the model selector only see this trait, so the inference
// routine can change without touching them. The default implementation is
// collapsed Gibbs sampling (see lda.rs).

use super::model::TopicModel;
use super::vocabulary::Corpus;
use crate::error::Result;
use crate::pipeline::cancel::CancellationToken;

/// Trait for fitting a K-topic model over a frozen corpus.
///
/// Implementations must be deterministic for a given (corpus, k, seed) and
/// must fail with `InvalidParameter` for K outside 1..=min(N, V).
pub trait TopicFitter: Send + Sync {
    fn fit(&self, corpus: &Corpus, k: usize, seed: u64) -> Result<TopicModel>;

    /// `fit` that stops with `Cancelled` once the token fires. The default
    /// only checks before starting; samplers override it to check mid-fit.
    fn fit_cancellable(
        &self,
        corpus: &Corpus,
        k: usize,
        seed: u64,
        cancel: &CancellationToken,
    ) -> Result<TopicModel> {
        cancel.check(&format!("fitting {k} topics"))?;
        self.fit(corpus, k, seed)
    }
}
