// End-to-end pipeline: documents → token lists → corpus → topic model.
//
// Stages run sequentially and the cancellation token is checked between
// them; fits check it again while sampling. Preprocessing never fails per
// document; the run only halts early on an empty corpus, a bad parameter
// or cancellation.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::articles::Document;
use crate::config::{PipelineConfig, TopicCount};
use crate::error::{PipelineError, Result};
use crate::pipeline::cancel::CancellationToken;
use crate::text::{self, PreprocessReport, Tokenizer};
use crate::topics::selection::{self, Selection};
use crate::topics::{Corpus, TopicFitter, TopicModel};

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Kept token lists plus the documents that were dropped
    pub preprocess: PreprocessReport,
    pub corpus: Corpus,
    /// The model to present: fixed-K fit, selection winner, or the fallback fit
    pub model: TopicModel,
    /// Present when K was swept
    pub selection: Option<Selection>,
}

impl PipelineOutput {
    /// Input-file index of the corpus document at `row` of the doc-topic matrix.
    pub fn source_index(&self, row: usize) -> Option<usize> {
        self.preprocess.processed.get(row).map(|d| d.source_index)
    }
}

/// Run the pipeline with the configured Gibbs sampler.
pub fn run(
    documents: &[Document],
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> Result<PipelineOutput> {
    run_with_fitter(documents, config, &config.lda, cancel)
}

/// Run the pipeline with any fitter.
pub fn run_with_fitter(
    documents: &[Document],
    config: &PipelineConfig,
    fitter: &dyn TopicFitter,
    cancel: &CancellationToken,
) -> Result<PipelineOutput> {
    cancel.check("preprocessing")?;
    let tokenizer = Tokenizer::new(config)?;
    let preprocess = text::preprocess_documents(documents, &tokenizer, config.text_source);

    if preprocess.processed.is_empty() {
        return Err(PipelineError::empty_corpus(format!(
            "none of the {} articles produced any tokens",
            documents.len()
        )));
    }

    let corpus = Corpus::from_token_lists(&preprocess.token_lists());
    info!(
        documents = corpus.num_documents(),
        vocabulary = corpus.vocab_size(),
        tokens = corpus.num_tokens(),
        "Built corpus"
    );

    cancel.check("fitting")?;

    let (model, selection) = match &config.topics {
        TopicCount::Fixed(k) => {
            let model = fitter.fit_cancellable(&corpus, *k, config.seed, cancel)?;
            (model, None)
        }
        TopicCount::Select(sel) => {
            let progress = candidate_progress(config.show_progress);
            let selection =
                selection::select_model(fitter, &corpus, config.seed, sel, cancel, &progress)?;

            let model = match selection.best_model() {
                Some(model) => model.clone(),
                None => {
                    let k = fallback_k(selection.best_k, &corpus);
                    info!(k, "Fitting the default topic count");
                    fitter.fit_cancellable(&corpus, k, config.seed, cancel)?
                }
            };
            (model, Some(selection))
        }
    };

    Ok(PipelineOutput {
        preprocess,
        corpus,
        model,
        selection,
    })
}

/// The default K, clamped into the range the corpus can support.
fn fallback_k(default_k: usize, corpus: &Corpus) -> usize {
    default_k
        .min(corpus.num_documents())
        .min(corpus.vocab_size())
        .max(1)
}

fn candidate_progress(show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Topics [{bar:30}] {pos}/{len} K values ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}
