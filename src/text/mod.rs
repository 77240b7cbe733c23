// Text preprocessing — tokenization, stopwords, per-document outcomes.

pub mod stopwords;
pub mod tokenizer;

use serde::Serialize;
use tracing::{info, warn};

use crate::articles::{Document, SkipReason, SkippedDocument};
use crate::config::TextSource;
pub use tokenizer::Tokenizer;

/// A document that produced at least one token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedDocument {
    /// Position of the source record in the input file
    pub source_index: usize,
    pub tokens: Vec<String>,
}

/// Preprocessing results for a whole collection, split by outcome.
#[derive(Debug, Clone, Default)]
pub struct PreprocessReport {
    /// Documents kept for the corpus, in input order
    pub processed: Vec<ProcessedDocument>,
    /// Documents dropped before vocabulary construction
    pub skipped: Vec<SkippedDocument>,
}

impl PreprocessReport {
    /// Token sequences of the kept documents, in order.
    pub fn token_lists(&self) -> Vec<Vec<String>> {
        self.processed.iter().map(|d| d.tokens.clone()).collect()
    }
}

/// Preprocess one document: either its tokens or the reason it was dropped.
pub fn preprocess_document(
    doc: &Document,
    tokenizer: &Tokenizer,
    source: TextSource,
) -> Result<ProcessedDocument, SkipReason> {
    let text = doc.text(source);
    if text.is_empty() {
        return Err(SkipReason::EmptyText);
    }

    let tokens = tokenizer.tokenize(&text);
    if tokens.is_empty() {
        return Err(SkipReason::NoTokens);
    }

    Ok(ProcessedDocument {
        source_index: doc.index,
        tokens,
    })
}

/// Preprocess every document. Documents that end up empty are excluded
/// and logged; they keep no placeholder downstream.
pub fn preprocess_documents(
    docs: &[Document],
    tokenizer: &Tokenizer,
    source: TextSource,
) -> PreprocessReport {
    let mut report = PreprocessReport::default();

    for doc in docs {
        match preprocess_document(doc, tokenizer, source) {
            Ok(processed) => report.processed.push(processed),
            Err(reason) => {
                warn!(index = doc.index, reason = %reason, "Excluding article from corpus");
                report.skipped.push(SkippedDocument {
                    index: doc.index,
                    reason,
                });
            }
        }
    }

    info!(
        kept = report.processed.len(),
        excluded = report.skipped.len(),
        "Preprocessed articles"
    );

    report
}
