// Error taxonomy for the document pipeline.
//
// Pipeline stages return typed errors so the model selector can tell a
// degenerate fit apart from a bad parameter. Everything above the pipeline
// (file loading, the news client, the CLI) works in anyhow and wraps these.

use thiserror::Error;

/// Result alias for pipeline stages.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the preprocessing → fitting → selection pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A record or field had the wrong shape. Recovered per document.
    #[error("Malformed input at document {index}: {message}")]
    MalformedInput { index: usize, message: String },

    /// No document survived preprocessing.
    #[error("Empty corpus: {message}")]
    EmptyCorpus { message: String },

    /// A fit or selection parameter is out of range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// Inference produced a malformed model.
    #[error("Degenerate fit with {k} topics: {message}")]
    FitDegenerate { k: usize, message: String },

    /// Coherence could not be computed for a fitted model.
    #[error("Coherence scoring failed: {message}")]
    ScoringFailed { message: String },

    /// Every model-selection candidate failed.
    #[error("All {candidates} model-selection candidates failed")]
    AllCandidatesFailed { candidates: usize },

    /// The run was cancelled between stages.
    #[error("Cancelled before {stage}")]
    Cancelled { stage: String },
}

impl PipelineError {
    pub fn malformed_input(index: usize, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            index,
            message: message.into(),
        }
    }

    pub fn empty_corpus(message: impl Into<String>) -> Self {
        Self::EmptyCorpus {
            message: message.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn fit_degenerate(k: usize, message: impl Into<String>) -> Self {
        Self::FitDegenerate {
            k,
            message: message.into(),
        }
    }

    pub fn scoring_failed(message: impl Into<String>) -> Self {
        Self::ScoringFailed {
            message: message.into(),
        }
    }

    pub fn cancelled(stage: impl Into<String>) -> Self {
        Self::Cancelled {
            stage: stage.into(),
        }
    }

    /// True for failures the selector records per candidate instead of aborting.
    pub fn is_candidate_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::FitDegenerate { .. } | Self::ScoringFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::fit_degenerate(4, "topic 2 has no tokens");
        assert!(err.to_string().contains("4 topics"));
        assert!(err.to_string().contains("topic 2 has no tokens"));

        let err = PipelineError::AllCandidatesFailed { candidates: 10 };
        assert_eq!(err.to_string(), "All 10 model-selection candidates failed");
    }

    #[test]
    fn test_candidate_failure_classification() {
        assert!(PipelineError::invalid_parameter("k = 0").is_candidate_failure());
        assert!(PipelineError::scoring_failed("nan").is_candidate_failure());
        assert!(!PipelineError::cancelled("fitting").is_candidate_failure());
        assert!(!PipelineError::empty_corpus("none").is_candidate_failure());
    }
}
