// Notizie: topic modeling for Italian news articles
//
// This is the library root. Each module corresponds to a stage of the
// collect → preprocess → fit → select pipeline, plus the output layer.

pub mod articles;
pub mod config;
pub mod error;
pub mod news;
pub mod output;
pub mod pipeline;
pub mod text;
pub mod topics;

pub use error::{PipelineError, Result};
