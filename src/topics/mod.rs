// Topic modeling — vocabulary, LDA fitting, coherence and model selection.

pub mod coherence;
pub mod lda;
pub mod model;
pub mod selection;
pub mod traits;
pub mod vocabulary;

pub use lda::GibbsLda;
pub use model::TopicModel;
pub use traits::TopicFitter;
pub use vocabulary::{BagOfWords, Corpus, Vocabulary};
