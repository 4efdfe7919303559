pub mod classifier;
pub mod embeddings;
pub mod reranker;

pub use classifier::{IntentClassifier, IntentModel, LinearIntentModel, UnavailableModel};
pub use embeddings::{EmbeddingProvider, HashingEmbedder};
pub use reranker::ResponseReranker;

#[cfg(feature = "bert")]
pub use embeddings::BertEmbedder;
