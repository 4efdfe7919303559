pub mod base;
pub mod source;
pub mod tfidf;

pub use base::KnowledgeBase;
pub use source::{KnowledgeDocument, MergedKnowledge, RawIntent};
pub use tfidf::{cosine_similarity, SparseVector, TfidfVectorizer};
