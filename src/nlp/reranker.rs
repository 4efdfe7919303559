use super::embeddings::{cosine_similarity, EmbeddingProvider};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Picks the candidate response semantically closest to the question.
///
/// Never fails: without a provider, or when embedding errors or times out,
/// the first candidate is returned.
pub struct ResponseReranker {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    timeout: Duration,
}

impl ResponseReranker {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        info!("✅ Reranker ready using '{}' embeddings", provider.name());
        Self {
            provider: Some(provider),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A reranker whose embedding model failed to initialize.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn rank_best(&self, question: &str, candidates: &[String]) -> Option<String> {
        if candidates.is_empty() {
            warn!("Empty candidate list for reranking");
            return None;
        }

        let Some(provider) = &self.provider else {
            warn!("Reranking model not initialized, returning first candidate");
            return candidates.first().cloned();
        };

        let scoring = Self::score(provider.as_ref(), question, candidates);
        let scored = tokio::time::timeout(self.timeout, scoring)
            .await
            .map_err(|_| anyhow!("reranking timed out after {:?}", self.timeout))
            .and_then(|r| r);

        match scored {
            Ok(scores) => {
                let (best_idx, best_score) = scores
                    .iter()
                    .copied()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (idx, score)| {
                        if score > best.1 {
                            (idx, score)
                        } else {
                            best
                        }
                    });
                debug!(
                    "Best reranking score {:.4} for candidate index {}",
                    best_score, best_idx
                );
                candidates.get(best_idx).cloned()
            }
            Err(e) => {
                warn!("Reranking failed: {:#}", e);
                candidates.first().cloned()
            }
        }
    }

    async fn score(
        provider: &dyn EmbeddingProvider,
        question: &str,
        candidates: &[String],
    ) -> Result<Vec<f32>> {
        let question_emb = provider.embed(question).await?;
        let candidate_embs = provider.embed_batch(candidates).await?;
        if candidate_embs.len() != candidates.len() {
            return Err(anyhow!(
                "provider returned {} embeddings for {} candidates",
                candidate_embs.len(),
                candidates.len()
            ));
        }

        Ok(candidate_embs
            .iter()
            .map(|emb| cosine_similarity(&question_emb, emb))
            .collect())
    }
}
