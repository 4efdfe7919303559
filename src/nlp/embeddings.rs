//! Semantic embedding providers used by the reranker.
//!
//! - `HashingEmbedder` hashes word unigrams and character trigrams into a
//!   fixed-size vector. No model files, always available, deterministic.
//! - `BertEmbedder` (feature `bert`) runs a sentence-transformers MiniLM
//!   model through candle with mean pooling.

use anyhow::Result;
use async_trait::async_trait;

pub const DEFAULT_DIMENSIONS: usize = 384;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;
    fn dimensions(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Cosine similarity between two dense vectors; zero if either is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let digest = md5::compute(feature.as_bytes());
        let bytes = digest.0;
        let raw = u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]);
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        ((raw % self.dimensions as u64) as usize, sign)
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let (idx, sign) = self.bucket(&format!("w:{}", word));
            vector[idx] += sign;

            let chars: Vec<char> = format!(" {} ", word).chars().collect();
            for gram in chars.windows(3) {
                let gram: String = gram.iter().collect();
                let (idx, sign) = self.bucket(&format!("c:{}", gram));
                vector[idx] += 0.5 * sign;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

#[cfg(feature = "bert")]
pub use bert::{BertEmbedder, DEFAULT_MODEL_ID};

#[cfg(feature = "bert")]
mod bert {
    use super::EmbeddingProvider;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use candle_core::{Device, Tensor};
    use candle_nn::VarBuilder;
    use candle_transformers::models::bert::{BertModel, Config, DTYPE};
    use hf_hub::{api::sync::ApiBuilder, Repo, RepoType};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokenizers::{PaddingParams, Tokenizer};

    pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/paraphrase-MiniLM-L6-v2";

    struct Inner {
        model: BertModel,
        tokenizer: Tokenizer,
        device: Device,
        hidden_size: usize,
    }

    pub struct BertEmbedder {
        inner: Arc<Inner>,
    }

    impl BertEmbedder {
        /// Download (or reuse from `cache_dir`) and load a BERT sentence model.
        pub fn new(model_id: &str, cache_dir: PathBuf) -> Result<Self> {
            let device = Device::Cpu;

            let api = ApiBuilder::new()
                .with_cache_dir(cache_dir)
                .build()
                .map_err(|e| anyhow!("Failed to init HF API: {}", e))?;
            let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

            let config_filename = repo
                .get("config.json")
                .map_err(|e| anyhow!("Failed to get config: {}", e))?;
            let tokenizer_filename = repo
                .get("tokenizer.json")
                .map_err(|e| anyhow!("Failed to get tokenizer: {}", e))?;
            let weights_filename = repo
                .get("model.safetensors")
                .map_err(|e| anyhow!("Failed to get weights: {}", e))?;

            let raw_config = std::fs::read_to_string(config_filename)?;
            let config: Config = serde_json::from_str(&raw_config)?;
            let hidden_size = serde_json::from_str::<serde_json::Value>(&raw_config)?["hidden_size"]
                .as_u64()
                .unwrap_or(super::DEFAULT_DIMENSIONS as u64) as usize;
            let mut tokenizer = Tokenizer::from_file(tokenizer_filename).map_err(|e| anyhow!(e))?;
            let padding = PaddingParams {
                strategy: tokenizers::PaddingStrategy::BatchLongest,
                ..Default::default()
            };
            tokenizer.with_padding(Some(padding));

            let vb = unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)?
            };
            let model = BertModel::load(vb, &config)?;

            Ok(Self {
                inner: Arc::new(Inner {
                    model,
                    tokenizer,
                    device,
                    hidden_size,
                }),
            })
        }
    }

    impl Inner {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let tokens = self.tokenizer.encode(text, true).map_err(|e| anyhow!(e))?;
            let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
            let token_type_ids = token_ids.zeros_like()?;

            let embeddings = self.model.forward(&token_ids, &token_type_ids, None)?;

            // Mean pooling
            let (_n_sentence, n_tokens, _hidden_size) = embeddings.dims3()?;
            let embeddings = (embeddings.sum(1)? / (n_tokens as f64))?;
            let embeddings = embeddings.squeeze(0)?;

            let norm = embeddings.sqr()?.sum_all()?.sqrt()?;
            let embeddings = embeddings.broadcast_div(&norm)?;

            Ok(embeddings.to_vec1()?)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for BertEmbedder {
        fn name(&self) -> &str {
            "bert"
        }

        fn dimensions(&self) -> usize {
            self.inner.hidden_size
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let inner = Arc::clone(&self.inner);
            let text = text.to_string();
            tokio::task::spawn_blocking(move || inner.embed(&text)).await?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hashing_embedder_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("Qual a previsão do tempo?").await.unwrap();
        let b = embedder.embed("Qual a previsão do tempo?").await.unwrap();

        assert_eq!(a.len(), DEFAULT_DIMENSIONS);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_related_text_scores_higher() {
        let embedder = HashingEmbedder::default();
        let question = embedder.embed("previsão do tempo para hoje").await.unwrap();
        let related = embedder.embed("a previsão do tempo é de sol").await.unwrap();
        let unrelated = embedder.embed("obrigado pela ajuda").await.unwrap();

        assert!(cosine_similarity(&question, &related) > cosine_similarity(&question, &unrelated));
    }

    #[test]
    fn test_empty_text_embeds_to_zero() {
        let embedder = HashingEmbedder::new(16);
        assert!(embedder.embed_sync("  ").iter().all(|x| *x == 0.0));
        assert_eq!(cosine_similarity(&[0.0; 4], &[1.0; 4]), 0.0);
    }
}
