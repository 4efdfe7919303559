use crate::agent::fallback::{
    ChatCompletionConfig, ChatCompletionResponder, FallbackResponder, PlaceholderResponder,
};
use crate::agent::memory::SessionMemory;
use crate::config::{Config, EmbeddingBackend, MemoryBackend};
use crate::error::{InputError, KnowledgeError};
use crate::knowledge::KnowledgeBase;
use crate::models::{Interaction, IntentPrediction};
use crate::nlp::{EmbeddingProvider, HashingEmbedder, IntentClassifier, ResponseReranker};
use crate::store::{InMemoryStore, KvStore, SqliteStore};
use crate::tools::ToolManager;
use crate::utils::{memory_db_path, normalize, validate_input};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables of the cascade.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub confidence_threshold: f32,
    pub similarity_threshold: f32,
    /// Size of the in-process context window.
    pub context_limit: usize,
    /// Size of the persisted session log.
    pub history_limit: usize,
    pub apology: String,
    pub max_input_chars: usize,
    pub fallback_timeout: Duration,
    pub persist_path: Option<PathBuf>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ResolverSettings {
    fn from(config: &Config) -> Self {
        Self {
            confidence_threshold: config.nlp.confidence_threshold,
            similarity_threshold: config.resolver.similarity_threshold,
            context_limit: config.resolver.context_limit,
            history_limit: config.memory.limit,
            apology: config.resolver.apology.clone(),
            max_input_chars: config.resolver.max_input_chars,
            fallback_timeout: Duration::from_secs(config.resolver.fallback_timeout_seconds),
            persist_path: config.knowledge.persist_path.clone(),
        }
    }
}

/// Which stage of the cascade produced the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPath {
    /// Confident classifier prediction for the named intent.
    Intent(String),
    /// Nearest known pattern.
    Pattern(String),
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub response: String,
    pub path: ResolutionPath,
}

/// Turns user text into a reply: classifier, then pattern similarity, then
/// the fallback responder. Every turn is recorded in the context window and
/// the session log.
pub struct ResponseResolver {
    knowledge: Arc<KnowledgeBase>,
    classifier: Arc<IntentClassifier>,
    reranker: ResponseReranker,
    memory: SessionMemory,
    fallback: Arc<dyn FallbackResponder>,
    tools: ToolManager,
    rng: Mutex<StdRng>,
    context: Mutex<VecDeque<Interaction>>,
    settings: ResolverSettings,
}

impl std::fmt::Debug for ResponseResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseResolver")
            .field("intents", &self.knowledge.intent_count())
            .field("classifier_ready", &self.classifier.is_ready())
            .field("reranker_ready", &self.reranker.is_ready())
            .field("memory", &self.memory.session_key())
            .field("fallback", &self.fallback.name())
            .field("settings", &self.settings)
            .finish()
    }
}

pub struct ResolverBuilder {
    knowledge: Arc<KnowledgeBase>,
    classifier: Option<Arc<IntentClassifier>>,
    reranker: Option<ResponseReranker>,
    memory: Option<SessionMemory>,
    fallback: Option<Arc<dyn FallbackResponder>>,
    tools: Option<ToolManager>,
    rng: Option<StdRng>,
    settings: ResolverSettings,
}

impl ResolverBuilder {
    pub fn classifier(mut self, classifier: Arc<IntentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn reranker(mut self, reranker: ResponseReranker) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn memory(mut self, memory: SessionMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn fallback(mut self, fallback: Arc<dyn FallbackResponder>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn tools(mut self, tools: ToolManager) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Randomness used when reranking gives no preference.
    pub fn rng(mut self, rng: StdRng) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Assemble the resolver and seed the context window from the session log.
    pub async fn build(self) -> ResponseResolver {
        let memory = self
            .memory
            .unwrap_or_else(|| SessionMemory::detached(crate::agent::memory::DEFAULT_SESSION_KEY));

        let history = memory.load_history().await;
        let skip = history.len().saturating_sub(self.settings.context_limit);
        let context: VecDeque<Interaction> = history.into_iter().skip(skip).collect();
        debug!("Context window seeded with {} interactions", context.len());

        ResponseResolver {
            knowledge: self.knowledge,
            classifier: self
                .classifier
                .unwrap_or_else(|| Arc::new(IntentClassifier::unavailable())),
            reranker: self.reranker.unwrap_or_else(ResponseReranker::disabled),
            memory,
            fallback: self.fallback.unwrap_or_else(|| Arc::new(PlaceholderResponder)),
            tools: self.tools.unwrap_or_default(),
            rng: Mutex::new(self.rng.unwrap_or_else(StdRng::from_entropy)),
            context: Mutex::new(context),
            settings: self.settings,
        }
    }
}

impl ResponseResolver {
    pub fn builder(knowledge: Arc<KnowledgeBase>) -> ResolverBuilder {
        ResolverBuilder {
            knowledge,
            classifier: None,
            reranker: None,
            memory: None,
            fallback: None,
            tools: None,
            rng: None,
            settings: ResolverSettings::default(),
        }
    }

    /// Wire every collaborator from configuration.
    ///
    /// Invalid settings and unreadable knowledge sources are fatal. A missing
    /// model or unreachable store only degrades the affected stage.
    pub async fn from_config(config: &Config) -> Result<Self> {
        info!("Initializing Jarvis...");
        config.validate()?;

        let knowledge = Arc::new(KnowledgeBase::load(&config.knowledge.sources)?);

        let classifier = IntentClassifier::from_dir(&config.nlp.model_dir)
            .with_unknown_label(config.nlp.unknown_label.clone());
        if !classifier.is_ready() {
            warn!(
                "⚠️  Intent model not found in {}, classifier disabled",
                config.nlp.model_dir.display()
            );
        }

        let reranker = build_reranker(config)
            .with_timeout(Duration::from_millis(config.reranker.timeout_ms));
        let memory = build_memory(config).await;
        let fallback = build_fallback(config)?;

        Ok(Self::builder(knowledge)
            .classifier(Arc::new(classifier))
            .reranker(reranker)
            .memory(memory)
            .fallback(fallback)
            .settings(ResolverSettings::from(config))
            .build()
            .await)
    }

    /// Resolve one turn. Always produces a reply.
    pub async fn resolve(&self, text: &str) -> String {
        self.resolve_detailed(text).await.response
    }

    pub async fn resolve_detailed(&self, text: &str) -> Resolution {
        let normalized = normalize(text);
        debug!("Resolving: {}", normalized);

        let resolution = match self.answer_from_knowledge(&normalized).await {
            Some(resolution) => resolution,
            None => Resolution {
                response: self.ask_fallback(&normalized).await,
                path: ResolutionPath::Fallback,
            },
        };

        self.record(text.trim(), &resolution.response).await;
        resolution
    }

    async fn answer_from_knowledge(&self, normalized: &str) -> Option<Resolution> {
        if let Some(prediction) = self
            .classifier
            .predict(normalized, self.settings.confidence_threshold)
        {
            let candidates = self.knowledge.find_responses(&prediction.intent);
            if let Some(response) = self.pick(normalized, &candidates).await {
                info!("🎯 Answered from intent {}", prediction);
                return Some(Resolution {
                    response,
                    path: ResolutionPath::Intent(prediction.intent),
                });
            }
            debug!("Intent '{}' has no responses", prediction.intent);
        }

        let pattern = self
            .knowledge
            .find_most_similar_pattern(normalized, self.settings.similarity_threshold)?;
        let candidates = self.knowledge.responses_for_pattern(&pattern);
        let response = self.pick(normalized, &candidates).await?;
        info!("🔎 Answered from similar pattern '{}'", pattern);
        Some(Resolution {
            response,
            path: ResolutionPath::Pattern(pattern),
        })
    }

    /// Reranked best candidate, or a random one when reranking has no answer.
    async fn pick(&self, question: &str, candidates: &[String]) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        if let Some(best) = self.reranker.rank_best(question, candidates).await {
            return Some(best);
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        candidates.choose(&mut *rng).cloned()
    }

    async fn ask_fallback(&self, normalized: &str) -> String {
        let context = self.context();
        let reply = tokio::time::timeout(
            self.settings.fallback_timeout,
            self.fallback.respond(normalized, &context),
        )
        .await;

        match reply {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("Fallback '{}' failed: {:#}", self.fallback.name(), e);
                self.settings.apology.clone()
            }
            Err(_) => {
                warn!(
                    "Fallback '{}' timed out after {:?}",
                    self.fallback.name(),
                    self.settings.fallback_timeout
                );
                self.settings.apology.clone()
            }
        }
    }

    async fn record(&self, user_input: &str, agent_response: &str) {
        {
            let mut context = self.context.lock().unwrap_or_else(|e| e.into_inner());
            context.push_back(Interaction::new(user_input, agent_response));
            while context.len() > self.settings.context_limit {
                context.pop_front();
            }
        }
        self.memory
            .save_interaction(user_input, agent_response, self.settings.history_limit)
            .await;
    }

    /// Caller-facing entry: rejects empty or oversized input before resolving.
    pub async fn respond(&self, raw: &str) -> Result<String, InputError> {
        let text = validate_input(raw, self.settings.max_input_chars)?;
        Ok(self.resolve(&text).await)
    }

    pub async fn run_side_command(&self, command: &str, params: Value) -> String {
        self.tools.run_command(command, params).await
    }

    pub fn available_commands(&self) -> Vec<String> {
        self.tools.available_commands()
    }

    /// Snapshot of the context window, oldest first.
    pub fn context(&self) -> Vec<Interaction> {
        let context = self.context.lock().unwrap_or_else(|e| e.into_inner());
        context.iter().cloned().collect()
    }

    /// Drop both the session log and the context window.
    pub async fn clear_history(&self) -> bool {
        self.context
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.memory.clear_history().await
    }

    pub async fn history_size(&self) -> usize {
        self.memory.size().await
    }

    pub fn predict_all(&self, text: &str) -> Vec<IntentPrediction> {
        self.classifier.predict_all(text)
    }

    /// Write the knowledge base to the configured path, or its first source.
    pub fn persist_knowledge(&self) -> Result<PathBuf, KnowledgeError> {
        self.knowledge.persist(self.settings.persist_path.as_deref())
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    pub fn fallback_status(&self) -> Value {
        self.fallback.status()
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }
}

fn build_reranker(config: &Config) -> ResponseReranker {
    if !config.reranker.enabled {
        info!("Reranker disabled by configuration");
        return ResponseReranker::disabled();
    }

    let provider: Option<Arc<dyn EmbeddingProvider>> = match config.reranker.provider {
        EmbeddingBackend::Hashing => Some(Arc::new(HashingEmbedder::default())),
        EmbeddingBackend::Bert => bert_provider(config),
    };

    match provider {
        Some(provider) => ResponseReranker::new(provider),
        None => ResponseReranker::disabled(),
    }
}

#[cfg(feature = "bert")]
fn bert_provider(config: &Config) -> Option<Arc<dyn EmbeddingProvider>> {
    let cache_dir = match crate::utils::embedding_cache_dir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!("No data directory for embedding models: {:#}", e);
            return None;
        }
    };
    match crate::nlp::BertEmbedder::new(&config.reranker.model_id, cache_dir) {
        Ok(embedder) => Some(Arc::new(embedder)),
        Err(e) => {
            warn!("⚠️  Failed to load embedding model: {:#}", e);
            None
        }
    }
}

#[cfg(not(feature = "bert"))]
fn bert_provider(config: &Config) -> Option<Arc<dyn EmbeddingProvider>> {
    warn!(
        "Embedding model '{}' requested but jarvis was built without the `bert` feature",
        config.reranker.model_id
    );
    None
}

async fn build_memory(config: &Config) -> SessionMemory {
    let timeout = Duration::from_millis(config.memory.timeout_ms);
    let key = config.memory.session_key.clone();

    let store: Result<Arc<dyn KvStore>> = match config.memory.backend {
        MemoryBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        MemoryBackend::Sqlite => match sqlite_url(config) {
            Ok(url) => SqliteStore::connect(&url)
                .await
                .map(|s| Arc::new(s) as Arc<dyn KvStore>),
            Err(e) => Err(e),
        },
    };

    match store {
        Ok(store) => SessionMemory::new(store, key).with_timeout(timeout),
        Err(e) => {
            warn!("⚠️  Session store unavailable, history disabled: {:#}", e);
            SessionMemory::detached(key).with_timeout(timeout)
        }
    }
}

fn sqlite_url(config: &Config) -> Result<String> {
    if let Some(url) = &config.memory.url {
        return Ok(url.clone());
    }
    Ok(memory_db_path()?.to_string_lossy().into_owned())
}

fn build_fallback(config: &Config) -> Result<Arc<dyn FallbackResponder>> {
    if !config.llm.enabled {
        return Ok(Arc::new(PlaceholderResponder));
    }

    let responder = ChatCompletionResponder::new(ChatCompletionConfig {
        base_url: config.llm.base_url.clone(),
        model: config.llm.model.clone(),
        api_key: config.llm.api_key.clone(),
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
        timeout_seconds: config.llm.timeout_seconds,
        system_prompt: config.llm.system_prompt.clone(),
    })?;
    info!("✅ Fallback LLM: {} via {}", config.llm.model, config.llm.base_url);
    Ok(Arc::new(responder))
}
