use crate::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub knowledge: KnowledgeConfig,
    pub nlp: NlpConfig,
    pub resolver: ResolverConfig,
    pub memory: MemoryConfig,
    pub reranker: RerankerConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub sources: Vec<PathBuf>,
    /// Where administrative changes are written; first source when unset.
    pub persist_path: Option<PathBuf>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            sources: vec![PathBuf::from("data/knowledge_data.json")],
            persist_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NlpConfig {
    pub model_dir: PathBuf,
    pub confidence_threshold: f32,
    pub unknown_label: String,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            confidence_threshold: 0.6,
            unknown_label: crate::models::UNKNOWN_INTENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub similarity_threshold: f32,
    pub context_limit: usize,
    pub apology: String,
    pub max_input_chars: usize,
    pub fallback_timeout_seconds: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            context_limit: 50,
            apology: "Desculpe, não consegui processar sua solicitação.".to_string(),
            max_input_chars: 2000,
            fallback_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub backend: MemoryBackend,
    /// SQLite url or file path; defaults to `memory.db` in the data directory.
    pub url: Option<String>,
    pub session_key: String,
    pub limit: usize,
    pub timeout_ms: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackend::Sqlite,
            url: None,
            session_key: crate::agent::memory::DEFAULT_SESSION_KEY.to_string(),
            limit: crate::agent::memory::DEFAULT_HISTORY_LIMIT,
            timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Hashing,
    Bert,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    pub enabled: bool,
    pub provider: EmbeddingBackend,
    pub model_id: String,
    pub timeout_ms: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: EmbeddingBackend::Hashing,
            model_id: "sentence-transformers/paraphrase-MiniLM-L6-v2".to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "anthropic/claude-3.5-haiku".to_string(),
            api_key: None,
            max_tokens: 500,
            temperature: 0.7,
            timeout_seconds: 30,
            system_prompt: Some(
                "Você é o Jarvis, um assistente prestativo. Responda em português.".to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Try to load from config file, otherwise use defaults
        let config_path = std::env::current_dir()?.join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(sources) = std::env::var("JARVIS_KNOWLEDGE_SOURCES") {
            self.knowledge.sources = sources
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
        }
        if let Ok(path) = std::env::var("KNOWLEDGE_BASE_PATH") {
            if self.knowledge.sources.is_empty() && !path.trim().is_empty() {
                self.knowledge.sources.push(PathBuf::from(path.trim()));
            }
        }
        if let Ok(dir) = std::env::var("JARVIS_MODEL_DIR") {
            self.nlp.model_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("JARVIS_MEMORY_URL") {
            self.memory.url = Some(url);
        }
        if let Ok(key) = std::env::var("JARVIS_SESSION_KEY") {
            self.memory.session_key = key;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
    }

    /// Reject settings the engine cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.knowledge.sources.is_empty() {
            return Err(ConfigError::MissingSetting("knowledge.sources"));
        }
        check_unit("nlp.confidence_threshold", self.nlp.confidence_threshold)?;
        check_unit("resolver.similarity_threshold", self.resolver.similarity_threshold)?;
        check_positive("resolver.context_limit", self.resolver.context_limit)?;
        check_positive("resolver.max_input_chars", self.resolver.max_input_chars)?;
        check_positive("memory.limit", self.memory.limit)?;
        if self.memory.session_key.trim().is_empty() {
            return Err(ConfigError::MissingSetting("memory.session_key"));
        }
        if self.llm.enabled && self.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(ConfigError::MissingSetting("llm.api_key"));
        }
        Ok(())
    }

    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::INFO)
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        })
    }
}

fn check_positive(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [resolver]
            similarity_threshold = 0.4

            [memory]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.resolver.similarity_threshold, 0.4);
        assert_eq!(config.resolver.context_limit, 50);
        assert_eq!(config.memory.backend, MemoryBackend::Memory);
        assert_eq!(config.nlp.confidence_threshold, 0.6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::default();
        config.knowledge.sources.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSetting("knowledge.sources"))
        ));

        let mut config = Config::default();
        config.nlp.confidence_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut config = Config::default();
        config.llm.enabled = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSetting("llm.api_key"))
        ));
    }

    #[test]
    fn test_log_level_parsing() {
        let mut config = Config::default();
        config.logging.level = "debug".to_string();
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
        config.logging.level = "nonsense".to_string();
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }
}
