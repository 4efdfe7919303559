use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading or persisting knowledge sources.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("knowledge source not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("failed to read knowledge source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid knowledge document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to persist knowledge to {path}: {reason}")]
    Persist { path: PathBuf, reason: String },
}

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting '{0}' is missing or empty")]
    MissingSetting(&'static str),
    #[error("setting '{name}' has invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Rejections of malformed caller input, raised before the cascade runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("text must not be empty")]
    Empty,
    #[error("text exceeds maximum length of {0} characters")]
    TooLong(usize),
}
