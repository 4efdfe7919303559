//! # Jarvis - conversational response engine
//!
//! Answers free-text input through a cascade: classified intent lookup,
//! lexical pattern matching against the knowledge base, then a generic
//! fallback responder. Every turn is recorded into bounded session memory.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use jarvis::{agent::ResponseResolver, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let resolver = ResponseResolver::from_config(&config).await?;
//!
//!     let response = resolver.resolve("bom dia").await;
//!     println!("Jarvis: {}", response);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod models;
pub mod nlp;
pub mod store;
pub mod tools;
pub mod utils;

// Re-export commonly used types for convenience
pub use agent::{ResponseResolver, SessionMemory};
pub use config::Config;
pub use error::{ConfigError, InputError, KnowledgeError};
pub use knowledge::KnowledgeBase;
pub use models::{Intent, IntentPrediction, Interaction};
pub use nlp::{IntentClassifier, ResponseReranker};
pub use tools::{Tool, ToolManager, ToolResult};
