//! Knowledge source documents and their merge rules.
//!
//! A document looks like
//! `{"intencoes": {name: {"padroes": [..], "respostas": [..]}}, "entidades": {name: [..]}}`
//! and may be wrapped in a top-level `"content"` key.

use crate::error::KnowledgeError;
use crate::models::Intent;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const WRAPPER_KEY: &str = "content";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    #[serde(rename = "intencoes", default)]
    pub intents: IndexMap<String, RawIntent>,
    #[serde(rename = "entidades", default)]
    pub entities: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawIntent {
    #[serde(rename = "padroes", default)]
    pub patterns: Vec<String>,
    #[serde(rename = "respostas", default)]
    pub responses: Vec<String>,
}

/// Intents and entities merged across every source, in load order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergedKnowledge {
    #[serde(rename = "intencoes")]
    pub intents: IndexMap<String, Intent>,
    #[serde(rename = "entidades")]
    pub entities: IndexMap<String, IndexSet<String>>,
}

impl MergedKnowledge {
    pub fn merge(&mut self, document: KnowledgeDocument) {
        for (name, raw) in document.intents {
            self.intents
                .entry(name)
                .or_default()
                .extend(raw.patterns, raw.responses);
        }
        for (name, values) in document.entities {
            self.entities.entry(name).or_default().extend(values);
        }
    }
}

/// Read one source, unwrapping the optional `content` wrapper.
pub fn read_document(path: &Path) -> Result<KnowledgeDocument, KnowledgeError> {
    if !path.is_file() {
        return Err(KnowledgeError::SourceNotFound(path.to_path_buf()));
    }

    let raw = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&raw).map_err(|source| KnowledgeError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_document(raw: &str) -> Result<KnowledgeDocument, serde_json::Error> {
    let mut value: serde_json::Value = serde_json::from_str(raw)?;
    let unwrapped = value.get_mut(WRAPPER_KEY).map(serde_json::Value::take);
    if let Some(inner) = unwrapped {
        value = inner;
    }
    serde_json::from_value(value)
}

/// Load and merge every source. Any unreadable source aborts the whole load.
pub fn load_sources<P: AsRef<Path>>(sources: &[P]) -> Result<MergedKnowledge, KnowledgeError> {
    let documents = sources
        .iter()
        .map(|p| read_document(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut merged = MergedKnowledge::default();
    for (document, path) in documents.into_iter().zip(sources) {
        debug!(
            "Merging {} intents from {}",
            document.intents.len(),
            path.as_ref().display()
        );
        merged.merge(document);
    }
    Ok(merged)
}
