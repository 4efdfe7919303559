use super::source::{self, MergedKnowledge};
use super::tfidf::{cosine_similarity, SparseVector, TfidfVectorizer, DEFAULT_MAX_FEATURES};
use crate::error::KnowledgeError;
use crate::models::Intent;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Flattened patterns plus the vector space fitted over them.
///
/// Built whole and swapped in one step, so readers never see a pattern list
/// that disagrees with the fitted matrix.
#[derive(Debug, Default)]
struct PatternIndex {
    patterns: Vec<String>,
    pattern_to_intent: HashMap<String, String>,
    vectorizer: TfidfVectorizer,
    matrix: Vec<SparseVector>,
}

impl PatternIndex {
    fn build(intents: &IndexMap<String, Intent>) -> Self {
        let mut patterns = Vec::new();
        let mut pattern_to_intent = HashMap::new();
        for (name, intent) in intents {
            for pattern in &intent.patterns {
                patterns.push(pattern.clone());
                pattern_to_intent.insert(pattern.clone(), name.clone());
            }
        }

        let mut vectorizer = TfidfVectorizer::new((1, 2), Some(DEFAULT_MAX_FEATURES));
        let matrix = if patterns.is_empty() {
            Vec::new()
        } else {
            vectorizer.fit_transform(&patterns)
        };

        Self {
            patterns,
            pattern_to_intent,
            vectorizer,
            matrix,
        }
    }

    fn most_similar(&self, text: &str, threshold: f32) -> Option<(usize, f32)> {
        if self.patterns.is_empty() {
            return None;
        }

        let query = self.vectorizer.transform(&text.to_lowercase());
        let mut best: Option<(usize, f32)> = None;
        for (idx, row) in self.matrix.iter().enumerate() {
            let score = cosine_similarity(&query, row);
            // strict comparison keeps the first of equal maxima
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((idx, score));
            }
        }

        best.filter(|(_, score)| *score >= threshold)
    }
}

#[derive(Debug, Default)]
struct KnowledgeState {
    intents: IndexMap<String, Intent>,
    entities: IndexMap<String, IndexSet<String>>,
    index: Arc<PatternIndex>,
}

/// Intent/entity store with exact lookup and nearest-pattern fallback.
///
/// Reads share a lock; `add_intent` and `update_responses` take it
/// exclusively. The pattern index is replaced as a single `Arc`.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    sources: Vec<PathBuf>,
    state: RwLock<KnowledgeState>,
}

impl KnowledgeBase {
    /// Load and merge every source document, in order.
    pub fn load<P: AsRef<Path>>(sources: &[P]) -> Result<Self, KnowledgeError> {
        let merged = source::load_sources(sources)?;
        let kb = Self::from_merged(
            sources.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            merged,
        );
        info!(
            "📚 Knowledge base loaded: {} intents, {} patterns from {} sources",
            kb.intent_count(),
            kb.pattern_count(),
            sources.len()
        );
        Ok(kb)
    }

    /// Build a knowledge base directly from intents, with no backing source.
    pub fn from_intents<I>(intents: I) -> Self
    where
        I: IntoIterator<Item = (String, Intent)>,
    {
        let merged = MergedKnowledge {
            intents: intents.into_iter().collect(),
            entities: IndexMap::new(),
        };
        Self::from_merged(Vec::new(), merged)
    }

    fn from_merged(sources: Vec<PathBuf>, merged: MergedKnowledge) -> Self {
        let index = Arc::new(PatternIndex::build(&merged.intents));
        Self {
            sources,
            state: RwLock::new(KnowledgeState {
                intents: merged.intents,
                entities: merged.entities,
                index,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, KnowledgeState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, KnowledgeState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn find_responses(&self, intent_name: &str) -> Vec<String> {
        self.read()
            .intents
            .get(intent_name)
            .map(|intent| intent.responses.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn find_patterns(&self, intent_name: &str) -> Vec<String> {
        self.read()
            .intents
            .get(intent_name)
            .map(|intent| intent.patterns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Nearest indexed pattern to `text`, if it scores at least `threshold`.
    pub fn find_most_similar_pattern(&self, text: &str, threshold: f32) -> Option<String> {
        let index = Arc::clone(&self.read().index);
        let (idx, score) = index.most_similar(text, threshold)?;
        debug!("Closest pattern '{}' scored {:.3}", index.patterns[idx], score);
        Some(index.patterns[idx].clone())
    }

    pub fn responses_for_pattern(&self, pattern: &str) -> Vec<String> {
        let owner = self.read().index.pattern_to_intent.get(pattern).cloned();
        match owner {
            Some(intent) => self.find_responses(&intent),
            None => Vec::new(),
        }
    }

    /// Insert a new intent. Returns false, changing nothing, if the name exists.
    pub fn add_intent(&self, name: &str, patterns: &[String], responses: &[String]) -> bool {
        let mut state = self.write();
        if state.intents.contains_key(name) {
            return false;
        }

        state
            .intents
            .insert(name.to_string(), Intent::new(patterns, responses.iter().cloned()));
        let index = Arc::new(PatternIndex::build(&state.intents));
        state.index = index;
        info!(
            "➕ Intent '{}' added ({} patterns indexed)",
            name,
            state.index.patterns.len()
        );
        true
    }

    /// Replace an existing intent's responses. False if the intent is unknown.
    pub fn update_responses(&self, name: &str, responses: &[String]) -> bool {
        let mut state = self.write();
        match state.intents.get_mut(name) {
            Some(intent) => {
                intent.responses = responses.iter().cloned().collect();
                true
            }
            None => false,
        }
    }

    /// Serialize every intent and entity to `destination`, or to the first
    /// source when no destination is given.
    pub fn persist(&self, destination: Option<&Path>) -> Result<PathBuf, KnowledgeError> {
        let path = destination
            .map(Path::to_path_buf)
            .or_else(|| self.sources.first().cloned())
            .ok_or_else(|| KnowledgeError::Persist {
                path: PathBuf::new(),
                reason: "no destination and no source to write back to".to_string(),
            })?;

        let document = {
            let state = self.read();
            MergedKnowledge {
                intents: state.intents.clone(),
                entities: state.entities.clone(),
            }
        };
        let json = serde_json::to_string_pretty(&document).map_err(|e| KnowledgeError::Persist {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| KnowledgeError::Persist {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        info!("💾 Knowledge base written to {}", path.display());
        Ok(path)
    }

    pub fn intents(&self) -> IndexMap<String, Intent> {
        self.read().intents.clone()
    }

    pub fn intent_names(&self) -> Vec<String> {
        self.read().intents.keys().cloned().collect()
    }

    pub fn entities(&self) -> IndexMap<String, IndexSet<String>> {
        self.read().entities.clone()
    }

    pub fn all_patterns(&self) -> Vec<String> {
        self.read().index.patterns.clone()
    }

    pub fn intent_count(&self) -> usize {
        self.read().intents.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.read().index.patterns.len()
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}
