use crate::knowledge::TfidfVectorizer;
use crate::models::{IntentPrediction, UNKNOWN_INTENT};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

pub const MODEL_FILE: &str = "model.json";
pub const VECTORIZER_FILE: &str = "vectorizer.json";

/// A pretrained text classifier over a fixed label set.
pub trait IntentModel: Send + Sync {
    fn is_ready(&self) -> bool;
    fn labels(&self) -> Vec<String>;
    /// Probability per label for already-normalized text.
    fn predict_distribution(&self, normalized_text: &str) -> Result<Vec<(String, f32)>>;
}

/// Placeholder used when no model could be loaded.
pub struct UnavailableModel;

impl IntentModel for UnavailableModel {
    fn is_ready(&self) -> bool {
        false
    }

    fn labels(&self) -> Vec<String> {
        Vec::new()
    }

    fn predict_distribution(&self, _normalized_text: &str) -> Result<Vec<(String, f32)>> {
        Err(anyhow!("intent model not loaded"))
    }
}

#[derive(Debug, Deserialize)]
struct LinearWeights {
    classes: Vec<String>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
}

/// Multinomial linear classifier over TF-IDF features, exported offline as
/// `vectorizer.json` + `model.json`. Probabilities are a softmax of the
/// per-class linear scores.
pub struct LinearIntentModel {
    vectorizer: TfidfVectorizer,
    weights: LinearWeights,
}

impl LinearIntentModel {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let vectorizer: TfidfVectorizer = read_json(&model_dir.join(VECTORIZER_FILE))?;
        let weights: LinearWeights = read_json(&model_dir.join(MODEL_FILE))?;

        if weights.classes.is_empty() {
            return Err(anyhow!("model has no classes"));
        }
        if weights.coef.len() != weights.classes.len()
            || weights.intercept.len() != weights.classes.len()
        {
            return Err(anyhow!(
                "model shape mismatch: {} classes, {} coef rows, {} intercepts",
                weights.classes.len(),
                weights.coef.len(),
                weights.intercept.len()
            ));
        }
        if let Some(row) = weights
            .coef
            .iter()
            .find(|row| row.len() != vectorizer.vocabulary_size())
        {
            return Err(anyhow!(
                "coef row has {} features but vectorizer has {}",
                row.len(),
                vectorizer.vocabulary_size()
            ));
        }

        Ok(Self {
            vectorizer,
            weights,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

impl IntentModel for LinearIntentModel {
    fn is_ready(&self) -> bool {
        self.vectorizer.is_fitted()
    }

    fn labels(&self) -> Vec<String> {
        self.weights.classes.clone()
    }

    fn predict_distribution(&self, normalized_text: &str) -> Result<Vec<(String, f32)>> {
        let features = self.vectorizer.transform(normalized_text);
        let scores: Vec<f32> = self
            .weights
            .coef
            .iter()
            .zip(&self.weights.intercept)
            .map(|(row, bias)| {
                features
                    .iter()
                    .map(|(idx, w)| row.get(*idx).copied().unwrap_or(0.0) * w)
                    .sum::<f32>()
                    + bias
            })
            .collect();

        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f32 = exp.iter().sum();

        Ok(self
            .weights
            .classes
            .iter()
            .cloned()
            .zip(exp.into_iter().map(|e| e / total))
            .collect())
    }
}

/// Confidence-gated intent detection over a swappable model.
///
/// A model that is missing or fails at prediction time never surfaces an
/// error: the classifier reports "no confident intent" instead.
pub struct IntentClassifier {
    model: RwLock<Arc<dyn IntentModel>>,
    unknown_label: String,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn IntentModel>) -> Self {
        Self {
            model: RwLock::new(model),
            unknown_label: UNKNOWN_INTENT.to_string(),
        }
    }

    pub fn with_unknown_label(mut self, label: impl Into<String>) -> Self {
        self.unknown_label = label.into();
        self
    }

    /// Load a linear model from `model_dir`; an unusable directory yields a
    /// classifier that is simply not ready.
    pub fn from_dir(model_dir: &Path) -> Self {
        Self::new(load_model(model_dir))
    }

    pub fn unavailable() -> Self {
        Self::new(Arc::new(UnavailableModel))
    }

    /// Swap in the model found in `model_dir`. Returns whether it is ready.
    pub fn reload(&self, model_dir: &Path) -> bool {
        let model = load_model(model_dir);
        let ready = model.is_ready();
        *self.model.write().unwrap_or_else(|e| e.into_inner()) = model;
        ready
    }

    fn current(&self) -> Arc<dyn IntentModel> {
        Arc::clone(&self.model.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn is_ready(&self) -> bool {
        self.current().is_ready()
    }

    pub fn is_confident(confidence: f32, threshold: f32) -> bool {
        confidence >= threshold
    }

    pub fn labels(&self) -> Vec<String> {
        self.current().labels()
    }

    /// Top intent for `text` when it clears `confidence_threshold` and is
    /// not the unknown label.
    pub fn predict(&self, text: &str, confidence_threshold: f32) -> Option<IntentPrediction> {
        let best = self.predict_all(text).into_iter().next()?;

        if best.intent == self.unknown_label
            || !Self::is_confident(best.confidence, confidence_threshold)
        {
            debug!(
                "No confident intent: top was {} (threshold {:.2})",
                best, confidence_threshold
            );
            return None;
        }
        Some(best)
    }

    /// Every label with its probability, most likely first.
    pub fn predict_all(&self, text: &str) -> Vec<IntentPrediction> {
        let model = self.current();
        if !model.is_ready() {
            debug!("Intent model not ready");
            return Vec::new();
        }

        let normalized = text.trim().to_lowercase();
        let distribution = match model.predict_distribution(&normalized) {
            Ok(d) => d,
            Err(e) => {
                warn!("Intent prediction failed: {}", e);
                return Vec::new();
            }
        };

        let mut predictions: Vec<IntentPrediction> = distribution
            .into_iter()
            .map(|(intent, confidence)| IntentPrediction { intent, confidence })
            .collect();
        // stable: equal probabilities keep label order
        predictions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        predictions
    }
}

fn load_model(model_dir: &Path) -> Arc<dyn IntentModel> {
    match LinearIntentModel::load(model_dir) {
        Ok(model) => {
            info!(
                "✅ Intent model loaded from {} ({} labels)",
                model_dir.display(),
                model.weights.classes.len()
            );
            Arc::new(model)
        }
        Err(e) => {
            warn!(
                "⚠️  Intent model unavailable at {}: {:#}. Classification disabled.",
                model_dir.display(),
                e
            );
            Arc::new(UnavailableModel)
        }
    }
}
