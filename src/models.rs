use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label the classifier uses for "no confident prediction".
pub const UNKNOWN_INTENT: &str = "desconhecido";

/// One conversational turn. Serialized as `{"user": .., "agent": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(rename = "user")]
    pub user_input: String,
    #[serde(rename = "agent")]
    pub agent_response: String,
}

impl Interaction {
    pub fn new(user_input: impl Into<String>, agent_response: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            agent_response: agent_response.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPrediction {
    pub intent: String,
    pub confidence: f32,
}

impl fmt::Display for IntentPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2})", self.intent, self.confidence)
    }
}

/// A named request category with its example patterns and candidate replies.
///
/// Both sets keep first-seen order and never hold duplicates. Patterns are
/// stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "padroes", default)]
    pub patterns: IndexSet<String>,
    #[serde(rename = "respostas", default)]
    pub responses: IndexSet<String>,
}

impl Intent {
    pub fn new<P, R>(patterns: P, responses: R) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let mut intent = Self::default();
        intent.extend(patterns, responses);
        intent
    }

    /// Append patterns and responses, skipping the ones already present.
    pub fn extend<P, R>(&mut self, patterns: P, responses: R)
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        self.patterns
            .extend(patterns.into_iter().map(|p| p.as_ref().to_lowercase()));
        self.responses.extend(responses.into_iter().map(Into::into));
    }

    pub fn has_responses(&self) -> bool {
        !self.responses.is_empty()
    }
}

/// A chat message in the role/content shape chat-completion APIs expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ModelMetrics {
    pub avg_response_time_ms: u64,
    pub success_rate: f32,
    pub last_error: Option<String>,
    pub total_requests: u64,
    pub successful_requests: u64,
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self {
            avg_response_time_ms: 0,
            success_rate: 1.0,
            last_error: None,
            total_requests: 0,
            successful_requests: 0,
        }
    }
}

impl ModelMetrics {
    pub fn record_success(&mut self, response_time_ms: u64) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.avg_response_time_ms = (self.avg_response_time_ms * (self.successful_requests - 1)
            + response_time_ms)
            / self.successful_requests;
        self.success_rate = self.successful_requests as f32 / self.total_requests as f32;
    }

    pub fn record_failure(&mut self, error: String) {
        self.total_requests += 1;
        self.last_error = Some(error);
        self.success_rate = self.successful_requests as f32 / self.total_requests as f32;
    }
}
