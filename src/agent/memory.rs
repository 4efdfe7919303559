use crate::models::Interaction;
use crate::store::KvStore;
use anyhow::{anyhow, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_SESSION_KEY: &str = "jarvis_memory";
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Persisted, bounded log of one session's interactions.
///
/// The whole log lives under a single key as a JSON array of
/// `{"user", "agent"}` pairs. A missing or failing store degrades every
/// operation to empty/no-op with a warning.
///
/// `save_interaction` is a read-modify-write without locking: two writers on
/// the same key can lose updates (last write wins). Keep one writer per
/// session.
pub struct SessionMemory {
    store: Option<Arc<dyn KvStore>>,
    session_key: String,
    timeout: Duration,
}

impl SessionMemory {
    pub fn new(store: Arc<dyn KvStore>, session_key: impl Into<String>) -> Self {
        let session_key = session_key.into();
        info!(
            "🧠 Session memory on '{}' store, key '{}'",
            store.name(),
            session_key
        );
        Self {
            store: Some(store),
            session_key,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Memory with no reachable store.
    pub fn detached(session_key: impl Into<String>) -> Self {
        Self {
            store: None,
            session_key: session_key.into(),
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| anyhow!("store call timed out after {:?}", self.timeout))?
    }

    /// Oldest-first history; empty when nothing is stored or the store fails.
    pub async fn load_history(&self) -> Vec<Interaction> {
        let Some(store) = &self.store else {
            warn!("Session store not initialized, history unavailable");
            return Vec::new();
        };

        self.read_log(store).await.unwrap_or_else(|e| {
            warn!("Failed to load history: {:#}", e);
            Vec::new()
        })
    }

    /// Stored log, or an error when it cannot be read or decoded.
    async fn read_log(&self, store: &Arc<dyn KvStore>) -> Result<Vec<Interaction>> {
        match self.bounded(store.get(&self.session_key)).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                anyhow!("stored history under '{}' is unreadable: {}", self.session_key, e)
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Append one interaction and keep only the most recent `limit` entries.
    ///
    /// When the current log cannot be read, nothing is written so the stored
    /// history is left intact.
    pub async fn save_interaction(&self, user_input: &str, agent_response: &str, limit: usize) {
        let Some(store) = &self.store else {
            warn!("Session store not initialized, interaction not saved");
            return;
        };

        let mut history = match self.read_log(store).await {
            Ok(history) => history,
            Err(e) => {
                warn!("Interaction not saved, history unreadable: {:#}", e);
                return;
            }
        };
        history.push(Interaction::new(user_input, agent_response));
        if history.len() > limit {
            let excess = history.len() - limit;
            history.drain(0..excess);
        }

        let payload = match serde_json::to_vec(&history) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize history: {}", e);
                return;
            }
        };

        match self.bounded(store.set(&self.session_key, &payload)).await {
            Ok(()) => debug!("Interaction saved, history now holds {} entries", history.len()),
            Err(e) => warn!("Failed to save history: {:#}", e),
        }
    }

    /// Remove the whole log. False when the store is missing or fails.
    pub async fn clear_history(&self) -> bool {
        let Some(store) = &self.store else {
            warn!("Session store not initialized, history not cleared");
            return false;
        };

        match self.bounded(store.delete(&self.session_key)).await {
            Ok(removed) => {
                info!("🧹 History cleared ({} entries removed)", removed);
                true
            }
            Err(e) => {
                warn!("Failed to clear history: {:#}", e);
                false
            }
        }
    }

    pub async fn size(&self) -> usize {
        self.load_history().await.len()
    }
}
