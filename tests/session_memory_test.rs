use anyhow::{anyhow, Result};
use async_trait::async_trait;
use jarvis::agent::SessionMemory;
use jarvis::models::Interaction;
use jarvis::store::{InMemoryStore, KvStore, SqliteStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct UnreachableStore;

#[async_trait]
impl KvStore for UnreachableStore {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(anyhow!("connection refused"))
    }

    async fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
        Err(anyhow!("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<u64> {
        Err(anyhow!("connection refused"))
    }
}

struct HangingStore;

#[async_trait]
impl KvStore for HangingStore {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<u64> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(0)
    }
}

/// In-memory store whose next `get` fails once.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryStore,
    fail_next_get: AtomicBool,
}

#[async_trait]
impl KvStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_next_get.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("connection reset"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        self.inner.delete(key).await
    }
}

fn in_memory() -> SessionMemory {
    SessionMemory::new(Arc::new(InMemoryStore::new()), "test_session")
}

#[tokio::test]
async fn test_save_then_load_returns_last_pair() {
    let memory = in_memory();
    assert!(memory.load_history().await.is_empty());

    memory.save_interaction("oi", "Olá!", 50).await;
    memory.save_interaction("tchau", "Até logo!", 50).await;

    let history = memory.load_history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], Interaction::new("oi", "Olá!"));
    assert_eq!(history.last(), Some(&Interaction::new("tchau", "Até logo!")));
    assert_eq!(memory.size().await, 2);
}

#[tokio::test]
async fn test_full_history_evicts_oldest() {
    let memory = in_memory();
    for i in 0..50 {
        memory
            .save_interaction(&format!("pergunta {i}"), &format!("resposta {i}"), 50)
            .await;
    }
    assert_eq!(memory.size().await, 50);

    memory.save_interaction("nova", "resposta nova", 50).await;

    let history = memory.load_history().await;
    assert_eq!(history.len(), 50);
    assert_eq!(history[0].user_input, "pergunta 1");
    assert_eq!(history[49], Interaction::new("nova", "resposta nova"));
}

#[tokio::test]
async fn test_smaller_limit_truncates_existing_log() {
    let memory = in_memory();
    for i in 0..5 {
        memory.save_interaction(&format!("q{i}"), "r", 50).await;
    }
    memory.save_interaction("q5", "r", 3).await;

    let users: Vec<String> = memory
        .load_history()
        .await
        .into_iter()
        .map(|i| i.user_input)
        .collect();
    assert_eq!(users, vec!["q3", "q4", "q5"]);
}

#[tokio::test]
async fn test_clear_history() {
    let memory = in_memory();
    memory.save_interaction("oi", "Olá!", 50).await;

    assert!(memory.clear_history().await);
    assert_eq!(memory.size().await, 0);
    // clearing an empty log still succeeds
    assert!(memory.clear_history().await);
}

#[tokio::test]
async fn test_sessions_are_isolated_by_key() {
    let store: Arc<dyn KvStore> = Arc::new(InMemoryStore::new());
    let alice = SessionMemory::new(Arc::clone(&store), "alice");
    let bob = SessionMemory::new(store, "bob");

    alice.save_interaction("oi", "Olá!", 50).await;
    assert_eq!(alice.size().await, 1);
    assert_eq!(bob.size().await, 0);
}

#[tokio::test]
async fn test_detached_memory_degrades_quietly() {
    let memory = SessionMemory::detached("offline");
    assert!(!memory.is_connected());

    memory.save_interaction("oi", "Olá!", 50).await;
    assert!(memory.load_history().await.is_empty());
    assert_eq!(memory.size().await, 0);
    assert!(!memory.clear_history().await);
}

#[tokio::test]
async fn test_unreachable_store_degrades_quietly() {
    let memory = SessionMemory::new(Arc::new(UnreachableStore), "down");
    assert!(memory.is_connected());

    memory.save_interaction("oi", "Olá!", 50).await;
    assert!(memory.load_history().await.is_empty());
    assert!(!memory.clear_history().await);
}

#[tokio::test]
async fn test_store_timeout_degrades_quietly() {
    let memory = SessionMemory::new(Arc::new(HangingStore), "slow")
        .with_timeout(Duration::from_millis(20));

    assert!(memory.load_history().await.is_empty());
    assert!(!memory.clear_history().await);
}

#[tokio::test]
async fn test_corrupt_payload_reads_as_empty() {
    let store = Arc::new(InMemoryStore::new());
    store.set("broken", b"not json").await.unwrap();

    let memory = SessionMemory::new(store, "broken");
    assert!(memory.load_history().await.is_empty());
}

#[tokio::test]
async fn test_failed_read_keeps_stored_history() {
    let store = Arc::new(FlakyStore::default());
    let memory = SessionMemory::new(Arc::clone(&store) as Arc<dyn KvStore>, "flaky");
    for i in 0..10 {
        memory.save_interaction(&format!("q{i}"), "r", 50).await;
    }

    store.fail_next_get.store(true, Ordering::SeqCst);
    memory.save_interaction("perdida", "r", 50).await;
    assert_eq!(memory.size().await, 10);

    memory.save_interaction("nova", "r", 50).await;
    let history = memory.load_history().await;
    assert_eq!(history.len(), 11);
    assert_eq!(history[0].user_input, "q0");
    assert_eq!(history[10].user_input, "nova");
}

#[tokio::test]
async fn test_corrupt_payload_is_not_overwritten() {
    let store = Arc::new(InMemoryStore::new());
    store.set("broken", b"not json").await.unwrap();

    let memory = SessionMemory::new(Arc::clone(&store) as Arc<dyn KvStore>, "broken");
    memory.save_interaction("oi", "Olá!", 50).await;

    assert_eq!(store.get("broken").await.unwrap().as_deref(), Some(&b"not json"[..]));
}

#[tokio::test]
async fn test_sqlite_history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("memory.db");

    {
        let store = SqliteStore::open(&db).await.unwrap();
        let memory = SessionMemory::new(Arc::new(store), "jarvis_memory");
        memory.save_interaction("bom dia", "Olá!", 50).await;
        memory.save_interaction("tchau", "Até logo!", 50).await;
    }

    let store = SqliteStore::open(&db).await.unwrap();
    let memory = SessionMemory::new(Arc::new(store), "jarvis_memory");
    let history = memory.load_history().await;
    assert_eq!(
        history,
        vec![
            Interaction::new("bom dia", "Olá!"),
            Interaction::new("tchau", "Até logo!"),
        ]
    );

    assert!(memory.clear_history().await);
    assert_eq!(memory.size().await, 0);
}

#[tokio::test]
async fn test_history_payload_uses_user_agent_keys() {
    let store = Arc::new(InMemoryStore::new());
    let memory = SessionMemory::new(Arc::clone(&store) as Arc<dyn KvStore>, "k");
    memory.save_interaction("oi", "Olá!", 50).await;

    let raw = store.get("k").await.unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(value, serde_json::json!([{ "user": "oi", "agent": "Olá!" }]));
}
