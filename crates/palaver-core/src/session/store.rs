//! SessionStore trait definition.
//!
//! One append-only log of messages per channel. Implementations live in
//! palaver-infra (e.g., `JsonlSessionStore`); `MemorySessionStore` here backs
//! tests and ephemeral deployments.

use dashmap::DashMap;
use palaver_types::config::SessionConfig;
use palaver_types::error::SessionError;
use palaver_types::message::Message;

use crate::context::engineer::shape_history;

/// How much shaping `load` applies to the persisted history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Every valid record, in order.
    Raw,
    /// Valid records passed through context engineering when the history is
    /// long enough to need it.
    Engineered,
}

/// Repository trait for per-channel message logs.
///
/// A missing log is an empty history, never an error. Uses native async fn in
/// traits (RPITIT, Rust 2024 edition).
pub trait SessionStore: Send + Sync {
    /// Make sure the backing storage exists.
    fn prepare(&self) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;

    /// Append one message, creating the log if absent.
    fn append(
        &self,
        channel_id: &str,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;

    /// Append several messages with a single write, preserving order.
    fn append_batch(
        &self,
        channel_id: &str,
        messages: &[Message],
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;

    /// Read the log back as messages.
    fn load(
        &self,
        channel_id: &str,
        mode: LoadMode,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, SessionError>> + Send;

    /// Number of valid records in the log.
    fn count(
        &self,
        channel_id: &str,
    ) -> impl std::future::Future<Output = Result<usize, SessionError>> + Send;

    /// Replace the whole log. Either the new content lands completely or the
    /// old content stays.
    fn rewrite(
        &self,
        channel_id: &str,
        messages: &[Message],
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;

    /// Delete the log entirely.
    fn clear(
        &self,
        channel_id: &str,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;

    /// Channel ids that currently have a log.
    fn list_channels(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, SessionError>> + Send;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    logs: DashMap<String, Vec<Message>>,
    config: SessionConfig,
}

impl MemorySessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            logs: DashMap::new(),
            config,
        }
    }
}

impl SessionStore for MemorySessionStore {
    async fn prepare(&self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn append(&self, channel_id: &str, message: &Message) -> Result<(), SessionError> {
        self.logs
            .entry(channel_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn append_batch(&self, channel_id: &str, messages: &[Message]) -> Result<(), SessionError> {
        if messages.is_empty() {
            return Ok(());
        }
        self.logs
            .entry(channel_id.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn load(&self, channel_id: &str, mode: LoadMode) -> Result<Vec<Message>, SessionError> {
        let messages = self
            .logs
            .get(channel_id)
            .map(|log| log.value().clone())
            .unwrap_or_default();

        Ok(match mode {
            LoadMode::Raw => messages,
            LoadMode::Engineered => shape_history(messages, &self.config),
        })
    }

    async fn count(&self, channel_id: &str) -> Result<usize, SessionError> {
        Ok(self.logs.get(channel_id).map(|log| log.len()).unwrap_or(0))
    }

    async fn rewrite(&self, channel_id: &str, messages: &[Message]) -> Result<(), SessionError> {
        self.logs.insert(channel_id.to_string(), messages.to_vec());
        Ok(())
    }

    async fn clear(&self, channel_id: &str) -> Result<(), SessionError> {
        self.logs.remove(channel_id);
        Ok(())
    }

    async fn list_channels(&self) -> Result<Vec<String>, SessionError> {
        let mut channels: Vec<String> = self.logs.iter().map(|e| e.key().clone()).collect();
        channels.sort();
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_append_and_load() {
        let store = MemorySessionStore::default();
        store.append("c1", &Message::user("one")).await.unwrap();
        store
            .append_batch("c1", &[Message::assistant("two"), Message::user("three")])
            .await
            .unwrap();

        let loaded = store.load("c1", LoadMode::Raw).await.unwrap();
        let texts: Vec<String> = loaded.iter().map(Message::text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(store.count("c1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_memory_store_missing_channel_is_empty() {
        let store = MemorySessionStore::default();
        assert!(store.load("nope", LoadMode::Engineered).await.unwrap().is_empty());
        assert_eq!(store.count("nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_store_engineered_load_trims() {
        let store = MemorySessionStore::new(SessionConfig {
            load_budget_tokens: 0,
            ..SessionConfig::default()
        });
        let batch: Vec<Message> = (0..10).map(|i| Message::user(format!("m{i}"))).collect();
        store.append_batch("c1", &batch).await.unwrap();

        let shaped = store.load("c1", LoadMode::Engineered).await.unwrap();
        assert_eq!(shaped.len(), 4);
        assert_eq!(shaped[0].text(), "m6");
    }

    #[tokio::test]
    async fn test_memory_store_rewrite_and_clear() {
        let store = MemorySessionStore::default();
        store.append("c1", &Message::user("old")).await.unwrap();
        store.rewrite("c1", &[Message::user("new")]).await.unwrap();
        assert_eq!(store.load("c1", LoadMode::Raw).await.unwrap()[0].text(), "new");

        store.clear("c1").await.unwrap();
        assert!(store.list_channels().await.unwrap().is_empty());
    }
}
