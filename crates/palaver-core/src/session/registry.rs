//! Live channel sessions.
//!
//! `ChannelRegistry` maps a channel id to its `ChannelSession`: the agent
//! bound to that channel's history, the cached record count of its log, and
//! the run slot plus pending queue that serialize work on the channel. The
//! registry is process state only; a session is rebuilt from the store on
//! the first request after a restart.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use palaver_types::agent::{AgentEvent, AgentSpec, ModelConfig};
use palaver_types::config::PalaverConfig;
use palaver_types::error::{AgentError, DispatchError, SessionError};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::store::{LoadMode, SessionStore};
use crate::agent::{AgentFactory, BoxAgent};
use crate::dispatch::dispatcher::PendingRequest;
use crate::dispatch::queue::{Admission, ChannelState, DispatchQueue};
use crate::tools::{BoxTool, RelevanceFilter};

/// Point-in-time view of a channel session.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub channel_id: String,
    pub channel_name: String,
    #[serde(serialize_with = "serialize_state")]
    pub state: ChannelState,
    pub cached_message_count: usize,
    pub model: String,
}

fn serialize_state<S: serde::Serializer>(state: &ChannelState, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(state)
}

/// One channel's live conversation.
pub struct ChannelSession {
    channel_id: String,
    channel_name: String,
    working_dir: PathBuf,
    agent: BoxAgent,
    model: ModelConfig,
    tools: Arc<[BoxTool]>,
    cached_message_count: AtomicUsize,
    closed: AtomicBool,
    queue: Mutex<DispatchQueue<PendingRequest>>,
}

impl ChannelSession {
    fn new(
        spec: &AgentSpec,
        agent: BoxAgent,
        tools: Arc<[BoxTool]>,
        message_count: usize,
        max_pending: usize,
    ) -> Self {
        Self {
            channel_id: spec.channel_id.clone(),
            channel_name: spec.channel_name.clone(),
            working_dir: spec.working_dir.clone(),
            agent,
            model: spec.model.clone(),
            tools,
            cached_message_count: AtomicUsize::new(message_count),
            closed: AtomicBool::new(false),
            queue: Mutex::new(DispatchQueue::new(max_pending)),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn agent(&self) -> &BoxAgent {
        &self.agent
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Full tool catalog this session was bound with.
    pub fn tools(&self) -> &[BoxTool] {
        &self.tools
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.agent.subscribe()
    }

    /// Records in the persisted log as last observed by this process.
    pub fn cached_message_count(&self) -> usize {
        self.cached_message_count.load(Ordering::Acquire)
    }

    pub fn set_cached_message_count(&self, count: usize) {
        self.cached_message_count.store(count, Ordering::Release);
    }

    pub fn add_cached_messages(&self, added: usize) -> usize {
        self.cached_message_count.fetch_add(added, Ordering::AcqRel) + added
    }

    /// Whether the session was reset or shut down. A closed session no
    /// longer writes to the store.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn queue(&self) -> MutexGuard<'_, DispatchQueue<PendingRequest>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the run slot or join the queue.
    pub fn admit(&self, request: PendingRequest) -> Admission<PendingRequest> {
        self.queue().admit(request)
    }

    /// Release the run slot, or hand it to the next queued request.
    pub fn complete(&self) -> Option<PendingRequest> {
        self.queue().complete()
    }

    pub fn state(&self) -> ChannelState {
        self.queue().state()
    }

    pub fn snapshot(&self) -> ChannelStatus {
        ChannelStatus {
            channel_id: self.channel_id.clone(),
            channel_name: self.channel_name.clone(),
            state: self.state(),
            cached_message_count: self.cached_message_count(),
            model: self.model.to_string(),
        }
    }

    /// Remove all queued requests, failing each with `reason`.
    pub fn drain_pending(&self, reason: impl Fn() -> DispatchError) -> usize {
        let drained = self.queue().drain();
        let count = drained.len();
        for pending in drained {
            pending.fail(reason());
        }
        count
    }

    fn close(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        self.agent.abort();
        self.drain_pending(|| DispatchError::ChannelReset)
    }
}

impl std::fmt::Debug for ChannelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSession")
            .field("channel_id", &self.channel_id)
            .field("model", &self.model)
            .field("state", &self.state())
            .finish()
    }
}

/// Channel id -> live session map.
pub struct ChannelRegistry<S, F> {
    store: Arc<S>,
    factory: F,
    tools: Arc<[BoxTool]>,
    filter: RelevanceFilter,
    model: ModelConfig,
    max_pending: usize,
    sessions: DashMap<String, Arc<ChannelSession>>,
}

impl<S: SessionStore, F: AgentFactory> ChannelRegistry<S, F> {
    pub fn new(store: Arc<S>, factory: F, tools: Vec<BoxTool>, config: &PalaverConfig) -> Self {
        Self {
            store,
            factory,
            tools: tools.into(),
            filter: RelevanceFilter::default(),
            model: config.model.clone(),
            max_pending: config.queue.max_pending,
            sessions: DashMap::new(),
        }
    }

    pub fn with_filter(mut self, filter: RelevanceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn filter(&self) -> &RelevanceFilter {
        &self.filter
    }

    pub fn tools(&self) -> &[BoxTool] {
        &self.tools
    }

    /// Prepare the store and report catalog tools the filter cannot score.
    pub async fn init(&self) -> Result<(), SessionError> {
        self.store.prepare().await?;

        let unscored = self
            .filter
            .table()
            .unscored(self.tools.iter().map(BoxTool::name));
        if !unscored.is_empty() {
            warn!(
                count = unscored.len(),
                tools = %unscored.join(", "),
                "tools without relevance keywords are only offered as defaults"
            );
        }
        info!(tools = self.tools.len(), model = %self.model, "channel registry ready");
        Ok(())
    }

    /// Existing session for `channel_id`, or a new one hydrated from the store.
    ///
    /// Concurrent first requests for one channel may each build an agent;
    /// the first one inserted is kept and the rest are dropped.
    #[tracing::instrument(name = "load_session", skip(self, working_dir, channel_name))]
    pub async fn get_or_create(
        &self,
        channel_id: &str,
        working_dir: &Path,
        channel_name: &str,
    ) -> Result<Arc<ChannelSession>, AgentError> {
        if let Some(session) = self.get(channel_id) {
            return Ok(session);
        }

        let history = match self.store.load(channel_id, LoadMode::Engineered).await {
            Ok(history) => history,
            Err(err) => {
                warn!(channel_id, error = %err, "failed to load session, starting empty");
                Vec::new()
            }
        };
        let message_count = match self.store.count(channel_id).await {
            Ok(count) => count,
            Err(err) => {
                warn!(channel_id, error = %err, "failed to count session records");
                history.len()
            }
        };

        let spec = AgentSpec {
            channel_id: channel_id.to_string(),
            channel_name: channel_name.to_string(),
            working_dir: working_dir.to_path_buf(),
            model: self.model.clone(),
            history,
        };
        let hydrated = spec.history.len();
        let agent = self.factory.create(spec.clone(), self.tools.to_vec())?;
        let session = Arc::new(ChannelSession::new(
            &spec,
            agent,
            Arc::clone(&self.tools),
            message_count,
            self.max_pending,
        ));

        let entry = self
            .sessions
            .entry(channel_id.to_string())
            .or_insert(session);
        info!(channel_id, hydrated, message_count, "channel session created");
        Ok(Arc::clone(entry.value()))
    }

    pub fn get(&self, channel_id: &str) -> Option<Arc<ChannelSession>> {
        self.sessions
            .get(channel_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the channel's session and delete its log.
    ///
    /// Queued requests fail with `DispatchError::ChannelReset`. Returns
    /// whether a live session existed.
    pub async fn reset(&self, channel_id: &str) -> Result<bool, SessionError> {
        let removed = self.sessions.remove(channel_id);
        if let Some((_, session)) = &removed {
            let dropped = session.close();
            info!(channel_id, dropped, "channel session reset");
        }
        self.store.clear(channel_id).await?;
        Ok(removed.is_some())
    }

    /// Abort every agent and drop every session. Logs are kept.
    pub fn shutdown(&self) {
        let mut dropped = 0;
        for entry in self.sessions.iter() {
            dropped += entry.value().close();
        }
        let sessions = self.sessions.len();
        self.sessions.clear();
        info!(sessions, dropped, "channel registry shut down");
    }

    pub fn snapshots(&self) -> Vec<ChannelStatus> {
        let mut snapshots: Vec<ChannelStatus> = self
            .sessions
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use palaver_types::message::Message;

    use super::*;
    use crate::session::store::MemorySessionStore;
    use crate::testing::{Behavior, FaultyStore, NamedTool, ScriptedFactory};

    fn registry(
        store: Arc<MemorySessionStore>,
        factory: ScriptedFactory,
    ) -> ChannelRegistry<MemorySessionStore, ScriptedFactory> {
        let tools = vec![
            BoxTool::new(NamedTool::new("bash")),
            BoxTool::new(NamedTool::new("lottery_oracle")),
        ];
        ChannelRegistry::new(store, factory, tools, &PalaverConfig::default())
    }

    #[tokio::test]
    async fn test_miss_hydrates_from_store() {
        let store = Arc::new(MemorySessionStore::default());
        let history: Vec<Message> = (0..3).map(|i| Message::user(format!("m{i}"))).collect();
        store.append_batch("c1", &history).await.unwrap();
        let factory = ScriptedFactory::new(Behavior::Echo);
        let registry = registry(Arc::clone(&store), factory.clone());

        let session = registry
            .get_or_create("c1", Path::new("/tmp"), "general")
            .await
            .unwrap();

        assert_eq!(session.cached_message_count(), 3);
        assert_eq!(session.agent().messages(), history);
        assert_eq!(session.state(), ChannelState::Idle);
        assert_eq!(session.channel_name(), "general");
        assert_eq!(*factory.histories.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_unreadable_log_starts_empty() {
        let store = Arc::new(FaultyStore::unreadable());
        store
            .inner
            .append_batch("c1", &[Message::user("lost"), Message::assistant("gone")])
            .await
            .unwrap();
        let factory = ScriptedFactory::new(Behavior::Echo);
        let registry = ChannelRegistry::new(
            Arc::clone(&store),
            factory.clone(),
            vec![BoxTool::new(NamedTool::new("bash"))],
            &PalaverConfig::default(),
        );

        let session = registry
            .get_or_create("c1", Path::new("."), "c1")
            .await
            .unwrap();

        assert!(session.agent().messages().is_empty());
        assert_eq!(session.cached_message_count(), 0);
        assert_eq!(*factory.histories.lock().unwrap(), vec![0]);
        assert!(registry.get("c1").is_some());
    }

    #[tokio::test]
    async fn test_hit_returns_same_session() {
        let store = Arc::new(MemorySessionStore::default());
        let factory = ScriptedFactory::new(Behavior::Echo);
        let registry = registry(store, factory.clone());

        let first = registry.get_or_create("c1", Path::new("."), "c1").await.unwrap();
        let second = registry.get_or_create("c1", Path::new("."), "c1").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_long_history_is_engineered_on_load() {
        let store = Arc::new(MemorySessionStore::new(palaver_types::config::SessionConfig {
            load_budget_tokens: 0,
            ..Default::default()
        }));
        let history: Vec<Message> = (0..12).map(|i| Message::user(format!("m{i}"))).collect();
        store.append_batch("c1", &history).await.unwrap();
        let registry = registry(Arc::clone(&store), ScriptedFactory::new(Behavior::Echo));

        let session = registry.get_or_create("c1", Path::new("."), "c1").await.unwrap();
        assert_eq!(session.agent().messages().len(), 4);
        assert_eq!(session.cached_message_count(), 12);
    }

    #[tokio::test]
    async fn test_reset_clears_log_and_session() {
        let store = Arc::new(MemorySessionStore::default());
        store.append("c1", &Message::user("hi")).await.unwrap();
        let factory = ScriptedFactory::new(Behavior::Echo);
        let registry = registry(Arc::clone(&store), factory.clone());
        let session = registry.get_or_create("c1", Path::new("."), "c1").await.unwrap();

        assert!(registry.reset("c1").await.unwrap());
        assert!(session.is_closed());
        assert!(registry.get("c1").is_none());
        assert_eq!(store.count("c1").await.unwrap(), 0);
        assert_eq!(factory.aborts.load(Ordering::SeqCst), 1);

        // Resetting an unknown channel still clears its log.
        assert!(!registry.reset("c2").await.unwrap());
    }

    #[tokio::test]
    async fn test_shutdown_drops_all_sessions() {
        let store = Arc::new(MemorySessionStore::default());
        let registry = registry(store, ScriptedFactory::new(Behavior::Echo));
        registry.get_or_create("c1", Path::new("."), "c1").await.unwrap();
        registry.get_or_create("c2", Path::new("."), "c2").await.unwrap();

        assert_eq!(registry.snapshots().len(), 2);
        registry.shutdown();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_reports_state() {
        let store = Arc::new(MemorySessionStore::default());
        let registry = registry(store, ScriptedFactory::new(Behavior::Echo));
        registry.init().await.unwrap();
        let session = registry.get_or_create("c1", Path::new("."), "c1").await.unwrap();

        let status = session.snapshot();
        assert_eq!(status.state, ChannelState::Idle);
        assert_eq!(status.model, "anthropic/claude-sonnet-4-5");

        session.set_cached_message_count(4);
        assert_eq!(session.add_cached_messages(2), 6);
        assert_eq!(session.snapshot().cached_message_count, 6);
    }
}
