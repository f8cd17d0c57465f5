//! Threshold-triggered compaction of a channel's session log.
//!
//! Once a log holds more than `threshold` records, everything except the last
//! `keep` records is folded into one synthetic summary message and the log is
//! rewritten as `[summary, ..recent]`. The agent bound to the channel is then
//! re-hydrated from the rewritten log so memory and disk agree.

use std::sync::Arc;

use palaver_types::config::SessionConfig;
use palaver_types::error::SessionError;
use palaver_types::message::Message;
use tracing::{info, warn};

use super::store::{LoadMode, SessionStore};
use super::summary::ConversationSummarizer;
use crate::agent::BoxAgent;

/// When to compact and how much to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionPolicy {
    pub threshold: usize,
    pub keep: usize,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            threshold: 20,
            keep: 8,
        }
    }
}

impl CompactionPolicy {
    /// `keep` is held below `threshold` so a compaction always folds at
    /// least one record.
    pub fn new(threshold: usize, keep: usize) -> Self {
        Self {
            threshold,
            keep: keep.min(threshold.saturating_sub(1)),
        }
    }
}

impl From<&SessionConfig> for CompactionPolicy {
    fn from(config: &SessionConfig) -> Self {
        Self::new(config.compaction_threshold, config.compaction_keep)
    }
}

/// What a compaction attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// Log at or below threshold; nothing written.
    Skipped { count: usize },
    /// Log rewritten from `before` to `after` records.
    Compacted { before: usize, after: usize },
    /// Compaction failed; the log keeps its previous content.
    Failed,
}

impl CompactionOutcome {
    /// Record count after the attempt, when known.
    pub fn count(&self) -> Option<usize> {
        match self {
            CompactionOutcome::Skipped { count } => Some(*count),
            CompactionOutcome::Compacted { after, .. } => Some(*after),
            CompactionOutcome::Failed => None,
        }
    }
}

/// Compacts session logs held in a [`SessionStore`].
pub struct Compactor<S> {
    store: Arc<S>,
    policy: CompactionPolicy,
}

impl<S: SessionStore> Compactor<S> {
    pub fn new(store: Arc<S>, policy: CompactionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> CompactionPolicy {
        self.policy
    }

    /// Compact the log on disk only.
    ///
    /// The new content is assembled in memory and handed to
    /// [`SessionStore::rewrite`], which replaces the log atomically.
    pub async fn compact_log(&self, channel_id: &str) -> Result<CompactionOutcome, SessionError> {
        let records = self.store.load(channel_id, LoadMode::Raw).await?;
        if records.len() <= self.policy.threshold {
            return Ok(CompactionOutcome::Skipped {
                count: records.len(),
            });
        }

        let (older, recent) =
            ConversationSummarizer::select_messages_to_compact(&records, self.policy.keep);
        if older.is_empty() {
            return Ok(CompactionOutcome::Skipped {
                count: records.len(),
            });
        }
        let summary = Message::compaction_summary(ConversationSummarizer::summarize(older));

        let mut rewritten = Vec::with_capacity(recent.len() + 1);
        rewritten.push(summary);
        rewritten.extend_from_slice(recent);

        self.store.rewrite(channel_id, &rewritten).await?;

        info!(
            channel_id,
            before = records.len(),
            after = rewritten.len(),
            summarized = older.len(),
            "compacted session log"
        );

        Ok(CompactionOutcome::Compacted {
            before: records.len(),
            after: rewritten.len(),
        })
    }

    /// Compact the log if it is over threshold and re-hydrate `agent` from it.
    ///
    /// Never fails: errors are logged and reported as
    /// [`CompactionOutcome::Failed`].
    #[tracing::instrument(name = "compact_session", skip(self, agent))]
    pub async fn compact_if_needed(&self, channel_id: &str, agent: &BoxAgent) -> CompactionOutcome {
        match self.compact_log(channel_id).await {
            Ok(outcome @ CompactionOutcome::Compacted { .. }) => {
                match self.store.load(channel_id, LoadMode::Engineered).await {
                    Ok(history) => agent.replace_messages(history),
                    Err(err) => {
                        warn!(channel_id, error = %err, "failed to reload compacted session");
                    }
                }
                outcome
            }
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(channel_id, error = %err, "session compaction failed, keeping log as is");
                CompactionOutcome::Failed
            }
        }
    }
}
