//! JSONL implementation of `SessionStore`.
//!
//! One file per channel at `{data_dir}/sessions/{safe_channel_id}/session.jsonl`.
//! Each line is a `PersistedRecord`: a message plus the time it was written.
//! Loading is lenient: a bad line is logged and skipped, never fatal, so one
//! corrupt record cannot lock a channel out of its history.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use palaver_core::context::shape_history;
use palaver_core::session::{LoadMode, SessionStore};
use palaver_types::config::SessionConfig;
use palaver_types::error::SessionError;
use palaver_types::message::{Message, MessageRole, PersistedRecord};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;

use crate::filesystem::{channel_dir, session_path, sessions_dir, SESSION_FILE};

/// File-backed session store writing one JSON record per line.
#[derive(Debug, Clone)]
pub struct JsonlSessionStore {
    data_dir: PathBuf,
    config: SessionConfig,
}

impl JsonlSessionStore {
    pub fn new(data_dir: impl Into<PathBuf>, config: SessionConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            config,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn session_path(&self, channel_id: &str) -> PathBuf {
        session_path(&self.data_dir, channel_id)
    }

    /// Serialize messages as stamped JSONL lines, in order.
    fn encode(messages: &[Message]) -> Result<String, SessionError> {
        let mut buf = String::new();
        for message in messages {
            push_record(&mut buf, PersistedRecord::stamped(message.clone()))?;
        }
        Ok(buf)
    }

    /// Like [`Self::encode`], but messages that end the current log
    /// unchanged keep their original timestamps.
    fn encode_preserving(
        messages: &[Message],
        existing: &[(Message, Option<DateTime<Utc>>)],
    ) -> Result<String, SessionError> {
        let mut stamps = vec![None; messages.len()];
        for ((slot, message), (old, stamp)) in stamps
            .iter_mut()
            .zip(messages)
            .rev()
            .zip(existing.iter().rev())
        {
            if message != old {
                break;
            }
            *slot = *stamp;
        }

        let mut buf = String::new();
        for (message, stamp) in messages.iter().zip(stamps) {
            let record = match stamp {
                Some(timestamp) => PersistedRecord {
                    message: message.clone(),
                    timestamp,
                },
                None => PersistedRecord::stamped(message.clone()),
            };
            push_record(&mut buf, record)?;
        }
        Ok(buf)
    }

    async fn append_encoded(&self, channel_id: &str, encoded: &str) -> Result<(), SessionError> {
        tokio::fs::create_dir_all(channel_dir(&self.data_dir, channel_id)).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.session_path(channel_id))
            .await?;
        file.write_all(encoded.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_records(&self, channel_id: &str) -> Result<Vec<Message>, SessionError> {
        Ok(self
            .read_stamped(channel_id)
            .await?
            .into_iter()
            .map(|(message, _)| message)
            .collect())
    }

    async fn read_stamped(
        &self,
        channel_id: &str,
    ) -> Result<Vec<(Message, Option<DateTime<Utc>>)>, SessionError> {
        let path = self.session_path(channel_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut messages = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_stamped(line) {
                Ok(record) => messages.push(record),
                Err(err) => {
                    tracing::warn!(
                        channel_id,
                        line = index + 1,
                        error = %err,
                        "skipping session record"
                    );
                }
            }
        }
        Ok(messages)
    }
}

fn push_record(buf: &mut String, record: PersistedRecord) -> Result<(), SessionError> {
    buf.push_str(&serde_json::to_string(&record)?);
    buf.push('\n');
    Ok(())
}

/// Parse one log line into a message.
///
/// The timestamp is dropped. String content is normalized into a single text
/// part; null, absent, or otherwise non-array content is rejected, as is any
/// role outside `user | assistant | toolResult`.
pub fn parse_record(line: &str) -> Result<Message, SessionError> {
    parse_stamped(line).map(|(message, _)| message)
}

/// [`parse_record`] that also returns the write time, when it parses.
fn parse_stamped(line: &str) -> Result<(Message, Option<DateTime<Utc>>), SessionError> {
    let mut value: Value = serde_json::from_str(line)?;
    let record = value
        .as_object_mut()
        .ok_or_else(|| SessionError::InvalidRecord("record is not an object".to_string()))?;

    let timestamp = record
        .remove("timestamp")
        .and_then(|ts| serde_json::from_value::<DateTime<Utc>>(ts).ok());

    let role = record.get("role").and_then(Value::as_str).unwrap_or_default();
    role.parse::<MessageRole>()
        .map_err(SessionError::InvalidRecord)?;

    match record.get("content") {
        None | Some(Value::Null) => {
            return Err(SessionError::InvalidRecord("missing content".to_string()));
        }
        Some(Value::String(text)) => {
            let part = json!([{ "type": "text", "text": text }]);
            record.insert("content".to_string(), part);
        }
        Some(Value::Array(_)) => {}
        Some(other) => {
            return Err(SessionError::InvalidRecord(format!(
                "content is not an array: {other}"
            )));
        }
    }

    Ok((serde_json::from_value(value)?, timestamp))
}

impl SessionStore for JsonlSessionStore {
    async fn prepare(&self) -> Result<(), SessionError> {
        tokio::fs::create_dir_all(sessions_dir(&self.data_dir)).await?;
        Ok(())
    }

    async fn append(&self, channel_id: &str, message: &Message) -> Result<(), SessionError> {
        let encoded = Self::encode(std::slice::from_ref(message))?;
        self.append_encoded(channel_id, &encoded).await
    }

    async fn append_batch(&self, channel_id: &str, messages: &[Message]) -> Result<(), SessionError> {
        if messages.is_empty() {
            return Ok(());
        }
        let encoded = Self::encode(messages)?;
        self.append_encoded(channel_id, &encoded).await?;
        tracing::debug!(channel_id, count = messages.len(), "appended session records");
        Ok(())
    }

    #[tracing::instrument(name = "load_session_log", skip(self))]
    async fn load(&self, channel_id: &str, mode: LoadMode) -> Result<Vec<Message>, SessionError> {
        let messages = self.read_records(channel_id).await?;
        Ok(match mode {
            LoadMode::Raw => messages,
            LoadMode::Engineered => shape_history(messages, &self.config),
        })
    }

    async fn count(&self, channel_id: &str) -> Result<usize, SessionError> {
        Ok(self.read_records(channel_id).await?.len())
    }

    async fn rewrite(&self, channel_id: &str, messages: &[Message]) -> Result<(), SessionError> {
        let existing = self.read_stamped(channel_id).await.unwrap_or_else(|err| {
            tracing::warn!(channel_id, error = %err, "could not read log before rewrite");
            Vec::new()
        });
        let encoded = Self::encode_preserving(messages, &existing)?;
        let path = self.session_path(channel_id);
        let tmp_path = path.with_extension("jsonl.tmp");

        tokio::fs::create_dir_all(channel_dir(&self.data_dir, channel_id)).await?;
        tokio::fs::write(&tmp_path, encoded.as_bytes()).await?;
        if let Err(err) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn clear(&self, channel_id: &str) -> Result<(), SessionError> {
        match tokio::fs::remove_dir_all(channel_dir(&self.data_dir, channel_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_channels(&self) -> Result<Vec<String>, SessionError> {
        let mut entries = match tokio::fs::read_dir(sessions_dir(&self.data_dir)).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut channels = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let has_log = tokio::fs::try_exists(entry.path().join(SESSION_FILE))
                .await
                .unwrap_or(false);
            if has_log {
                channels.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        channels.sort();
        Ok(channels)
    }
}
