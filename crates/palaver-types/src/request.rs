//! Inbound chat requests and their replies.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user message addressed to the bot in some channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundRequest {
    pub id: Uuid,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub working_dir: PathBuf,
    pub received_at: DateTime<Utc>,
}

impl InboundRequest {
    pub fn new(
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let channel_id = channel_id.into();
        let user_id = user_id.into();
        Self {
            id: Uuid::now_v7(),
            channel_name: channel_id.clone(),
            user_name: user_id.clone(),
            channel_id,
            user_id,
            text: text.into(),
            working_dir: PathBuf::from("."),
            received_at: Utc::now(),
        }
    }

    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = name.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }
}

/// Result of servicing one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    pub request_id: Uuid,
    /// Text of the final assistant message produced by the turn.
    pub text: String,
    /// Model identifier the agent was bound to.
    pub model: String,
    /// Number of messages the turn appended to the session log.
    pub persisted: usize,
    /// Whether the session log was compacted after this turn.
    pub compacted: bool,
}
