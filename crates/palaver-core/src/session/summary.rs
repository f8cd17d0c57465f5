//! Conversation summarizer for log compaction.
//!
//! `ConversationSummarizer` condenses the oldest part of a channel's history
//! into a short, deterministic text block. It makes no model calls: the
//! summary is a count of who said what plus a handful of topic snippets taken
//! from the user's own messages.

use palaver_types::message::{ContentPart, Message, MessageRole};

/// Header line of every compaction summary.
pub const SUMMARY_HEADER: &str = "[Conversation summary]";

/// Maximum number of topic snippets in a summary.
const MAX_TOPICS: usize = 5;

/// Maximum characters per topic snippet.
const MAX_TOPIC_CHARS: usize = 100;

/// Stateless utility for summarizing compacted history.
pub struct ConversationSummarizer;

impl ConversationSummarizer {
    /// Summarize a set of messages into a plain-text block.
    ///
    /// ```text
    /// [Conversation summary]
    /// Previous conversation: 12 user messages, 9 assistant responses.
    /// Topics discussed: deploy the bot | fix the cron job
    /// ```
    ///
    /// The topics line is omitted when no user message yields a snippet.
    pub fn summarize(messages: &[Message]) -> String {
        let user_count = messages.iter().filter(|m| m.is_user_input()).count();
        let assistant_count = messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();

        let mut summary = format!(
            "{SUMMARY_HEADER}\nPrevious conversation: {user_count} user messages, {assistant_count} assistant responses."
        );

        let topics = Self::topics(messages);
        if !topics.is_empty() {
            summary.push_str("\nTopics discussed: ");
            summary.push_str(&topics.join(" | "));
        }

        summary
    }

    /// Up to five distinct first-line snippets from user text parts.
    ///
    /// Text that opens with `[` is a bracketed system marker (an earlier
    /// summary, an attachment notice) and is skipped.
    pub fn topics(messages: &[Message]) -> Vec<String> {
        let mut topics: Vec<String> = Vec::new();

        let user_texts = messages
            .iter()
            .filter(|m| m.is_user_input())
            .flat_map(|m| m.content.iter())
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            });

        for text in user_texts {
            let first_line = text.lines().next().unwrap_or("").trim();
            if first_line.is_empty() || first_line.starts_with('[') {
                continue;
            }

            let snippet: String = first_line.chars().take(MAX_TOPIC_CHARS).collect();
            if !topics.contains(&snippet) {
                topics.push(snippet);
            }
            if topics.len() == MAX_TOPICS {
                break;
            }
        }

        topics
    }

    /// Split messages into two slices: those to compact, and those to keep.
    ///
    /// Returns `(to_compact, to_keep)` where `to_keep` contains the most
    /// recent `keep_recent` messages and `to_compact` everything before them.
    pub fn select_messages_to_compact(
        messages: &[Message],
        keep_recent: usize,
    ) -> (&[Message], &[Message]) {
        if messages.len() <= keep_recent {
            (&[], messages)
        } else {
            messages.split_at(messages.len() - keep_recent)
        }
    }
}
