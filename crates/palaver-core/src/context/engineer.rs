//! History selection under a token budget.
//!
//! The most recent [`RECENT_KEEP`] messages always survive so the agent keeps
//! immediate continuity. Older messages are taken newest-first while they fit
//! the budget; the first one that would overflow ends the walk, so the kept
//! window stays contiguous (a tool call is never separated from the messages
//! that follow it). Dropped messages are not summarized here -- that is the
//! compactor's job.

use palaver_types::config::SessionConfig;
use palaver_types::message::Message;

use super::tokens::estimate_tokens;

/// Number of trailing messages kept regardless of budget.
pub const RECENT_KEEP: usize = 4;

/// Select a chronological suffix of `messages` that fits `budget`.
///
/// The last [`RECENT_KEEP`] messages are always included and do not count
/// against the budget. The estimated tokens of the older messages included
/// never exceed `budget`.
pub fn select_within_budget(messages: &[Message], budget: usize) -> Vec<Message> {
    if messages.len() <= RECENT_KEEP {
        return messages.to_vec();
    }

    let split = messages.len() - RECENT_KEEP;
    let mut used = 0usize;
    let mut start = split;

    for (index, message) in messages[..split].iter().enumerate().rev() {
        let cost = estimate_tokens(message);
        if used + cost > budget {
            break;
        }
        used += cost;
        start = index;
    }

    if start > 0 {
        tracing::debug!(
            dropped = start,
            kept = messages.len() - start,
            used_tokens = used,
            budget,
            "context engineering dropped older messages"
        );
    }

    messages[start..].to_vec()
}

/// Shape loaded history for an agent according to the session config.
///
/// Histories at or below `engineer_above` messages are returned untouched.
pub fn shape_history(messages: Vec<Message>, config: &SessionConfig) -> Vec<Message> {
    if messages.len() > config.engineer_above {
        select_within_budget(&messages, config.load_budget_tokens)
    } else {
        messages
    }
}
