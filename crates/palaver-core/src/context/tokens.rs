//! Token estimation for conversation messages.
//!
//! Exact counting would need the provider's tokenizer. The serialized JSON
//! length over four is close enough for budgeting and costs nothing.

use palaver_types::message::Message;

/// Estimate returned when a message cannot be serialized.
pub const FALLBACK_TOKENS: usize = 100;

/// Rough token cost of one message: `ceil(serialized_len / 4)`.
pub fn estimate_tokens(message: &Message) -> usize {
    match serde_json::to_string(message) {
        Ok(serialized) => serialized.len().div_ceil(4),
        Err(_) => FALLBACK_TOKENS,
    }
}

/// Sum of [`estimate_tokens`] over a slice.
pub fn estimate_total(messages: &[Message]) -> usize {
    messages.iter().map(estimate_tokens).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_rounds_up() {
        let msg = Message::user("hello");
        let len = serde_json::to_string(&msg).unwrap().len();
        assert_eq!(estimate_tokens(&msg), len.div_ceil(4));
        assert!(estimate_tokens(&msg) * 4 >= len);
    }

    #[test]
    fn test_longer_messages_cost_more() {
        let short = Message::user("hi");
        let long = Message::user("x".repeat(4000));
        assert!(estimate_tokens(&long) > estimate_tokens(&short));
        assert!(estimate_tokens(&long) >= 1000);
    }

    #[test]
    fn test_estimate_total() {
        let messages = vec![Message::user("a"), Message::assistant("b")];
        assert_eq!(
            estimate_total(&messages),
            estimate_tokens(&messages[0]) + estimate_tokens(&messages[1])
        );
        assert_eq!(estimate_total(&[]), 0);
    }
}
