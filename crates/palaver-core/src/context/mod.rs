//! Context window shaping.
//!
//! - `tokens`: cheap per-message token estimate
//! - `engineer`: recency-preserving history selection under a token budget

pub mod engineer;
pub mod tokens;

pub use engineer::{select_within_budget, shape_history, RECENT_KEEP};
pub use tokens::estimate_tokens;
