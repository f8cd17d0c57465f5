//! Channel sessions: persistence port, compaction, and the live registry.
//!
//! - `store` -- `SessionStore` trait plus an in-memory implementation
//! - `summary` -- deterministic summaries of compacted history
//! - `compactor` -- threshold-triggered log compaction
//! - `registry` -- `ChannelRegistry` mapping channel ids to live sessions

pub mod compactor;
pub mod registry;
pub mod store;
pub mod summary;

pub use compactor::{CompactionOutcome, CompactionPolicy, Compactor};
pub use registry::{ChannelRegistry, ChannelSession, ChannelStatus};
pub use store::{LoadMode, MemorySessionStore, SessionStore};
pub use summary::ConversationSummarizer;
