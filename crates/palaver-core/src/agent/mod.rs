//! Conversational agent ports.
//!
//! The core never talks to a model provider directly. It drives an `Agent`
//! bound to one channel's history and asks an `AgentFactory` for a fresh one
//! whenever a channel session is created.

pub mod handle;

pub use handle::{Agent, AgentDyn, AgentFactory, BoxAgent};
