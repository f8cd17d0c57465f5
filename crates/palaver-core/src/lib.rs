//! Channel session management for Palaver.
//!
//! This crate defines the session core of the bot: per-channel sessions, the
//! context engineering and compaction that keep their history bounded, the
//! tool relevance filter, and the request dispatcher that serializes work per
//! channel. It also defines the "ports" (`SessionStore`, `Agent`, `Tool`,
//! `AgentFactory`) that the infrastructure layer and the surrounding command
//! layer implement. It depends only on `palaver-types` -- never on
//! `palaver-infra` or any filesystem crate.

pub mod agent;
pub mod context;
pub mod dispatch;
pub mod session;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;
