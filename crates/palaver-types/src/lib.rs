//! Shared domain types for Palaver.
//!
//! This crate contains the data shapes shared across the Palaver workspace:
//! conversation messages, tool outputs, inbound requests, configuration, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod agent;
pub mod config;
pub mod error;
pub mod message;
pub mod request;
pub mod tool;
