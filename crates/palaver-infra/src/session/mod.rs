//! Session log persistence.

pub mod jsonl;

pub use jsonl::JsonlSessionStore;
