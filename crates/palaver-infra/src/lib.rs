//! Infrastructure layer for Palaver.
//!
//! Contains implementations of the ports defined in `palaver-core`: the JSONL
//! session store, plus config loading and data directory layout.

pub mod config;
pub mod filesystem;
pub mod session;
