//! Tool port and per-turn tool selection.
//!
//! - `tool` -- `Tool` trait and the `BoxTool` dynamic-dispatch wrapper
//! - `keywords` -- hand-maintained keyword table per tool name
//! - `relevance` -- `RelevanceFilter`, which narrows the catalog for one turn

pub mod keywords;
pub mod relevance;
pub mod tool;

pub use keywords::KeywordTable;
pub use relevance::{filter_tools, RelevanceFilter, ScoredTool, CORE_TOOLS, MAX_SELECTED};
pub use tool::{BoxTool, Tool, ToolDyn};
