//! Per-turn tool relevance filter.
//!
//! The bot carries far more tools than a model handles well in one request.
//! `RelevanceFilter` scores each catalog tool against the user's input and
//! keeps at most [`MAX_SELECTED`] of them:
//!
//! - core tools are always selected with [`CORE_WEIGHT`]
//! - other tools need a keyword match (score > 0)
//! - when fewer than [`MIN_SCORED`] tools score, the general-purpose default
//!   set is added with weight 1
//! - ties keep catalog order

use std::sync::Arc;

use super::keywords::KeywordTable;
use super::tool::BoxTool;

/// Tools offered on every turn.
pub const CORE_TOOLS: &[&str] = &["read", "write", "edit", "bash"];

/// General-purpose tools added when the input matches too little.
pub const DEFAULT_TOOLS: &[&str] = &["read", "write", "edit", "bash", "web_search", "web_fetch", "memory_search"];

/// Upper bound on tools offered per turn.
pub const MAX_SELECTED: usize = 25;

/// Score forced onto core tools so they sort first.
pub const CORE_WEIGHT: u32 = 80;

/// Below this many scored tools the default set is mixed in.
pub const MIN_SCORED: usize = 5;

/// A catalog entry that made the cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredTool {
    /// Position in the catalog that was scored.
    pub index: usize,
    pub name: String,
    pub score: u32,
}

/// Keyword-driven tool selector. Cheap to clone; the table is shared.
#[derive(Debug, Clone, Default)]
pub struct RelevanceFilter {
    table: Arc<KeywordTable>,
}

impl RelevanceFilter {
    pub fn new(table: KeywordTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Score catalog names against `input` and return the selection, best first.
    pub fn score<'a>(&self, input: &str, names: impl IntoIterator<Item = &'a str>) -> Vec<ScoredTool> {
        let input_lower = input.to_lowercase();
        let names: Vec<&str> = names.into_iter().collect();

        let mut scored: Vec<ScoredTool> = names
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                let score = if CORE_TOOLS.contains(name) {
                    CORE_WEIGHT
                } else {
                    self.table.score(name, &input_lower)
                };
                (score > 0).then(|| ScoredTool {
                    index,
                    name: name.to_string(),
                    score,
                })
            })
            .collect();

        if scored.len() < MIN_SCORED {
            for (index, name) in names.iter().enumerate() {
                if DEFAULT_TOOLS.contains(name) && !scored.iter().any(|s| s.index == index) {
                    scored.push(ScoredTool {
                        index,
                        name: name.to_string(),
                        score: 1,
                    });
                }
            }
        }

        scored.sort_by(|a, b| b.score.cmp(&a.score).then(a.index.cmp(&b.index)));
        scored.truncate(MAX_SELECTED);
        scored
    }

    /// Select the tools relevant to `input` from `tools`.
    pub fn filter(&self, input: &str, tools: &[BoxTool]) -> Vec<BoxTool> {
        let selected = self.score(input, tools.iter().map(BoxTool::name));
        tracing::debug!(
            catalog = tools.len(),
            selected = selected.len(),
            "filtered tools by relevance"
        );
        selected
            .into_iter()
            .map(|s| tools[s.index].clone())
            .collect()
    }
}

/// [`RelevanceFilter::filter`] with the built-in keyword table.
pub fn filter_tools(input: &str, tools: &[BoxTool]) -> Vec<BoxTool> {
    RelevanceFilter::default().filter(input, tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NamedTool;

    fn catalog(names: &[&str]) -> Vec<BoxTool> {
        names.iter().map(|n| BoxTool::new(NamedTool::new(n))).collect()
    }

    fn full_catalog() -> Vec<BoxTool> {
        let table = KeywordTable::builtin();
        let mut names = table.tool_names();
        names.extend(["extra_1", "extra_2"]);
        catalog(&names)
    }

    fn names(tools: &[BoxTool]) -> Vec<&str> {
        tools.iter().map(BoxTool::name).collect()
    }

    #[test]
    fn test_npm_install_selects_bash_and_core() {
        let filter = RelevanceFilter::default();
        let selected = filter.filter("please run bash npm install", &full_catalog());
        let selected_names = names(&selected);

        for core in CORE_TOOLS {
            assert!(selected_names.contains(core), "missing core tool {core}");
        }
        assert!(selected.len() <= MAX_SELECTED);
        // Core tools lead the list.
        assert!(selected_names[..4].iter().all(|n| CORE_TOOLS.contains(n)));
    }

    #[test]
    fn test_core_always_present_for_any_input() {
        let filter = RelevanceFilter::default();
        let tools = full_catalog();
        for input in ["", "   ", "🙂", "bitcoin price music image video weather calendar github"] {
            let selected = filter.filter(input, &tools);
            let selected_names = names(&selected);
            for core in CORE_TOOLS {
                assert!(selected_names.contains(core));
            }
            assert!(selected.len() <= MAX_SELECTED);
        }
    }

    #[test]
    fn test_fallback_adds_defaults_with_weight_one() {
        let filter = RelevanceFilter::default();
        let scored = filter.score("", ["read", "write", "edit", "bash", "web_search", "weather"]);

        let web = scored.iter().find(|s| s.name == "web_search").unwrap();
        assert_eq!(web.score, 1);
        assert!(scored.iter().all(|s| s.name != "weather"));
    }

    #[test]
    fn test_no_fallback_when_enough_scored() {
        let filter = RelevanceFilter::default();
        let scored = filter.score(
            "check the weather forecast and bitcoin price",
            ["read", "write", "edit", "bash", "weather", "crypto_price", "web_search"],
        );
        assert!(scored.iter().all(|s| s.name != "web_search"));
        assert!(scored.iter().any(|s| s.name == "weather"));
        assert!(scored.iter().any(|s| s.name == "crypto_price"));
    }

    #[test]
    fn test_multiword_phrases_rank_higher() {
        let table = KeywordTable::new([
            ("single", vec!["song"]),
            ("multi", vec!["compose a song"]),
        ]);
        let filter = RelevanceFilter::new(table);
        let scored = filter.score("compose a song for me", ["single", "multi"]);
        assert_eq!(scored[0].name, "multi");
        assert_eq!(scored[0].score, 3);
        assert_eq!(scored[1].score, 1);
    }

    #[test]
    fn test_selection_capped() {
        let many: Vec<String> = (0..40).map(|i| format!("tool_{i}")).collect();
        let table = KeywordTable::new(many.iter().map(|n| (n.clone(), vec!["go"])));
        let filter = RelevanceFilter::new(table);

        let scored = filter.score("go", many.iter().map(String::as_str));
        assert_eq!(scored.len(), MAX_SELECTED);
        assert_eq!(scored[0].name, "tool_0");
    }

    #[test]
    fn test_filter_tools_leaves_catalog_untouched() {
        let tools = full_catalog();
        let before = names(&tools).len();
        let selected = filter_tools("what's the weather", &tools);
        assert_eq!(names(&tools).len(), before);
        assert!(names(&selected).contains(&"weather"));
    }

    #[test]
    fn test_unknown_tool_never_selected() {
        let filter = RelevanceFilter::default();
        let scored = filter.score("lottery", ["read", "lottery_oracle"]);
        assert!(scored.iter().all(|s| s.name != "lottery_oracle"));
    }
}
