//! Keyword table for tool relevance scoring.
//!
//! Each tool name maps to a list of phrases. A phrase that occurs in the
//! lower-cased user input adds its word count to the tool's score, so
//! multi-word phrases outweigh single words. The table is maintained by hand
//! and drifts from the live catalog; `unscored` reports catalog tools it does
//! not cover.

use std::collections::HashMap;

/// Built-in phrases per tool name.
const BUILTIN: &[(&str, &[&str])] = &[
    ("read", &["read", "open file", "show file", "cat", "look at", "contents of"]),
    ("write", &["write", "create file", "save to", "new file", "save file"]),
    ("edit", &["edit", "modify", "change", "replace", "refactor", "fix the"]),
    (
        "bash",
        &[
            "run", "bash", "shell", "terminal", "command", "script", "npm", "pip", "cargo",
            "git", "install package", "execute",
        ],
    ),
    ("grep", &["grep", "search code", "find in files", "occurrences of", "where is"]),
    ("find", &["find file", "locate", "which file", "list files matching"]),
    ("ls", &["list files", "directory", "folder", "ls"]),
    (
        "web_search",
        &["search", "google", "look up", "latest news", "search the web", "what is"],
    ),
    ("web_fetch", &["fetch", "url", "http", "website", "web page", "download page"]),
    (
        "memory_search",
        &["remember", "recall", "what did i say", "last time", "memory"],
    ),
    (
        "memory_save",
        &["remember that", "save to memory", "note that", "don't forget"],
    ),
    (
        "browser",
        &["browser", "click", "navigate to", "fill the form", "log in to", "scrape"],
    ),
    ("screenshot", &["screenshot", "capture the screen", "screen capture"]),
    (
        "image_generate",
        &["image", "picture", "draw", "generate an image", "illustration", "logo"],
    ),
    (
        "music_generate",
        &["music", "song", "melody", "beat", "compose a song", "soundtrack"],
    ),
    ("video_generate", &["video", "animation", "clip", "generate a video"]),
    ("text_to_speech", &["speak", "voice", "read aloud", "text to speech", "tts"]),
    (
        "crypto_price",
        &["price", "bitcoin", "btc", "eth", "crypto", "token price", "market cap"],
    ),
    (
        "trading_signals",
        &["trade", "signal", "long or short", "chart", "rsi", "support and resistance"],
    ),
    (
        "knowledge_base",
        &["knowledge base", "docs", "documentation", "according to our", "wiki"],
    ),
    (
        "schedule",
        &["schedule", "every day", "every hour", "cron", "remind me", "at 9am"],
    ),
    ("github", &["github", "pull request", "issue", "repo", "commit"]),
    (
        "sandbox",
        &["sandbox", "run python", "execute code", "python script", "notebook"],
    ),
    ("translate", &["translate", "in spanish", "in french", "in japanese", "translation"]),
    ("weather", &["weather", "forecast", "temperature", "rain"]),
    ("calendar", &["calendar", "meeting", "event", "appointment", "availability"]),
];

/// Phrase lists keyed by tool name.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    entries: HashMap<String, Vec<String>>,
}

impl KeywordTable {
    /// Build a table from explicit `(tool, phrases)` pairs.
    pub fn new<I, N, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<P>)>,
        N: Into<String>,
        P: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, phrases)| {
                let phrases = phrases
                    .into_iter()
                    .map(|p| p.into().to_lowercase())
                    .collect();
                (name.into(), phrases)
            })
            .collect();
        Self { entries }
    }

    /// The hand-maintained table shipped with the bot.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|(name, phrases)| (*name, phrases.to_vec())),
        )
    }

    /// Weight of a phrase: its word count.
    pub fn weight(phrase: &str) -> u32 {
        phrase.split_whitespace().count() as u32
    }

    /// Score one tool against already lower-cased input.
    pub fn score(&self, tool_name: &str, input_lower: &str) -> u32 {
        self.entries
            .get(tool_name)
            .map(|phrases| {
                phrases
                    .iter()
                    .filter(|phrase| input_lower.contains(phrase.as_str()))
                    .map(|phrase| Self::weight(phrase))
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.entries.contains_key(tool_name)
    }

    pub fn phrases(&self, tool_name: &str) -> Option<&[String]> {
        self.entries.get(tool_name).map(Vec::as_slice)
    }

    /// Tool names in the table, sorted.
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Catalog names that have no keyword entry.
    pub fn unscored<'a>(&self, catalog: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        catalog
            .into_iter()
            .filter(|name| !self.contains(name))
            .collect()
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}
