//! Tool relevance commands: score, keywords.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use palaver_core::tools::{KeywordTable, RelevanceFilter, CORE_TOOLS};

/// Score the built-in catalog against `text` and show the selection.
///
/// ```bash
/// palaver tools score "please run bash npm install"
/// ```
pub fn score_tools(text: &str, json: bool) -> Result<()> {
    let filter = RelevanceFilter::default();
    let names = filter.table().tool_names();
    let scored = filter.score(text, names.iter().copied());

    if json {
        let out: Vec<_> = scored
            .iter()
            .map(|s| serde_json::json!({"name": s.name, "score": s.score}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Tool").fg(Color::White),
        Cell::new("Score").fg(Color::White),
        Cell::new("Why").fg(Color::White),
    ]);

    let lowered = text.to_lowercase();
    for s in &scored {
        let why = if CORE_TOOLS.contains(&s.name.as_str()) {
            "core".to_string()
        } else {
            let matched: Vec<&str> = filter
                .table()
                .phrases(&s.name)
                .unwrap_or_default()
                .iter()
                .map(String::as_str)
                .filter(|phrase| lowered.contains(phrase))
                .collect();
            if matched.is_empty() {
                "default".to_string()
            } else {
                matched.join(", ")
            }
        };
        table.add_row(vec![
            Cell::new(&s.name).fg(Color::Cyan),
            Cell::new(s.score),
            Cell::new(why).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} of {} tools selected",
        style(scored.len()).bold(),
        names.len()
    );
    println!();
    Ok(())
}

/// Print every tool in the built-in keyword table with its phrases.
pub fn list_keywords(json: bool) -> Result<()> {
    let table = KeywordTable::builtin();

    if json {
        let out: serde_json::Map<String, serde_json::Value> = table
            .tool_names()
            .into_iter()
            .map(|name| {
                let phrases = table.phrases(name).unwrap_or_default();
                (name.to_string(), serde_json::json!(phrases))
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut out = Table::new();
    out.load_preset(presets::UTF8_FULL_CONDENSED);
    out.set_content_arrangement(ContentArrangement::Dynamic);
    out.set_header(vec![
        Cell::new("Tool").fg(Color::White),
        Cell::new("Phrases").fg(Color::White),
    ]);
    for name in table.tool_names() {
        let phrases = table.phrases(name).unwrap_or_default().join(", ");
        out.add_row(vec![Cell::new(name).fg(Color::Cyan), Cell::new(phrases)]);
    }

    println!();
    println!("{out}");
    println!();
    Ok(())
}
