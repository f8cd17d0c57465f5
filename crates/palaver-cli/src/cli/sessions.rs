//! Session log commands: list, show, compact, clear.

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;
use palaver_core::context::estimate_tokens;
use palaver_core::session::{CompactionOutcome, LoadMode, SessionStore};
use palaver_types::message::{ContentPart, Message, MessageRole};

use crate::state::AppState;

const PREVIEW_CHARS: usize = 80;

/// List channels with a session log and their record counts.
///
/// ```bash
/// palaver sessions list
/// palaver sessions list --json
/// ```
pub async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let channels = state
        .store
        .list_channels()
        .await
        .context("Failed to list session logs")?;

    let mut rows = Vec::with_capacity(channels.len());
    for channel in &channels {
        let messages = state.store.load(channel, LoadMode::Raw).await?;
        let summaries = messages.iter().filter(|m| m.summary).count();
        rows.push((channel.clone(), messages.len(), summaries));
    }

    if json {
        let out: Vec<_> = rows
            .iter()
            .map(|(channel, records, summaries)| {
                serde_json::json!({
                    "channel_id": channel,
                    "records": records,
                    "compacted": *summaries > 0,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!(
            "  {} No session logs under {}",
            style("i").blue().bold(),
            style(state.data_dir.display()).cyan()
        );
        println!();
        return Ok(());
    }

    let threshold = state.config.session.compaction_threshold;
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Channel").fg(Color::White),
        Cell::new("Records").fg(Color::White),
        Cell::new("Compacted").fg(Color::White),
    ]);

    for (channel, records, summaries) in &rows {
        let records_cell = if *records > threshold {
            Cell::new(records).fg(Color::Yellow)
        } else {
            Cell::new(records).fg(Color::White)
        };
        table.add_row(vec![
            Cell::new(channel).fg(Color::Cyan),
            records_cell,
            Cell::new(if *summaries > 0 { "yes" } else { "no" }).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} channel{}",
        style(rows.len()).bold(),
        if rows.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// Print a channel's history as the agent would see it, or every record.
pub async fn show_session(state: &AppState, channel: &str, raw: bool, json: bool) -> Result<()> {
    let mode = if raw { LoadMode::Raw } else { LoadMode::Engineered };
    let messages = state
        .store
        .load(channel, mode)
        .await
        .with_context(|| format!("Failed to load session for channel '{channel}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!("  No history for channel '{}'.", style(channel).cyan());
        return Ok(());
    }

    let total_tokens: usize = messages.iter().map(estimate_tokens).sum();
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Tokens").fg(Color::White),
        Cell::new("Content").fg(Color::White),
    ]);

    for (index, message) in messages.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1).fg(Color::DarkGrey),
            role_cell(message),
            Cell::new(estimate_tokens(message)).fg(Color::DarkGrey),
            Cell::new(preview(message)),
        ]);
    }

    println!();
    println!(
        "  Channel '{}' ({})",
        style(channel).cyan().bold(),
        if raw { "raw log" } else { "agent context" }
    );
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} messages, ~{} tokens",
        style(messages.len()).bold(),
        style(total_tokens).bold()
    );
    println!();
    Ok(())
}

/// Compact a channel's log now, if it is over the threshold.
pub async fn compact_session(state: &AppState, channel: &str, json: bool) -> Result<()> {
    let compactor = state.compactor();
    let outcome = compactor
        .compact_log(channel)
        .await
        .with_context(|| format!("Failed to compact channel '{channel}'"))?;
    tracing::debug!(channel_id = channel, ?outcome, "manual compaction finished");

    if json {
        let out = match outcome {
            CompactionOutcome::Compacted { before, after } => {
                serde_json::json!({"compacted": true, "before": before, "after": after})
            }
            other => serde_json::json!({"compacted": false, "records": other.count()}),
        };
        println!("{out}");
        return Ok(());
    }

    match outcome {
        CompactionOutcome::Compacted { before, after } => println!(
            "  {} Compacted '{}': {} -> {} records.",
            style("✓").green().bold(),
            channel,
            before,
            after
        ),
        other => println!(
            "  {} '{}' has {} records; threshold is {}. Nothing to do.",
            style("i").blue().bold(),
            channel,
            other.count().unwrap_or(0),
            compactor.policy().threshold
        ),
    }
    Ok(())
}

/// Delete a channel's log, with confirmation.
pub async fn clear_session(state: &AppState, channel: &str, force: bool, json: bool) -> Result<()> {
    let records = state.store.count(channel).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete session log for '{}' ({} records)?",
                style(channel).red().bold(),
                records
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.store.clear(channel).await?;
    tracing::info!(channel_id = channel, records, "cleared session log");

    if json {
        println!(
            "{}",
            serde_json::json!({"cleared": true, "channel_id": channel, "records": records})
        );
    } else {
        println!(
            "  {} Session log for '{}' deleted.",
            style("x").red().bold(),
            channel
        );
    }
    Ok(())
}

// --- Formatting helpers ---

fn role_cell(message: &Message) -> Cell {
    if message.summary {
        return Cell::new("summary").fg(Color::Magenta);
    }
    match message.role {
        MessageRole::User => Cell::new("user").fg(Color::Cyan),
        MessageRole::Assistant => Cell::new("assistant").fg(Color::Green),
        MessageRole::ToolResult => Cell::new("toolResult").fg(Color::Yellow),
    }
}

/// One-line preview of a message; tool calls render as `name(..)`.
fn preview(message: &Message) -> String {
    let joined = message
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => text.replace('\n', " "),
            ContentPart::ToolCall { name, .. } => format!("{name}(..)"),
            ContentPart::ToolResult { text, is_error, .. } => {
                let flag = if *is_error { "error: " } else { "" };
                format!("{flag}{}", text.replace('\n', " "))
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    truncate(&joined, PREVIEW_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
