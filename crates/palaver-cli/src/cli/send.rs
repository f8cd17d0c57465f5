//! `palaver send`: one message through the full dispatch path.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use console::style;
use palaver_core::dispatch::{DispatchOutcome, Dispatcher};
use palaver_core::session::ChannelRegistry;
use palaver_types::request::InboundRequest;
use tracing::info;

use crate::echo::{placeholder_catalog, EchoFactory};
use crate::state::AppState;

pub async fn send_message(
    state: &AppState,
    channel: &str,
    user: &str,
    text: &str,
    json: bool,
) -> Result<()> {
    let registry = ChannelRegistry::new(
        Arc::clone(&state.store),
        EchoFactory,
        placeholder_catalog(),
        &state.config,
    );
    registry.init().await.context("Failed to prepare session store")?;
    let dispatcher = Dispatcher::new(registry, &state.config);

    let working_dir = std::env::current_dir().context("Failed to read current directory")?;
    let request = InboundRequest::new(channel, user, text).with_working_dir(working_dir);

    let ticket = match dispatcher.dispatch(request).await {
        DispatchOutcome::Denied { message } | DispatchOutcome::RateLimited { message, .. } => {
            bail!(message)
        }
        DispatchOutcome::Unavailable(err) => return Err(err).context("Channel unavailable"),
        outcome => outcome
            .into_ticket()
            .context("Request was not admitted")?,
    };

    let reply = ticket.wait().await?;
    info!(
        channel_id = channel,
        persisted = reply.persisted,
        compacted = reply.compacted,
        "local turn finished"
    );
    let status = dispatcher
        .registry()
        .get(channel)
        .map(|session| session.snapshot());
    dispatcher.registry().shutdown();

    if json {
        let out = serde_json::json!({
            "reply": reply,
            "channel": status,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {}", reply.text.replace('\n', "\n  "));
    println!();
    println!(
        "  {} {} persisted, model {}{}",
        style("·").dim(),
        reply.persisted,
        style(&reply.model).cyan(),
        if reply.compacted {
            format!(", {}", style("log compacted").yellow())
        } else {
            String::new()
        }
    );
    if let Some(status) = status {
        println!(
            "  {} channel '{}' now holds {} records",
            style("·").dim(),
            status.channel_id,
            status.cached_message_count
        );
    }
    println!();
    Ok(())
}
