//! `palaver config show`.

use anyhow::{Context, Result};
use console::style;

use crate::state::AppState;

pub fn show_config(state: &AppState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&state.config)?);
        return Ok(());
    }

    let rendered = palaver_infra::config::render_config(&state.config)
        .context("Failed to render configuration")?;
    let path = palaver_infra::config::config_path(&state.data_dir);

    println!();
    println!("  {} {}", style("#").dim(), style(path.display()).dim());
    println!();
    println!("{rendered}");
    Ok(())
}
