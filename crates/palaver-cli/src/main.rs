//! Palaver command-line entry point.
//!
//! Binary name: `palaver`
//!
//! Parses CLI arguments, loads configuration from the data directory, sets up
//! tracing, then dispatches to the matching command handler.

mod cli;
mod echo;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, ConfigAction, SessionsAction, ToolsAction};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "palaver", &mut std::io::stdout());
        return Ok(());
    }

    let mut state = AppState::init().await?;

    // Verbosity flags override the configured level; RUST_LOG overrides both.
    let level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => state.config.logging.level.as_str(),
        1 => "info,palaver=debug",
        _ => "trace",
    };
    state.config.logging.level = level.to_string();
    palaver_observe::init_tracing(&state.config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli, &state).await;
    palaver_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli, state: &AppState) -> anyhow::Result<()> {
    match cli.command {
        Commands::Sessions { action } => match action {
            SessionsAction::List => cli::sessions::list_sessions(state, cli.json).await?,
            SessionsAction::Show { channel, raw } => {
                cli::sessions::show_session(state, &channel, raw, cli.json).await?;
            }
            SessionsAction::Compact { channel } => {
                cli::sessions::compact_session(state, &channel, cli.json).await?;
            }
            SessionsAction::Clear { channel, force } => {
                cli::sessions::clear_session(state, &channel, force, cli.json).await?;
            }
        },

        Commands::Tools { action } => match action {
            ToolsAction::Score { text } => cli::tools::score_tools(&text, cli.json)?,
            ToolsAction::Keywords => cli::tools::list_keywords(cli.json)?,
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => cli::config::show_config(state, cli.json)?,
        },

        Commands::Send { channel, text, user } => {
            cli::send::send_message(state, &channel, &user, &text, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
