//! Command-line interface for padsync.
//!
//! Every command loads the collection first, runs, waits for the trailing
//! reconciliation and then prints the resulting collection.

use crate::actions;
use crate::remote::http::HttpPadApi;
use crate::session::{PadContent, PadSession};
use crate::sync::{EngineOptions, MutationOutcome};
use crate::tab::{SharingPolicy, TabState};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use padsync_config::{Config, LogLevel};
use std::path::PathBuf;

/// padsync - keep your pads in sync with the pad server
#[derive(Parser)]
#[command(name = "padsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List your pads; the selected one is marked with '*'
    List,
    /// Create a new pad
    Create,
    /// Rename a pad you own
    Rename {
        id: String,
        name: String,
    },
    /// Delete a pad you own
    Delete {
        id: String,
    },
    /// Leave a pad shared with you
    Leave {
        id: String,
    },
    /// Set a pad's sharing policy
    Share {
        id: String,
        #[arg(value_parser = ["public", "private"])]
        policy: String,
    },
    /// Flip a pad between public and private
    ToggleSharing {
        id: String,
    },
    /// Show the actions a user may take on a pad
    Actions {
        id: String,
        /// The user whose actions to show
        #[arg(long, value_name = "USER_ID")]
        user: String,
    },
    /// Print a pad's document as JSON
    Open {
        id: String,
    },
}

/// Load config from `path`, or from the default location.
pub fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}

/// Build the session for `config`.
pub fn build_session(config: &Config) -> Result<PadSession<HttpPadApi>> {
    let api = HttpPadApi::new(&config.server)?;
    let origin = api.origin();
    Ok(PadSession::new(
        api,
        EngineOptions::from(&config.sync),
        origin,
    ))
}

/// Run one command against a started session.
pub async fn run_command(session: &PadSession<HttpPadApi>, command: Commands) -> Result<()> {
    session
        .start()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message().to_string()))
        .context("Could not load pads")?;

    let result = execute(session, &command).await;
    session.wait_idle().await;

    match command {
        Commands::Actions { .. } | Commands::Open { .. } => {}
        _ => print_state(&session.state()),
    }
    result
}

async fn execute(session: &PadSession<HttpPadApi>, command: &Commands) -> Result<()> {
    match command {
        Commands::List => {}
        Commands::Create => {
            let tab = session.create_pad().await.map_err(user_error)?;
            println!("Created {} ({})", tab.id, tab.title);
        }
        Commands::Rename { id, name } => {
            report(id, session.rename_pad(id, name).await.map_err(user_error)?);
        }
        Commands::Delete { id } => {
            report(id, session.delete_pad(id).await.map_err(user_error)?);
        }
        Commands::Leave { id } => {
            report(id, session.leave_pad(id).await.map_err(user_error)?);
        }
        Commands::Share { id, policy } => {
            let policy: SharingPolicy = policy.parse().map_err(anyhow::Error::msg)?;
            report(
                id,
                session
                    .update_sharing_policy(id, policy)
                    .await
                    .map_err(user_error)?,
            );
        }
        Commands::ToggleSharing { id } => {
            report(id, session.toggle_sharing(id).await.map_err(user_error)?);
        }
        Commands::Actions { id, user } => {
            let available = session.actions_for(id, user);
            if available.is_empty() {
                anyhow::bail!("No pad with id {}", id);
            }
            for action in available {
                println!("{}", action);
            }
            if let Some(tab) = session.state().collection.get(id) {
                println!(
                    "Sharing toggles to: {}",
                    actions::toggled_policy(tab.sharing_policy)
                );
            }
        }
        Commands::Open { id } => {
            let content = session
                .load_pad_content(id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message().to_string()))?;
            if content == PadContent::Initial {
                log::info!("Pad {} has no stored content yet", id);
            }
            let json = serde_json::to_string_pretty(&content.into_document())?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn user_error(err: crate::error::SyncError) -> anyhow::Error {
    anyhow::anyhow!(err.user_message())
}

fn report(id: &str, outcome: MutationOutcome<()>) {
    if outcome == MutationOutcome::AlreadySettled {
        println!("Pad {} is not in your list; nothing to do", id);
    }
}

/// One line per tab: selection marker, id, sharing policy, title.
pub fn format_state(state: &TabState) -> String {
    let selected = state.effective_selection();
    let mut out = String::new();
    for tab in state.collection.tabs() {
        let marker = if selected == Some(&tab.id) { '*' } else { ' ' };
        out.push_str(&format!(
            "{} {:<38} {:<9} {}\n",
            marker,
            tab.id,
            tab.sharing_policy.as_str(),
            tab.title
        ));
    }
    if out.is_empty() {
        out.push_str("(no pads)\n");
    }
    out
}

fn print_state(state: &TabState) {
    print!("{}", format_state(state));
}
