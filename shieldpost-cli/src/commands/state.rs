//! `shieldpost state` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use shieldpost_core::config::ShieldpostConfig;
use shieldpost_core::types::TimestampKey;
use shieldpost_log_pipeline::StateStore;

use crate::cli::{StateAction, StateArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `state` command.
pub async fn execute(
    args: StateArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let path = match args.statefile {
        Some(path) => path,
        None => {
            let mut config = ShieldpostConfig::from_file_or_default(config_path).await?;
            config.apply_env_overrides();
            PathBuf::from(config.input.state_path)
        }
    };
    let store = StateStore::new(path);

    match args.action {
        StateAction::Show => execute_show(&store, writer).await,
        StateAction::Reset => execute_reset(&store, writer).await,
    }
}

async fn execute_show(store: &StateStore, writer: &OutputWriter) -> Result<(), CliError> {
    let exists = tokio::fs::try_exists(store.path()).await.unwrap_or(false);
    let cutoff = store.load().await;

    writer.render(&StateReport {
        path: store.path().display().to_string(),
        exists,
        cutoff,
        reset: false,
    })
}

async fn execute_reset(store: &StateStore, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %store.path().display(), "resetting cutoff");
    store.reset().await?;

    writer.render(&StateReport {
        path: store.path().display().to_string(),
        exists: false,
        cutoff: TimestampKey::epoch_floor(),
        reset: true,
    })
}

/// Persisted cutoff display report.
#[derive(Debug, Serialize)]
pub struct StateReport {
    /// State file path
    pub path: String,
    /// Whether the state file exists
    pub exists: bool,
    /// Effective cutoff (epoch floor when missing or malformed)
    pub cutoff: TimestampKey,
    /// Whether this report follows a reset
    pub reset: bool,
}

impl Render for StateReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "State file: {}", self.path.bold())?;
        if self.reset {
            writeln!(w, "  Result: {}", "RESET".yellow().bold())?;
            writeln!(w, "  The next run reports every event in the log.")?;
            return Ok(());
        }
        if !self.exists {
            writeln!(w, "  (no state file, every event in the log is new)")?;
        }
        writeln!(w, "  Cutoff: {}", self.cutoff.to_string().bold())?;
        Ok(())
    }
}
