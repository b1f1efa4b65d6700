//! Command-line interface of the notifier binary.
//!
//! Flags and their environment variables override values from the config file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AnnouncementsConfig;

#[derive(Debug, Parser)]
#[command(name = "announcement-notifier", version, about = "Poll the notebook server for announcements")]
pub struct Cli {
    /// Announcement endpoint
    #[arg(long, env = "ANNOUNCEMENTS_URL", global = true)]
    pub url: Option<String>,

    /// Milliseconds between polls
    #[arg(long, env = "ANNOUNCEMENTS_REFRESH_INTERVAL", global = true)]
    pub refresh_interval: Option<u64>,

    /// Server token for the Authorization header
    #[arg(long, env = "ANNOUNCEMENTS_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Poll continuously (default). Press Enter to open announcements, `q` to quit.
    Watch,
    /// Fetch once and print the rendered announcements
    Once,
    /// Validate a JSON payload from a file and print the rendered HTML
    Validate { file: PathBuf },
    /// Write the effective configuration to the config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch)
    }

    /// Apply flag and environment overrides on top of file settings.
    pub fn apply_overrides(&self, config: &mut AnnouncementsConfig) {
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(interval) = self.refresh_interval {
            config.refresh_interval = interval;
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
    }
}
