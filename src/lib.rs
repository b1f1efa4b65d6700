pub mod button;
pub mod cli;
pub mod client;
pub mod config;
pub mod error_classification;
pub mod host;
pub mod model;
pub mod parser;
pub mod poller;
pub mod sanitize;
pub mod validation;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tokio::io::AsyncBufReadExt;

pub use button::{ButtonTone, ButtonView, ServiceState};
pub use client::{AnnouncementClient, FetchError};
pub use config::AnnouncementsConfig;
pub use host::{AnnouncementHost, ConsoleHost, Dialog};
pub use model::{AnnouncementsData, Level, Message, MessageBlock};
pub use parser::{parse_announcements, parse_announcements_str};
pub use poller::{Poller, PollerHandle, Schedule};
pub use validation::{ValidationError, ValidationReason};

use cli::{Cli, Command};

/// Resolve the effective configuration: config file, then CLI/env overrides.
fn effective_config(cli: &Cli) -> anyhow::Result<AnnouncementsConfig> {
    let mut config = config::load_config();
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid announcement settings")?;
    Ok(config)
}

fn build_client(config: &AnnouncementsConfig) -> anyhow::Result<AnnouncementClient> {
    AnnouncementClient::new(&config.url, config.token.clone(), config.request_timeout())
        .context("failed to create HTTP client")
}

/// Entry point of the binary.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command() {
        Command::Watch => watch(&cli).await,
        Command::Once => {
            if let Some(html) = fetch_rendered(&cli).await? {
                println!("{html}");
            }
            Ok(())
        }
        Command::Validate { file } => {
            println!("{}", render_file(&file)?);
            Ok(())
        }
        Command::InitConfig { force } => {
            let path = init_config(&cli, force)?;
            println!("wrote {}", path.display());
            Ok(())
        }
    }
}

/// Poll until Ctrl-C or `q`; any other line on stdin opens the dialog.
async fn watch(cli: &Cli) -> anyhow::Result<()> {
    let config = effective_config(cli)?;
    let client = build_client(&config)?;
    let host = ConsoleHost::new(std::io::stdout());
    let handle = Poller::new(client, host, config.refresh_interval()).spawn();

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim() == "q" => break,
                Ok(Some(_)) => {
                    if !handle.open_announcements() {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!("stdin closed: {e}");
                    stdin_open = false;
                }
            },
        }
    }

    handle.stop().await;
    Ok(())
}

/// Single fetch. `None` when the server has nothing to show.
async fn fetch_rendered(cli: &Cli) -> anyhow::Result<Option<String>> {
    let config = effective_config(cli)?;
    let client = build_client(&config)?;

    let value = match client.fetch().await {
        Ok(value) => value,
        Err(FetchError::Rejected(status)) => {
            tracing::info!("no announcements (HTTP {status})");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let data = parse_announcements(&value).context("announcement payload rejected")?;
    Ok(Some(data.to_html()))
}

fn render_file(file: &Path) -> anyhow::Result<String> {
    let body = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let data = parse_announcements_str(&body)
        .with_context(|| format!("{} is not a valid announcements payload", file.display()))?;
    Ok(data.to_html())
}

/// Write the effective settings to the config file. Returns its path.
fn init_config(cli: &Cli, force: bool) -> anyhow::Result<PathBuf> {
    let path = config::config_dir().join(config::CONFIG_FILENAME);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let config = effective_config(cli)?;
    config::save_config(&config).map_err(anyhow::Error::msg)?;
    Ok(path)
}
