use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that replaces the platform config directory.
pub const CONFIG_DIR_ENV: &str = "ANNOUNCEMENTS_CONFIG_DIR";

/// File holding [`AnnouncementsConfig`] inside the config directory.
pub const CONFIG_FILENAME: &str = "announcements.json";

/// Get the config directory using platform-appropriate location.
///
/// - `$ANNOUNCEMENTS_CONFIG_DIR` when set and non-empty
/// - macOS: `~/Library/Application Support/announcement-notifier/`
/// - Linux: `~/.config/announcement-notifier/` (or `$XDG_CONFIG_HOME`)
/// - Windows: `%APPDATA%/announcement-notifier/`
///
/// Falls back to `~/.announcement-notifier/` if no platform dir is available.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .map(|d| d.join("announcement-notifier"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".announcement-notifier")
        })
}

// ---------------------------------------------------------------------------
// AnnouncementsConfig
// ---------------------------------------------------------------------------

/// Settings recognized by the notifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnnouncementsConfig {
    /// Announcement endpoint
    #[serde(default = "default_url")]
    pub url: String,
    /// Milliseconds between polls
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    /// Server token sent as `Authorization: token <token>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

fn default_url() -> String {
    "http://127.0.0.1:8888/services/announcement/latest".to_string()
}

fn default_refresh_interval() -> u64 {
    60_000
}

fn default_request_timeout() -> u64 {
    30_000
}

impl Default for AnnouncementsConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            refresh_interval: default_refresh_interval(),
            token: None,
            request_timeout: default_request_timeout(),
        }
    }
}

impl AnnouncementsConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    /// Reject settings the poller cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let parsed = url::Url::parse(&self.url).map_err(|e| format!("Invalid URL: {e}"))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(format!("Scheme \"{scheme}\" is not allowed; use http or https"));
            }
        }
        if self.refresh_interval == 0 {
            return Err("refresh-interval must be greater than zero".to_string());
        }
        if self.request_timeout == 0 {
            return Err("request-timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

pub fn load_config() -> AnnouncementsConfig {
    load_config_from(&config_dir())
}

pub fn save_config(config: &AnnouncementsConfig) -> Result<(), String> {
    save_config_to(&config_dir(), config)
}

/// Read `announcements.json` from `dir`. A missing file means defaults; an
/// unreadable or corrupt one is logged and also yields defaults.
pub fn load_config_from(dir: &Path) -> AnnouncementsConfig {
    let path = dir.join(CONFIG_FILENAME);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return AnnouncementsConfig::default();
        }
        Err(e) => {
            tracing::warn!("Could not read {}: {e}", path.display());
            return AnnouncementsConfig::default();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::error!("Corrupt announcement settings in {}: {e}. Using defaults.", path.display());
        AnnouncementsConfig::default()
    })
}

/// Write `announcements.json` into `dir`, creating it if needed.
///
/// The file is written next to the target and renamed over it, owner-only on
/// Unix since it may hold the server token.
pub fn save_config_to(dir: &Path, config: &AnnouncementsConfig) -> Result<(), String> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize announcement settings: {e}"))?;
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create {}: {e}", dir.display()))?;

    let target = dir.join(CONFIG_FILENAME);
    let staged = target.with_extension(format!("json.{}", std::process::id()));
    std::fs::write(&staged, json)
        .map_err(|e| format!("Failed to write {}: {e}", staged.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&staged, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| format!("Failed to restrict {}: {e}", staged.display()))?;
    }

    if let Err(e) = std::fs::rename(&staged, &target) {
        let _ = std::fs::remove_file(&staged);
        return Err(format!("Failed to replace {}: {e}", target.display()));
    }
    Ok(())
}
