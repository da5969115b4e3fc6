use crate::errors::ConfigError;
use crate::github::DEFAULT_API_BASE;
use crate::models::{DownloadTarget, StatsTarget};
use crate::stats::DEFAULT_CACHE_TTL;
use serde::{Deserialize, Serialize};
use std::{env, path::Path, path::PathBuf, time::Duration};
use tokio::fs;
use tracing::{error, warn};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);
const DEFAULT_USER_AGENT: &str = concat!("repo_showcase/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SiteConfig {
    pub api_base: String,
    pub user_agent: String,
    pub cache_ttl_secs: u64,
    pub poll_interval_secs: u64,
    pub animate: bool,
    pub stats_targets: Vec<StatsTarget>,
    pub download_targets: Vec<DownloadTarget>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            animate: true,
            stats_targets: default_stats_targets(),
            download_targets: default_download_targets(),
        }
    }
}

impl SiteConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Never zero; a zero period would make the poll timer spin.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Applies `GITHUB_API_BASE` and `STATS_ANIMATE` on top of the loaded values.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup("GITHUB_API_BASE").filter(|base| !base.trim().is_empty()) {
            self.api_base = base.trim().to_string();
        }

        if let Some(raw) = lookup("STATS_ANIMATE") {
            match parse_flag(&raw) {
                Some(animate) => self.animate = animate,
                None => warn!("ignoring invalid STATS_ANIMATE value: {raw}"),
            }
        }

        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn resolve_config_path() -> Option<PathBuf> {
    env::var("SITE_CONFIG_PATH").ok().map(PathBuf::from)
}

pub async fn read_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let bytes = fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Loads the site config, falling back to the built-in defaults when there is no file or
/// the file cannot be used.
pub async fn load_config(path: Option<&Path>) -> SiteConfig {
    let Some(path) = path else {
        return SiteConfig::default();
    };

    match read_config(path).await {
        Ok(config) => config,
        Err(ConfigError::Read(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("config file {} not found, using defaults", path.display());
            SiteConfig::default()
        }
        Err(err) => {
            error!("{err}");
            SiteConfig::default()
        }
    }
}

fn stats_target(name: &str, repo_id: &str, sink_prefix: &str) -> StatsTarget {
    StatsTarget {
        name: name.to_string(),
        repo_id: repo_id.to_string(),
        stars_sink: format!("{sink_prefix}-stars"),
        forks_sink: format!("{sink_prefix}-forks"),
    }
}

fn download_target(repo_id: &str, link_sink: &str, use_latest_release: bool) -> DownloadTarget {
    DownloadTarget {
        repo_id: repo_id.to_string(),
        link_sink: link_sink.to_string(),
        fallback_url: format!("https://github.com/{repo_id}/archive/refs/heads/main.zip"),
        use_latest_release,
        label: if use_latest_release {
            "Latest Release".to_string()
        } else {
            "Source Code".to_string()
        },
    }
}

pub fn default_stats_targets() -> Vec<StatsTarget> {
    vec![
        stats_target("VENOM-XMD", "gifteddevsmd/VENOM-XMD", "venomxmd"),
        stats_target("DAVE-MD", "gifteddevsmd/DAVE-MD2", "davemd"),
        stats_target("Dave-Ai", "gifteddevsmd/Dave-Ai", "daveai"),
    ]
}

pub fn default_download_targets() -> Vec<DownloadTarget> {
    vec![
        download_target("gifteddevsmd/VENOM-XMD", "venom-xmd-download-zip", true),
        download_target("gifteddevsmd/DAVE-MD2", "davemd-download-zip", false),
        download_target("gifteddevsmd/Dave-Ai", "daveai-download-zip", false),
    ]
}
