use serde::{Deserialize, Serialize};

/// Repository metadata as returned by `GET /repos/{owner}/{repo}`.
///
/// Both counts are optional: GitHub may omit them, and the page must degrade to a
/// placeholder rather than fail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RepoStats {
    #[serde(default)]
    pub stargazers_count: Option<u64>,
    #[serde(default)]
    pub forks_count: Option<u64>,
}

/// The subset of `GET /repos/{owner}/{repo}/releases/latest` we care about.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LatestRelease {
    #[serde(default)]
    pub zipball_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsTarget {
    pub name: String,
    pub repo_id: String,
    pub stars_sink: String,
    pub forks_sink: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadTarget {
    pub repo_id: String,
    pub link_sink: String,
    pub fallback_url: String,
    #[serde(default)]
    pub use_latest_release: bool,
    pub label: String,
}

/// One addressable element on the page.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SinkElement {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepoCard {
    pub name: String,
    pub repo_id: String,
    pub stars: String,
    pub forks: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadButton {
    pub repo_id: String,
    pub label: String,
    pub href: Option<String>,
    pub rel: Option<String>,
    pub clicks: u64,
    pub track_url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub cached: usize,
    pub fetched: usize,
    pub failed: usize,
}
