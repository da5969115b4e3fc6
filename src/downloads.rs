use crate::errors::FetchError;
use crate::github::{GitHubApi, HttpClient};
use crate::models::{DownloadTarget, LatestRelease};
use crate::sink::Sink;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    Release,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub url: String,
    pub source: LinkSource,
}

/// Binds each download button to an archive URL once per process start.
pub struct DownloadLinkResolver {
    targets: Vec<DownloadTarget>,
    api: GitHubApi,
    http: Arc<dyn HttpClient>,
    sink: Arc<dyn Sink>,
    clicks: Vec<AtomicU64>,
}

impl DownloadLinkResolver {
    pub fn new(
        targets: Vec<DownloadTarget>,
        api: GitHubApi,
        http: Arc<dyn HttpClient>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        let clicks = targets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            targets,
            api,
            http,
            sink,
            clicks,
        }
    }

    pub fn targets(&self) -> &[DownloadTarget] {
        &self.targets
    }

    pub fn target(&self, link_sink: &str) -> Option<&DownloadTarget> {
        self.position(link_sink).map(|index| &self.targets[index])
    }

    /// Counts one click on the button bound to `link_sink` and returns the new total.
    pub fn record_click(&self, link_sink: &str) -> Option<u64> {
        let index = self.position(link_sink)?;
        let target = &self.targets[index];
        let total = self.clicks[index].fetch_add(1, Ordering::Relaxed) + 1;
        info!("download: {}-{} (click {total})", target.repo_id, target.label);
        Some(total)
    }

    pub fn clicks(&self, link_sink: &str) -> u64 {
        self.position(link_sink)
            .map(|index| self.clicks[index].load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn position(&self, link_sink: &str) -> Option<usize> {
        self.targets
            .iter()
            .position(|target| target.link_sink == link_sink)
    }

    pub async fn resolve_all(&self) -> Vec<ResolvedLink> {
        let links = join_all(self.targets.iter().map(|target| self.resolve_one(target))).await;
        let releases = links
            .iter()
            .filter(|link| link.source == LinkSource::Release)
            .count();
        info!("resolved {} download links ({releases} from releases)", links.len());
        links
    }

    pub async fn resolve_one(&self, target: &DownloadTarget) -> ResolvedLink {
        self.sink.set_text(&target.link_sink, &target.label);

        let link = if target.use_latest_release {
            match self.latest_zipball(&target.repo_id).await {
                Ok(Some(url)) => ResolvedLink {
                    url,
                    source: LinkSource::Release,
                },
                Ok(None) => fallback(target),
                Err(err) => {
                    warn!("failed to fetch download link for {}: {err}", target.repo_id);
                    fallback(target)
                }
            }
        } else {
            fallback(target)
        };

        self.sink.set_link(&target.link_sink, &link.url);
        link
    }

    /// `Ok(None)` covers a 2xx response without a usable `zipball_url`.
    async fn latest_zipball(&self, repo_id: &str) -> Result<Option<String>, FetchError> {
        let url = self.api.latest_release_url(repo_id);
        let response = self.http.get(&url).await?.ensure_success(&url)?;
        let release: LatestRelease = response.json(&url)?;
        Ok(release.zipball_url.filter(|zipball| !zipball.is_empty()))
    }
}

fn fallback(target: &DownloadTarget) -> ResolvedLink {
    ResolvedLink {
        url: target.fallback_url.clone(),
        source: LinkSource::Fallback,
    }
}
