use crate::config::SiteConfig;
use crate::downloads::DownloadLinkResolver;
use crate::errors::ConfigError;
use crate::github::{GitHubApi, HttpClient, ReqwestClient};
use crate::sink::SinkBoard;
use crate::stats::StatsFetcher;
use std::{sync::Arc, time::Duration};

/// Composition root: every component the page needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<SinkBoard>,
    pub stats: Arc<StatsFetcher>,
    pub downloads: Arc<DownloadLinkResolver>,
    pub poll_interval: Duration,
}

impl AppState {
    pub fn new(config: &SiteConfig, http: Arc<dyn HttpClient>) -> Self {
        let board = Arc::new(SinkBoard::new());
        let api = GitHubApi::new(config.api_base.clone());

        let stats = StatsFetcher::new(
            config.stats_targets.clone(),
            api.clone(),
            Arc::clone(&http),
            board.clone(),
            config.cache_ttl(),
        )
        .with_animation(config.animate);

        let downloads = DownloadLinkResolver::new(
            config.download_targets.clone(),
            api,
            http,
            board.clone(),
        );

        Self {
            board,
            stats: Arc::new(stats),
            downloads: Arc::new(downloads),
            poll_interval: config.poll_interval(),
        }
    }

    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        let http = ReqwestClient::new(&config.user_agent)?;
        Ok(Self::new(config, Arc::new(http)))
    }
}
