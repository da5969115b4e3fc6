use crate::animation::{CountUp, run_count_up};
use crate::errors::FetchError;
use crate::github::{GitHubApi, HttpClient};
use crate::models::{RefreshSummary, RepoStats, StatsTarget};
use crate::sink::Sink;
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

pub const LOADING: &str = "...";
pub const ERROR: &str = "Error";
pub const NOT_AVAILABLE: &str = "N/A";

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Compact display form: `950`, `1.5K`, `2.5M`.
pub fn format_count(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 1_000 {
        format!("{:.1}K", value as f64 / 1_000.0)
    } else {
        value.to_string()
    }
}

/// Missing and zero counts both show as `N/A`.
pub fn render_count(value: Option<u64>) -> String {
    match value {
        Some(count) if count > 0 => format_count(count),
        _ => NOT_AVAILABLE.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Cached,
    Fetched,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    payload: RepoStats,
    fetched_at: DateTime<Utc>,
}

pub struct StatsFetcher {
    targets: Vec<StatsTarget>,
    api: GitHubApi,
    http: Arc<dyn HttpClient>,
    sink: Arc<dyn Sink>,
    ttl: TimeDelta,
    animate: bool,
    cache: Mutex<HashMap<String, CacheEntry>>,
    count_ups: Mutex<HashMap<String, AbortHandle>>,
}

impl StatsFetcher {
    pub fn new(
        targets: Vec<StatsTarget>,
        api: GitHubApi,
        http: Arc<dyn HttpClient>,
        sink: Arc<dyn Sink>,
        ttl: Duration,
    ) -> Self {
        Self {
            targets,
            api,
            http,
            sink,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            animate: false,
            cache: Mutex::new(HashMap::new()),
            count_ups: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_animation(mut self, animate: bool) -> Self {
        self.animate = animate;
        self
    }

    pub fn targets(&self) -> &[StatsTarget] {
        &self.targets
    }

    pub async fn refresh_all(&self) -> RefreshSummary {
        self.refresh_all_at(Utc::now()).await
    }

    /// Refreshes every target independently and waits for all of them to settle.
    pub async fn refresh_all_at(&self, now: DateTime<Utc>) -> RefreshSummary {
        let outcomes = join_all(
            self.targets
                .iter()
                .map(|target| self.refresh_one_at(target, now)),
        )
        .await;

        let mut summary = RefreshSummary::default();
        for outcome in outcomes {
            match outcome {
                RefreshOutcome::Cached => summary.cached += 1,
                RefreshOutcome::Fetched => summary.fetched += 1,
                RefreshOutcome::Failed => summary.failed += 1,
            }
        }
        summary
    }

    pub async fn refresh_one(&self, target: &StatsTarget) -> RefreshOutcome {
        self.refresh_one_at(target, Utc::now()).await
    }

    pub async fn refresh_one_at(&self, target: &StatsTarget, now: DateTime<Utc>) -> RefreshOutcome {
        self.stop_count_ups(target).await;
        self.sink.set_text(&target.stars_sink, LOADING);
        self.sink.set_text(&target.forks_sink, LOADING);

        let fresh = self
            .cache
            .lock()
            .await
            .get(&target.repo_id)
            .filter(|entry| now - entry.fetched_at < self.ttl)
            .map(|entry| entry.payload);

        if let Some(payload) = fresh {
            debug!("serving {} stats from cache", target.repo_id);
            self.render(target, &payload);
            return RefreshOutcome::Cached;
        }

        match self.fetch(&target.repo_id).await {
            Ok(payload) => {
                self.cache.lock().await.insert(
                    target.repo_id.clone(),
                    CacheEntry {
                        payload,
                        fetched_at: now,
                    },
                );
                self.render(target, &payload);
                if self.animate {
                    self.spawn_count_up(target, &payload).await;
                }
                RefreshOutcome::Fetched
            }
            Err(err) => {
                if err.is_transient() {
                    warn!("failed to fetch {} stats: {err}", target.repo_id);
                } else {
                    error!("failed to fetch {} stats: {err}", target.repo_id);
                }
                self.sink.set_text(&target.stars_sink, ERROR);
                self.sink.set_text(&target.forks_sink, ERROR);
                RefreshOutcome::Failed
            }
        }
    }

    /// When the cached entry for `repo_id` was fetched, stale or not.
    pub async fn cached_at(&self, repo_id: &str) -> Option<DateTime<Utc>> {
        self.cache
            .lock()
            .await
            .get(repo_id)
            .map(|entry| entry.fetched_at)
    }

    async fn fetch(&self, repo_id: &str) -> Result<RepoStats, FetchError> {
        let url = self.api.repo_url(repo_id);
        let response = self.http.get(&url).await?.ensure_success(&url)?;
        response.json(&url)
    }

    fn render(&self, target: &StatsTarget, payload: &RepoStats) {
        self.sink
            .set_text(&target.stars_sink, &render_count(payload.stargazers_count));
        self.sink
            .set_text(&target.forks_sink, &render_count(payload.forks_count));
    }

    /// At most one count-up runs per sink; a newer one replaces it.
    async fn spawn_count_up(&self, target: &StatsTarget, payload: &RepoStats) {
        let counters = [
            (&target.stars_sink, payload.stargazers_count),
            (&target.forks_sink, payload.forks_count),
        ];
        let mut count_ups = self.count_ups.lock().await;
        for (id, count) in counters {
            if let Some(end) = count.filter(|count| *count > 0) {
                let task = tokio::spawn(run_count_up(
                    Arc::clone(&self.sink),
                    id.clone(),
                    CountUp::from_zero(end),
                ));
                if let Some(previous) = count_ups.insert(id.clone(), task.abort_handle()) {
                    previous.abort();
                }
            }
        }
    }

    /// Stops any count-up still writing frames into this target's sinks.
    async fn stop_count_ups(&self, target: &StatsTarget) {
        let mut count_ups = self.count_ups.lock().await;
        for id in [&target.stars_sink, &target.forks_sink] {
            if let Some(running) = count_ups.remove(id) {
                running.abort();
            }
        }
    }
}
