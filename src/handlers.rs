use crate::errors::AppError;
use crate::models::{DownloadButton, RefreshSummary, RepoCard, SinkElement};
use crate::state::AppState;
use crate::stats::LOADING;
use crate::ui::render_index;
use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Json,
};
use std::collections::BTreeMap;
use tracing::info;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state))
}

pub async fn get_sinks(State(state): State<AppState>) -> Json<BTreeMap<String, SinkElement>> {
    Json(state.board.snapshot())
}

pub async fn get_sink(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SinkElement>, AppError> {
    state
        .board
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("no element with id '{id}'")))
}

pub async fn get_repos(State(state): State<AppState>) -> Json<Vec<RepoCard>> {
    Json(repo_cards(&state))
}

pub async fn get_downloads(State(state): State<AppState>) -> Json<Vec<DownloadButton>> {
    Json(download_buttons(&state))
}

/// Counts the click and sends the browser on to the button's bound archive URL.
pub async fn download_click(
    State(state): State<AppState>,
    Path(sink): Path<String>,
) -> Result<Redirect, AppError> {
    let target = state
        .downloads
        .target(&sink)
        .ok_or_else(|| AppError::not_found(format!("no download button with id '{sink}'")))?;
    let href = state
        .board
        .get(&sink)
        .and_then(|element| element.href)
        .unwrap_or_else(|| target.fallback_url.clone());

    state.downloads.record_click(&sink);
    Ok(Redirect::to(&href))
}

pub fn click_url(link_sink: &str) -> String {
    format!("/api/downloads/{link_sink}/click")
}

pub async fn refresh(State(state): State<AppState>) -> Json<RefreshSummary> {
    let summary = state.stats.refresh_all().await;
    info!(
        "manual stats refresh: {} fetched, {} cached, {} failed",
        summary.fetched, summary.cached, summary.failed
    );
    Json(summary)
}

pub fn repo_cards(state: &AppState) -> Vec<RepoCard> {
    let text = |id: &str| state.board.text(id).unwrap_or_else(|| LOADING.to_string());
    state
        .stats
        .targets()
        .iter()
        .map(|target| RepoCard {
            name: target.name.clone(),
            repo_id: target.repo_id.clone(),
            stars: text(&target.stars_sink),
            forks: text(&target.forks_sink),
        })
        .collect()
}

pub fn download_buttons(state: &AppState) -> Vec<DownloadButton> {
    state
        .downloads
        .targets()
        .iter()
        .map(|target| {
            let element = state.board.get(&target.link_sink).unwrap_or_default();
            DownloadButton {
                repo_id: target.repo_id.clone(),
                label: if element.text.is_empty() {
                    target.label.clone()
                } else {
                    element.text
                },
                href: element.href,
                rel: element.rel,
                clicks: state.downloads.clicks(&target.link_sink),
                track_url: click_url(&target.link_sink),
            }
        })
        .collect()
}
