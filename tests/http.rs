use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct RepoCard {
    name: String,
    stars: String,
    forks: String,
}

#[derive(Debug, Deserialize)]
struct DownloadButton {
    repo_id: String,
    label: String,
    href: Option<String>,
    rel: Option<String>,
    clicks: u64,
    track_url: String,
}

#[derive(Debug, Deserialize)]
struct RefreshSummary {
    cached: usize,
    fetched: usize,
    failed: usize,
}

#[derive(Debug, Deserialize)]
struct SinkElement {
    text: String,
}

struct TestServer {
    base_url: String,
    github: MockServer,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn write_site_config() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("repo_showcase_http_{}_{}.json", std::process::id(), nanos));

    let config = serde_json::json!({
        "stats_targets": [
            { "name": "Alpha", "repo_id": "owner/alpha", "stars_sink": "alpha-stars", "forks_sink": "alpha-forks" },
            { "name": "Broken", "repo_id": "owner/broken", "stars_sink": "broken-stars", "forks_sink": "broken-forks" }
        ],
        "download_targets": [
            { "repo_id": "owner/alpha", "link_sink": "alpha-download-zip",
              "fallback_url": "https://github.com/owner/alpha/archive/refs/heads/main.zip",
              "use_latest_release": true, "label": "Latest Release" },
            { "repo_id": "owner/beta", "link_sink": "beta-download-zip",
              "fallback_url": "https://github.com/owner/beta/archive/refs/heads/main.zip",
              "use_latest_release": true, "label": "Latest Release" },
            { "repo_id": "owner/gamma", "link_sink": "gamma-download-zip",
              "fallback_url": "https://github.com/owner/gamma/archive/refs/heads/main.zip",
              "use_latest_release": false, "label": "Source Code" }
        ]
    });
    std::fs::write(&path, serde_json::to_vec_pretty(&config).unwrap()).expect("write config");
    path.to_string_lossy().to_string()
}

async fn start_github() -> MockServer {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/owner/alpha"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "stargazers_count": 1500, "forks_count": 42 })),
        )
        .mount(&github)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/owner/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&github)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/owner/alpha/releases/latest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "zipball_url": "https://codeload.test/alpha.zip" })),
        )
        .mount(&github)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/owner/beta/releases/latest"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({ "message": "Not Found" })))
        .mount(&github)
        .await;
    github
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/sinks")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let github = start_github().await;
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_repo_showcase"))
        .env("PORT", port.to_string())
        .env("SITE_CONFIG_PATH", write_site_config())
        .env("GITHUB_API_BASE", github.uri())
        .env("STATS_ANIMATE", "false")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        github,
        child,
    }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn settled_repos(client: &Client, base_url: &str) -> Vec<RepoCard> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let repos: Vec<RepoCard> = client
            .get(format!("{base_url}/api/repos"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if repos.iter().all(|repo| repo.stars != "..." && repo.forks != "...") {
            return repos;
        }
        if Instant::now() > deadline {
            panic!("stats never settled: {repos:?}");
        }
        sleep(Duration::from_millis(50)).await;
    }
}

async fn settled_downloads(client: &Client, base_url: &str) -> Vec<DownloadButton> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let buttons: Vec<DownloadButton> = client
            .get(format!("{base_url}/api/downloads"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if buttons.iter().all(|button| button.href.is_some()) {
            return buttons;
        }
        if Instant::now() > deadline {
            panic!("download links never resolved: {buttons:?}");
        }
        sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn http_stats_render_counts_and_errors() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let repos = settled_repos(&client, &server.base_url).await;
    assert_eq!(repos.len(), 2);

    assert_eq!(repos[0].name, "Alpha");
    assert_eq!(repos[0].stars, "1.5K");
    assert_eq!(repos[0].forks, "42");

    assert_eq!(repos[1].name, "Broken");
    assert_eq!(repos[1].stars, "Error");
    assert_eq!(repos[1].forks, "Error");
}

#[tokio::test]
async fn http_download_links_fall_back() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let buttons = settled_downloads(&client, &server.base_url).await;
    let by_repo: BTreeMap<&str, &DownloadButton> = buttons
        .iter()
        .map(|button| (button.repo_id.as_str(), button))
        .collect();

    let alpha = by_repo["owner/alpha"];
    assert_eq!(alpha.href.as_deref(), Some("https://codeload.test/alpha.zip"));
    assert_eq!(alpha.label, "Latest Release");
    assert_eq!(alpha.rel.as_deref(), Some("noopener noreferrer"));

    let beta = by_repo["owner/beta"];
    assert_eq!(
        beta.href.as_deref(),
        Some("https://github.com/owner/beta/archive/refs/heads/main.zip")
    );

    let gamma = by_repo["owner/gamma"];
    assert_eq!(gamma.label, "Source Code");
    assert_eq!(
        gamma.href.as_deref(),
        Some("https://github.com/owner/gamma/archive/refs/heads/main.zip")
    );

    let requests = server.github.received_requests().await.unwrap_or_default();
    assert!(
        requests
            .iter()
            .all(|request| !request.url.path().starts_with("/repos/owner/gamma"))
    );
}

#[tokio::test]
async fn http_manual_refresh_uses_cache() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    settled_repos(&client, &server.base_url).await;

    let response = client
        .post(format!("{}/api/refresh", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let summary: RefreshSummary = response.json().await.unwrap();
    assert_eq!(summary.cached, 1);
    assert_eq!(summary.fetched, 0);
    assert_eq!(summary.failed, 1);

    let requests = server.github.received_requests().await.unwrap_or_default();
    let alpha_fetches = requests
        .iter()
        .filter(|request| request.url.path() == "/repos/owner/alpha")
        .count();
    assert_eq!(alpha_fetches, 1);

    let repos = settled_repos(&client, &server.base_url).await;
    assert_eq!(repos[0].stars, "1.5K");
}

#[tokio::test]
async fn http_sink_lookup() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    settled_repos(&client, &server.base_url).await;

    let element: SinkElement = client
        .get(format!("{}/api/sinks/alpha-forks", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(element.text, "42");

    let missing = client
        .get(format!("{}/api/sinks/nope", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_index_renders_sinks() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    settled_repos(&client, &server.base_url).await;

    let html = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(r#"id="alpha-stars""#));
    assert!(html.contains(r#"id="gamma-download-zip""#));
    assert!(html.contains("1.5K"));
}

#[tokio::test]
async fn http_download_click_is_counted_and_redirected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let no_redirect = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let before = settled_downloads(&client, &server.base_url).await;
    let alpha = before
        .iter()
        .find(|button| button.repo_id == "owner/alpha")
        .unwrap();
    assert_eq!(alpha.track_url, "/api/downloads/alpha-download-zip/click");
    let clicks_before = alpha.clicks;

    let response = no_redirect
        .get(format!("{}{}", server.base_url, alpha.track_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("https://codeload.test/alpha.zip")
    );

    let after = settled_downloads(&client, &server.base_url).await;
    let counts: BTreeMap<&str, u64> = after
        .iter()
        .map(|button| (button.repo_id.as_str(), button.clicks))
        .collect();
    assert_eq!(counts["owner/alpha"], clicks_before + 1);
    assert_eq!(counts["owner/gamma"], 0);

    let missing = no_redirect
        .get(format!("{}/api/downloads/nope/click", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
