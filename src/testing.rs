use crate::errors::FetchError;
use crate::github::{HttpResponse, MockHttpClient};
use crate::sink::SinkBoard;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const API_BASE: &str = "http://github.test";

#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, serde_json::Value),
    Raw(u16, &'static str),
    Unreachable,
}

/// Scripted GET responses keyed by full URL, served through a [`MockHttpClient`].
/// Unscripted URLs are unreachable. Replies can be rescripted after the client is built.
#[derive(Clone, Default)]
pub struct Script {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    calls: Arc<Mutex<Vec<String>>>,
    observed: Arc<Mutex<Vec<Option<String>>>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(format!("{API_BASE}{path}"), reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// What the watched sink showed each time a request went out.
    pub fn observed(&self) -> Vec<Option<String>> {
        self.observed.lock().unwrap().clone()
    }

    pub fn client(&self) -> Arc<MockHttpClient> {
        let script = self.clone();
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(move |url| script.answer(url));
        Arc::new(mock)
    }

    /// Like [`Script::client`], also recording what `id` shows on `board` at the moment each
    /// request goes out.
    pub fn client_watching(&self, board: Arc<SinkBoard>, id: &str) -> Arc<MockHttpClient> {
        let script = self.clone();
        let id = id.to_string();
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(move |url| {
            script.observed.lock().unwrap().push(board.text(&id));
            script.answer(url)
        });
        Arc::new(mock)
    }

    fn answer(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        let reply = self.replies.lock().unwrap().get(url).cloned();
        match reply.unwrap_or(Reply::Unreachable) {
            Reply::Json(status, value) => Ok(HttpResponse {
                status,
                body: serde_json::to_vec(&value).unwrap(),
            }),
            Reply::Raw(status, body) => Ok(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            }),
            Reply::Unreachable => Err(FetchError::Network {
                url: url.to_string(),
                source: unreachable_error(),
            }),
        }
    }
}

fn unreachable_error() -> reqwest::Error {
    reqwest::Client::new()
        .get("http://[::1")
        .build()
        .expect_err("unterminated IPv6 host must not parse")
}
