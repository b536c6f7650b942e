//! Test doubles shared across modules.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    Router,
};
use reqwest::Url;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// One request as seen by the fake build server.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body_len: usize,
}

#[derive(Clone)]
struct FakeState {
    status: StatusCode,
    delay: Duration,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

/// Records every inbound request and answers with a fixed status.
pub struct FakeBuildServer {
    pub base_url: Url,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    handle: JoinHandle<()>,
}

impl FakeBuildServer {
    pub async fn spawn(status: StatusCode) -> Self {
        Self::spawn_with_delay(status, Duration::ZERO).await
    }

    /// Like `spawn`, but each reply is held back for `delay` after the call is recorded.
    pub async fn spawn_with_delay(status: StatusCode, delay: Duration) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            status,
            delay,
            calls: calls.clone(),
        };

        let app = Router::new().fallback(record).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}/")).unwrap(),
            calls,
            handle,
        }
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Wait until at least `count` calls arrived, then return all of them.
    pub async fn wait_for_calls(&self, count: usize) -> Vec<RecordedCall> {
        for _ in 0..100 {
            let calls = self.calls().await;
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {count} build trigger call(s), got {}", self.calls().await.len());
    }
}

impl Drop for FakeBuildServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state.calls.lock().await.push(RecordedCall {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        authorization,
        body_len: body.len(),
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    state.status
}

/// A local URL with nothing listening behind it.
pub async fn unused_local_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// Poll the event log until a line containing `needle` shows up.
pub async fn wait_for_log_line(path: &Path, needle: &str) -> String {
    for _ in 0..100 {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.contains(needle) {
            return content;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "log line containing {needle:?} never appeared:\n{}",
        std::fs::read_to_string(path).unwrap_or_default()
    );
}
