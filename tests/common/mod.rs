//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, Uri};
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use tenant_proxy::config::loader::parse_config;
use tenant_proxy::config::ConfigStore;
use tenant_proxy::http::HttpServer;
use tenant_proxy::lifecycle::Shutdown;
use tenant_proxy::routing::RoutingSnapshot;

/// What a mock backend saw for one request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path_and_query: String,
    pub host: Option<String>,
    pub forwarded_host: Option<String>,
    pub forwarded_for: Option<String>,
}

#[derive(Clone)]
struct MockState {
    name: &'static str,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    hold: Option<Arc<Semaphore>>,
}

/// An axum backend on an ephemeral port that answers with its name.
pub struct MockBackend {
    pub name: &'static str,
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    hold: Option<Arc<Semaphore>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Let `n` held responses complete.
    pub fn release(&self, n: usize) {
        if let Some(hold) = &self.hold {
            hold.add_permits(n);
        }
    }

    /// Wait until at least `n` requests have arrived.
    pub async fn wait_for_hits(&self, n: usize) {
        wait_until(|| self.hits() >= n).await;
    }
}

async fn mock_handler(State(state): State<MockState>, uri: Uri, headers: HeaderMap) -> impl IntoResponse {
    let text = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    state.seen.lock().unwrap().push(SeenRequest {
        path_and_query: uri.path_and_query().map(|p| p.to_string()).unwrap_or_default(),
        host: text(header::HOST.as_str()),
        forwarded_host: text("x-forwarded-host"),
        forwarded_for: text("x-forwarded-for"),
    });

    if let Some(hold) = &state.hold {
        if let Ok(permit) = hold.acquire().await {
            permit.forget();
        }
    }

    (
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "https://backend.example"),
            (header::X_FRAME_OPTIONS, "DENY"),
        ],
        state.name,
    )
}

async fn spawn_backend(name: &'static str, hold: Option<Arc<Semaphore>>) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let app = Router::new().fallback(mock_handler).with_state(MockState {
        name,
        seen: seen.clone(),
        hold: hold.clone(),
    });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { name, addr, seen, hold }
}

/// Start a backend that responds immediately.
pub async fn start_mock_backend(name: &'static str) -> MockBackend {
    spawn_backend(name, None).await
}

/// Start a backend that holds every response until `release` is called.
pub async fn start_held_backend(name: &'static str) -> MockBackend {
    spawn_backend(name, Some(Arc::new(Semaphore::new(0)))).await
}

/// A running proxy on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub store: Arc<ConfigStore>,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy on `config` (TOML text).
pub async fn start_proxy(config: &str) -> TestProxy {
    let snapshot = RoutingSnapshot::build(parse_config(config).unwrap()).unwrap();
    start_proxy_with_store(Arc::new(ConfigStore::new(snapshot))).await
}

pub async fn start_proxy_with_store(store: Arc<ConfigStore>) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(store.clone()).unwrap();
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestProxy { addr, store, shutdown }
}

/// One tenant table.
pub fn app_toml(name: &str, server_name: &str, backends: &[String], max_requests: usize, queue_size: usize) -> String {
    let list = backends.iter().map(|b| format!("{b:?}")).collect::<Vec<_>>().join(", ");
    format!(
        "[apps.{name}]\nserver_name = {server_name:?}\nbackends = [{list}]\nmax_requests = {max_requests}\nqueue_size = {queue_size}\n\n"
    )
}

/// Poll `cond` until it holds, failing after five seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().build().unwrap()
}
