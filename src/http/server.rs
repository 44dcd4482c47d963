//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Answer CORS preflight before routing or admission
//! - Resolve the tenant from the current snapshot and hand off to dispatch
//! - Bind server to a plain or TLS listener with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ConfigStore;
use crate::http::dispatch::{build_client, Dispatcher};
use crate::http::headers::apply_cors_policy;
use crate::http::response::GatewayError;
use crate::observability::metrics;

/// How long in-flight TLS connections get to finish on shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub dispatcher: Dispatcher,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server reading routing state from `store`.
    pub fn new(store: Arc<ConfigStore>) -> Result<Self, rustls::Error> {
        let body_limit = store.current().global().max_body_size;
        let state = AppState {
            store,
            dispatcher: Dispatcher::new(build_client()?, body_limit),
        };
        Ok(Self {
            router: Self::build_router(state),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The router, for embedding or testing without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls).handle(handle).serve(app).await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Answers preflight, resolves the tenant, and dispatches.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    if request.method() == Method::OPTIONS {
        return preflight_response();
    }

    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let host = request_host(&request);

    let tenant = match state.store.current().resolve(&host) {
        Some(tenant) => Arc::clone(tenant),
        None => {
            tracing::warn!(request_id = %request_id, host = %host, "No matching application");
            return GatewayError::RouteNotFound.into_response();
        }
    };

    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    tracing::debug!(
        request_id = %request_id,
        tenant = %tenant.name(),
        method = %request.method(),
        path = %request.uri().path(),
        "Proxying request"
    );

    let response = match state.dispatcher.dispatch(&tenant, &host, request, client_ip).await {
        Ok(response) => response,
        Err(e) => {
            if let GatewayError::BodyRead(ref source) = e {
                tracing::error!(request_id = %request_id, tenant = %tenant.name(), error = %source, "Failed to read request body");
            }
            e.into_response()
        }
    };

    metrics::record_request(tenant.name(), response.status().as_u16(), start_time);
    response
}

/// 204 with the fixed CORS header set, for any Host.
fn preflight_response() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    apply_cors_policy(response.headers_mut());
    response
}

/// The raw Host value: the Host header, or the URI authority for HTTP/2.
fn request_host(request: &Request<Body>) -> String {
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{AppConfig, GatewayConfig, GlobalConfig, LoadBalance};
    use crate::routing::RoutingSnapshot;
    use bytes::Bytes;
    use http_body::Frame;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tower::ServiceExt;

    /// A request body whose first read fails.
    struct BrokenBody;

    impl http_body::Body for BrokenBody {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, std::io::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "client went away",
            ))))
        }
    }

    fn server() -> (HttpServer, Arc<ConfigStore>) {
        server_with_limit(None)
    }

    fn server_with_limit(max_body_size: Option<usize>) -> (HttpServer, Arc<ConfigStore>) {
        let snapshot = RoutingSnapshot::build(GatewayConfig {
            global: GlobalConfig {
                max_body_size,
                ..Default::default()
            },
            apps: vec![AppConfig {
                name: "web".into(),
                server_name: "*.example.com".into(),
                // Nothing listens on port 1.
                backends: vec!["http://127.0.0.1:1".into()],
                max_requests: 1,
                queue_size: 1,
                load_balance: LoadBalance::RoundRobin,
                debug: false,
            }],
        })
        .unwrap();
        let store = Arc::new(ConfigStore::new(snapshot));
        (HttpServer::new(store.clone()).unwrap(), store)
    }

    fn request(method: Method, host: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/some/path")
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_preflight_bypasses_routing() {
        let (server, store) = server();
        for host in ["foo.example.com", "unknown.test"] {
            let response = server.router().oneshot(request(Method::OPTIONS, host)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS], "*");
            assert_eq!(response.headers()[header::CONTENT_SECURITY_POLICY], "frame-ancestors *");
        }
        let gate = store.current().tenant("web").unwrap().gate().clone();
        assert_eq!(gate.occupancy().running, 0);
    }

    #[tokio::test]
    async fn test_unknown_host_is_404() {
        let (server, _) = server();
        let response = server.router().oneshot(request(Method::GET, "other.test")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_502_and_slot_released() {
        let (server, store) = server();
        let response = server.router().oneshot(request(Method::GET, "foo.example.com")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let gate = store.current().tenant("web").unwrap().gate().clone();
        assert_eq!(gate.occupancy().running, 0);
    }

    #[tokio::test]
    async fn test_unreadable_body_is_500_without_admission() {
        let (server, store) = server();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(header::HOST, "foo.example.com")
            .body(Body::new(BrokenBody))
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "ALLOWALL");

        let gate = store.current().tenant("web").unwrap().gate().clone();
        assert_eq!(gate.occupancy().running, 0);
        assert_eq!(gate.occupancy().queued, 0);
    }

    #[tokio::test]
    async fn test_oversized_body_is_413_without_admission() {
        let (server, store) = server_with_limit(Some(8));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(header::HOST, "foo.example.com")
            .body(Body::from("well over eight bytes"))
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let gate = store.current().tenant("web").unwrap().gate().clone();
        assert_eq!(gate.occupancy().running, 0);
        assert_eq!(gate.occupancy().queued, 0);
    }

    #[test]
    fn test_request_host_prefers_header() {
        let request = Request::builder()
            .uri("http://authority.example.com/x")
            .header(header::HOST, "header.example.com:8443")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_host(&request), "header.example.com:8443");

        let h2 = Request::builder()
            .uri("https://authority.example.com/x")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_host(&h2), "authority.example.com");
    }
}
