//! Request dispatch for a resolved tenant.
//!
//! # Data Flow
//! ```text
//! resolved tenant + request
//!     → buffer body (admission may outlast a single network read)
//!                               → 413 past max_body_size
//!     → gate.admit()            → 503 on full queue
//!     → BackendSet::next()
//!     → rewrite URI, Host, X-Forwarded-*
//!     → forward                 → 502 on backend failure
//!     → CORS policy on response headers
//!     → body streamed back, running slot released when it ends
//! ```

use std::error::Error as _;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response};
use http_body_util::LengthLimitError;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::http::body::AdmittedBody;
use crate::http::headers::{append_forwarded_for, apply_cors_policy, strip_hop_by_hop, X_FORWARDED_HOST};
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::routing::TenantRuntime;

/// Outbound client for http and https backends.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the shared backend client.
pub fn build_client() -> Result<HttpClient, rustls::Error> {
    let connector = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::aws_lc_rs::default_provider())?
        .https_or_http()
        .enable_http1()
        .build();
    Ok(Client::builder(TokioExecutor::new()).build(connector))
}

/// Runs admission, selection and forwarding for one request.
#[derive(Clone)]
pub struct Dispatcher {
    client: HttpClient,
    body_limit: usize,
}

impl Dispatcher {
    /// `body_limit` of `None` buffers request bodies of any size.
    pub fn new(client: HttpClient, body_limit: Option<usize>) -> Self {
        Self {
            client,
            body_limit: body_limit.unwrap_or(usize::MAX),
        }
    }

    /// Forward `request` to one of `tenant`'s backends.
    ///
    /// `host` is the inbound Host value the tenant was resolved from. The
    /// returned response body owns the running slot.
    pub async fn dispatch(
        &self,
        tenant: &Arc<TenantRuntime>,
        host: &str,
        request: Request<Body>,
        client_ip: Option<IpAddr>,
    ) -> Result<Response<Body>, GatewayError> {
        let started = Instant::now();
        let (parts, body) = request.into_parts();

        let body = axum::body::to_bytes(body, self.body_limit).await.map_err(|e| {
            if exceeds_limit(&e) {
                GatewayError::PayloadTooLarge
            } else {
                GatewayError::BodyRead(e)
            }
        })?;

        let permit = tenant.gate().admit().await.map_err(|rejection| {
            tracing::warn!(tenant = %tenant.name(), reason = %rejection, "Admission rejected");
            metrics::record_rejected(tenant.name());
            GatewayError::AdmissionRejected
        })?;

        let backend = tenant.backends().next();
        let uri = backend
            .target_uri(&parts.uri)
            .map_err(|e| GatewayError::BackendFailure(Box::new(e)))?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        if let Ok(authority) = HeaderValue::from_str(backend.authority().as_str()) {
            headers.insert(header::HOST, authority);
        }
        if let Ok(forwarded_host) = HeaderValue::from_str(host) {
            headers.insert(X_FORWARDED_HOST, forwarded_host);
        }
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut headers, ip);
        }

        tracing::debug!(
            tenant = %tenant.name(),
            backend = %backend,
            method = %parts.method,
            uri = %uri,
            "Forwarding request"
        );

        let mut outbound = Request::new(Body::from(body));
        *outbound.method_mut() = parts.method;
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        let response = self.client.request(outbound).await.map_err(|e| {
            tracing::error!(tenant = %tenant.name(), backend = %backend, error = %e, "Upstream error");
            GatewayError::BackendFailure(Box::new(e))
        })?;

        let (mut parts, incoming) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        apply_cors_policy(&mut parts.headers);

        let body = Body::new(AdmittedBody::new(Body::new(incoming), permit, started));
        Ok(Response::from_parts(parts, body))
    }
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
