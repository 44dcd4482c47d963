//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend base URL
//! - Pre-compute the pieces a forwarded request needs (scheme, authority,
//!   base path) so the hot path does no URL parsing

use std::fmt;

use axum::http::uri::{Authority, PathAndQuery, Scheme, Uri};
use thiserror::Error;
use url::Url;

/// Why a backend URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{0}")]
    Parse(String),
    #[error("unsupported scheme '{0}' (expected http or https)")]
    Scheme(String),
    #[error("missing host")]
    MissingHost,
    #[error("invalid authority '{0}'")]
    Authority(String),
}

/// A single backend server.
#[derive(Debug, Clone)]
pub struct Backend {
    /// The URL as configured.
    pub url: Url,
    scheme: Scheme,
    authority: Authority,
    /// Base path with any trailing '/' removed ("" for the root).
    base_path: String,
}

impl Backend {
    /// Parse a backend base URL such as `http://10.0.0.5:8080/api`.
    pub fn parse(raw: &str) -> Result<Self, BackendError> {
        let url = Url::parse(raw).map_err(|e| BackendError::Parse(e.to_string()))?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(BackendError::Scheme(other.to_string())),
        };

        let host = url.host_str().ok_or(BackendError::MissingHost)?;
        let authority_str = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::try_from(authority_str.as_str())
            .map_err(|_| BackendError::Authority(authority_str.clone()))?;

        let base_path = url.path().trim_end_matches('/').to_string();

        Ok(Self {
            url,
            scheme,
            authority,
            base_path,
        })
    }

    /// Host (and port) of the backend, used for the outbound Host header.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Build the outbound URI: backend scheme and authority, backend base path
    /// prefixed to the inbound path, inbound query preserved.
    pub fn target_uri(&self, inbound: &Uri) -> Result<Uri, axum::http::Error> {
        let path = inbound.path();
        let mut target = String::with_capacity(self.base_path.len() + path.len() + 16);
        target.push_str(&self.base_path);
        if !path.starts_with('/') {
            target.push('/');
        }
        target.push_str(path);
        if let Some(query) = inbound.query() {
            target.push('?');
            target.push_str(query);
        }

        let path_and_query = PathAndQuery::try_from(target)?;
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_backend() {
        let backend = Backend::parse("http://127.0.0.1:3000").unwrap();
        assert_eq!(backend.authority().as_str(), "127.0.0.1:3000");

        let inbound: Uri = "/users/42?full=1".parse().unwrap();
        assert_eq!(
            backend.target_uri(&inbound).unwrap().to_string(),
            "http://127.0.0.1:3000/users/42?full=1"
        );
    }

    #[test]
    fn test_base_path_prefix() {
        let backend = Backend::parse("https://api.internal/v2/").unwrap();
        assert_eq!(backend.authority().as_str(), "api.internal");

        let inbound: Uri = "/items".parse().unwrap();
        assert_eq!(
            backend.target_uri(&inbound).unwrap().to_string(),
            "https://api.internal/v2/items"
        );
    }

    #[test]
    fn test_absolute_form_inbound() {
        let backend = Backend::parse("http://10.0.0.1:8080/base").unwrap();
        let inbound: Uri = "http://public.example.com/x".parse().unwrap();
        assert_eq!(
            backend.target_uri(&inbound).unwrap().to_string(),
            "http://10.0.0.1:8080/base/x"
        );
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(Backend::parse("not a url"), Err(BackendError::Parse(_))));
        assert_eq!(
            Backend::parse("ftp://files.example.com").unwrap_err(),
            BackendError::Scheme("ftp".into())
        );
    }
}
