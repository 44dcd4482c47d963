//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, preflight, Host resolution)
//!     → dispatch.rs (admission, backend pick, header rewrite, forward)
//!     → body.rs (response body carries the running slot)
//!     → response.rs (error statuses and bodies)
//!     → Send to client
//!
//! cdn.rs serves a static directory on its own listener.
//! ```

pub mod body;
pub mod cdn;
pub mod dispatch;
pub mod headers;
pub mod response;
pub mod server;

pub use response::GatewayError;
pub use server::HttpServer;
