//! Multi-tenant reverse proxy library.
//!
//! Requests are routed to a tenant by Host glob, admitted through the
//! tenant's running/waiting gate, and forwarded round-robin to its backends.
//! Configuration is TOML and reloads without a restart.

pub mod admission;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
