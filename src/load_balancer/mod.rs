//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Tenant admitted
//!     → round_robin.rs (BackendSet::next rotates a shared cursor)
//!     → backend.rs (base URL joined with the request path and query)
//!     → Forwarded by http::dispatch
//! ```
//!
//! # Design Decisions
//! - Backends are parsed once per snapshot; selection never fails
//! - No health checks or failover: an unreachable pick is a 502

pub mod backend;
pub mod round_robin;

pub use backend::{Backend, BackendError};
pub use round_robin::BackendSet;
