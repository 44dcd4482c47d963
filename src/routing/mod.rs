//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (Host header)
//!     → router.rs (ordered tenant scan)
//!     → matcher.rs (compiled glob against raw Host)
//!     → Return: matched TenantRuntime or NoMatch (404)
//!
//! Snapshot compilation (startup and every reload):
//!     AppConfig[] (declaration order)
//!     → tenant.rs (compile matcher, parse backends, fresh gate)
//!     → Freeze as immutable RoutingSnapshot
//! ```
//!
//! # Design Decisions
//! - Snapshots compiled off the request path, immutable at runtime
//! - Deterministic: same config always resolves the same way
//! - First match wins (declaration order)

pub mod matcher;
pub mod router;
pub mod tenant;

pub use matcher::HostMatcher;
pub use router::RoutingSnapshot;
pub use tenant::TenantRuntime;
