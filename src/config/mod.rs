//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → routing::RoutingSnapshot::build (compile tenants)
//!     → store.rs (published as the current snapshot)
//!
//! On change notification (or SIGHUP):
//!     watcher.rs detects change
//!     → Reloader loads, validates and builds a new snapshot
//!     → atomic swap in ConfigStore
//!     → new requests see the new snapshot; in-flight ones keep theirs
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - A failed reload never replaces a working snapshot
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, GatewayConfig, GlobalConfig, LoadBalance};
pub use store::ConfigStore;
pub use watcher::{ConfigWatcher, Reloader};
