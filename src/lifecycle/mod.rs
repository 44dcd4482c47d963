//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build snapshot → Metrics → Watcher + reloader
//!         → CDN listener → Proxy listener
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → broadcast → listeners drain, reloader exits
//!
//! Signals (signals.rs):
//!     SIGHUP → reload trigger
//! ```
//!
//! # Design Decisions
//! - Fail fast: config, bind and TLS errors at startup are fatal
//! - A watcher that cannot start is logged; SIGHUP still reloads
//! - Listeners start last (traffic only when ready)

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, StartupError};
