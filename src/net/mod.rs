//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! listen_port / cdn_port string
//!     → listener.rs (normalize ":port", resolve, bind)
//!     → tls.rs (optional certificate + key load)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bind failures are fatal at startup
//! - TLS is used only when both certificate and key paths are set

pub mod listener;
pub mod tls;

pub use listener::{bind, resolve_listen_addr, ListenerError};
pub use tls::{load_tls_config, TlsError};
