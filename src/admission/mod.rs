//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved tenant
//!     → gate.rs (reserve waiting token, non-blocking)
//!         → none left: Rejection::QueueFull (503, backend untouched)
//!     → gate.rs (wait for a running slot, token held)
//!     → token returned, RunningPermit handed to the dispatcher
//!     → permit travels with the response body, dropped when streaming ends
//! ```
//!
//! # Design Decisions
//! - Reserve-queue-then-block: the capacity bound is C + Q by construction
//! - No ordering guarantee among waiters beyond the semaphore's own
//! - No timeout; abandonment is an explicit hook (`admit_or_abandon`)
//! - One gate per tenant per snapshot; reloads build fresh gates

pub mod gate;

pub use gate::{AdmissionGate, Occupancy, Rejection, RunningPermit};
