//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Activate (sync rule artifact) → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections
//!     → Deactivate (strip rule block, when configured) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Activation failures are logged, not fatal: in-process routing still works
//! - The block is only stripped on shutdown when `remove_on_shutdown` is set,
//!   since the web server may keep serving from the artifact

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
