//! Persisted rule artifact subsystem.
//!
//! # Data Flow
//! ```text
//! PathConfig change (startup, hot reload, admin save, mask-cli)
//!     → block.rs (render marker-delimited rewrite block)
//!     → sync.rs (read file, strip old block, append new, replace file)
//!
//! Teardown:
//!     → sync.rs (read file, strip block, replace file)
//! ```
//!
//! # Design Decisions
//! - Only the text between the markers is ever touched
//! - Full regeneration on every write, no incremental patching
//! - I/O failures degrade to in-memory routing, never fail a request

pub mod block;
pub mod sync;

pub use block::{render_block, strip_block, DEFAULT_MARKER};
pub use sync::{ArtifactError, RuleArtifact, SyncReport};
