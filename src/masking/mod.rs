//! Path-masking engine.
//!
//! # Data Flow
//! ```text
//! raw [paths] table
//!     → paths.rs (sanitize → PathConfig)
//!     → snapshot.rs (PathConfig + layout + origins + routes, one per generation)
//!         → table.rs (ReplacementTable, built lazily once per snapshot)
//!             → url.rs (UrlInterceptor: single URL values, headers, image records)
//!             → output.rs (OutputRewriter: whole response bodies, behind guards)
//!
//! control.rs swaps snapshots on reload/save and regenerates the rule artifact.
//! ```
//!
//! # Design Decisions
//! - One table per snapshot; URL and body rewriting share it
//! - Never partially applied: the whole table or nothing
//! - Fail open: a skipped rewrite leaks a real path, it never breaks a page

pub mod control;
pub mod output;
pub mod paths;
pub mod snapshot;
pub mod table;
pub mod url;

pub use control::MaskControl;
pub use output::{OutputRewriter, RequestKind, ResponseMeta, Rewrite, SkipReason};
pub use paths::{InternalLayout, PathConfig, PathRole, RawPaths, SanitizePolicy};
pub use snapshot::MaskSnapshot;
pub use table::{EntryContext, ReplacementEntry, ReplacementTable};
pub use url::{AttachmentSource, SrcsetSource, UrlHook, UrlInterceptor};
