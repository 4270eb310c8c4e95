//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (ordered rule lookup, first match wins)
//!     → matcher.rs (segment / exact / regex rewrite)
//!     → Return: internal path or no translation
//!
//! Rule Installation (at startup and on every PathConfig change):
//!     RewriteConfig[]  → operator rules
//!     PathConfig       → masking rules, prepended with top priority
//!     → Freeze as immutable RouteRewriter inside the masking snapshot
//! ```
//!
//! # Design Decisions
//! - Rules rebuilt wholesale on change, never patched in place
//! - Deterministic: same input always matches same rule
//! - The client never sees the translated path

pub mod matcher;
pub mod router;

pub use router::{RewriteRule, RouteRewriter, RuleOrigin, Translation};
