//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, path collision warnings)
//!     → ProxyConfig (validated, immutable)
//!     → PathConfig sanitized from the raw [paths] table
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → MaskControl swaps the masking snapshot and re-syncs the rule artifact
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Path segments are read from the raw table, never from rewritten output

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, sanitized_paths, ConfigError};
pub use schema::{
    AdminConfig, ArtifactConfig, ListenerConfig, MaskingConfig, ObservabilityConfig, ProxyConfig,
    RewriteConfig, SiteConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, validate_paths, ValidationError};
