//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the masking proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::artifact::DEFAULT_MARKER;
use crate::masking::output::MIN_REWRITE_BYTES;
use crate::masking::paths::{InternalLayout, RawPaths};

/// Root configuration for the masking proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The application being masked.
    pub upstream: UpstreamConfig,

    /// Site origins used for absolute-URL variants.
    pub site: SiteConfig,

    /// Real internal names of the masked locations.
    pub layout: InternalLayout,

    /// Raw operator path segments, sanitized on load.
    pub paths: RawPaths,

    /// Output rewriting behaviour.
    pub masking: MaskingConfig,

    /// Persisted rule artifact.
    pub artifact: ArtifactConfig,

    /// Operator rewrite rules. Masking rules always take precedence.
    pub rewrites: Vec<RewriteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream application server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:8000").
    pub address: String,

    /// Largest response body buffered for rewriting. Larger bodies stream through.
    pub max_buffer_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".to_string(),
            max_buffer_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Site identity as stored, not as rendered.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site and home origins, e.g. `https://example.com` or `https://example.com/blog`.
    pub origins: Vec<String>,
}

/// Output rewriting and request classification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Master switch for body and header rewriting. Inbound routing stays on.
    pub enabled: bool,

    /// Bodies smaller than this are passed through.
    pub min_rewrite_bytes: usize,

    /// Allow the comments segment to be emptied (disables that mask).
    pub allow_empty_comments: bool,

    /// Path prefixes of administrative requests.
    pub admin_prefixes: Vec<String>,

    /// Path prefixes of programmatic/data requests.
    pub data_prefixes: Vec<String>,

    /// Query keys that mark a data request (e.g. `rest_route`).
    pub data_query_keys: Vec<String>,

    /// Path prefixes of background task runners.
    pub background_prefixes: Vec<String>,

    /// Path segment that marks a feed (e.g. `feed` in `/category/x/feed/`).
    pub feed_segment: String,

    /// Query keys that mark a feed request.
    pub feed_query_keys: Vec<String>,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_rewrite_bytes: MIN_REWRITE_BYTES,
            allow_empty_comments: false,
            admin_prefixes: vec!["/wp-admin/".to_string(), "/wp-login.php".to_string()],
            data_prefixes: vec![
                "/wp-admin/admin-ajax.php".to_string(),
                "/wp-json/".to_string(),
                "/xmlrpc.php".to_string(),
            ],
            data_query_keys: vec!["rest_route".to_string()],
            background_prefixes: vec!["/wp-cron.php".to_string()],
            feed_segment: "feed".to_string(),
            feed_query_keys: vec!["feed".to_string()],
        }
    }
}

/// Rule artifact configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// File that receives the rule block (e.g. the site's `.htaccess`). Unset disables sync.
    pub path: Option<String>,

    /// Marker name used in `# BEGIN` / `# END` lines.
    pub marker: String,

    /// Strip the block when the proxy shuts down.
    pub remove_on_shutdown: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: None,
            marker: DEFAULT_MARKER.to_string(),
            remove_on_shutdown: false,
        }
    }
}

/// Operator rewrite rule, evaluated after the masking rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RewriteConfig {
    /// Rule identifier for logging.
    pub name: String,

    /// Regex matched against the path without its leading slash.
    pub pattern: String,

    /// Internal target; `$1`-style captures are expanded.
    pub target: String,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [paths]
            uploads = "media"
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.uploads.as_deref(), Some("media"));
        assert!(config.paths.content.is_none());
        assert_eq!(config.layout, InternalLayout::default());
        assert_eq!(config.masking.min_rewrite_bytes, 255);
        assert_eq!(config.artifact.marker, "PATH_MASK");
    }

    #[test]
    fn full_toml_parses() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [upstream]
            address = "10.0.0.5:80"

            [site]
            origins = ["https://example.com", "https://www.example.com"]

            [paths]
            content = "assets"
            includes = "core"
            uploads = "media"
            comments = "submit"

            [artifact]
            path = "/var/www/html/.htaccess"
            remove_on_shutdown = true

            [[rewrites]]
            name = "legacy-shop"
            pattern = "^shop/(.*)$"
            target = "store/$1"
            "#,
        )
        .unwrap();
        assert_eq!(config.site.origins.len(), 2);
        assert_eq!(config.rewrites[0].target, "store/$1");
        assert_eq!(config.artifact.path.as_deref(), Some("/var/www/html/.htaccess"));
    }
}
