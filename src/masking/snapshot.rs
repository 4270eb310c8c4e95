//! Per-generation masking state.
//!
//! A [`MaskSnapshot`] bundles everything derived from one `PathConfig`: the
//! inbound routes and the lazily built replacement table. Requests take an
//! `Arc` to the current snapshot when they start and use it to the end, so
//! every URL in one response is masked with the same table even if the
//! configuration changes mid-request.

use std::sync::{Arc, OnceLock};
use url::Url;

use crate::config::{sanitized_paths, ProxyConfig};
use crate::masking::paths::{InternalLayout, PathConfig, SanitizePolicy};
use crate::masking::table::ReplacementTable;
use crate::masking::url::UrlInterceptor;
use crate::observability::metrics;
use crate::routing::RouteRewriter;

/// Immutable masking state for one configuration generation.
#[derive(Debug)]
pub struct MaskSnapshot {
    generation: u64,
    paths: PathConfig,
    layout: InternalLayout,
    origins: Vec<String>,
    policy: SanitizePolicy,
    routes: RouteRewriter,
    table: OnceLock<Arc<ReplacementTable>>,
}

impl MaskSnapshot {
    /// Build a snapshot, installing the masking routes ahead of `operator_routes`.
    pub fn new(
        generation: u64,
        paths: PathConfig,
        layout: InternalLayout,
        origins: Vec<String>,
        policy: SanitizePolicy,
        mut operator_routes: RouteRewriter,
    ) -> Self {
        operator_routes.install(&paths, &layout);
        operator_routes.set_bases(base_paths(&origins));
        Self {
            generation,
            paths,
            layout,
            origins,
            policy,
            routes: operator_routes,
            table: OnceLock::new(),
        }
    }

    /// Build from a loaded configuration. Origins come from the raw `site`
    /// table, never from anything this engine rewrites.
    pub fn from_config(config: &ProxyConfig, generation: u64) -> Self {
        let origins = normalize_origins(&config.site.origins);
        Self::new(
            generation,
            sanitized_paths(config),
            config.layout.clone(),
            origins,
            SanitizePolicy {
                allow_empty_comments: config.masking.allow_empty_comments,
            },
            RouteRewriter::from_config(&config.rewrites),
        )
    }

    /// Same layout, origins and operator rules with different path segments.
    pub fn with_paths(&self, paths: PathConfig, generation: u64) -> Self {
        Self::new(
            generation,
            paths,
            self.layout.clone(),
            self.origins.clone(),
            self.policy,
            self.routes.clone(),
        )
    }

    /// The replacement table, built on first use and reused afterwards.
    pub fn table(&self) -> &Arc<ReplacementTable> {
        self.table.get_or_init(|| {
            let table = ReplacementTable::build(&self.paths, &self.layout, &self.origins);
            metrics::record_table_build();
            tracing::debug!(
                generation = self.generation,
                entries = table.entries().len(),
                "Replacement table built"
            );
            Arc::new(table)
        })
    }

    /// URL interceptor over this snapshot's table.
    pub fn urls(&self) -> UrlInterceptor<'_> {
        UrlInterceptor::new(self.table())
    }

    pub fn routes(&self) -> &RouteRewriter {
        &self.routes
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    pub fn layout(&self) -> &InternalLayout {
        &self.layout
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    pub fn policy(&self) -> SanitizePolicy {
        self.policy
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Normalize a configured origin to `scheme://host[:port][/path]` without a
/// trailing slash. `None` for anything that is not an absolute http(s) URL.
pub fn normalize_origin(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url.as_str().trim_end_matches('/').to_string())
}

/// Sub-directory paths of normalized origins (`https://example.com/blog` gives `/blog`).
pub fn base_paths(origins: &[String]) -> Vec<String> {
    origins
        .iter()
        .filter_map(|origin| Url::parse(origin).ok())
        .map(|url| url.path().trim_end_matches('/').to_string())
        .filter(|path| !path.is_empty())
        .collect()
}

/// Normalize and de-duplicate origins, dropping invalid ones.
pub fn normalize_origins(raw: &[String]) -> Vec<String> {
    let mut origins: Vec<String> = Vec::with_capacity(raw.len());
    for origin in raw {
        match normalize_origin(origin) {
            Some(o) if !origins.contains(&o) => origins.push(o),
            Some(_) => {}
            None => tracing::warn!(origin = %origin, "Ignoring invalid site origin"),
        }
    }
    origins
}
