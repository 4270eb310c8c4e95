//! Request handling and classification.
//!
//! # Responsibilities
//! - Request ID header name shared by the request-id layers
//! - Classify inbound requests into the contexts output rewriting cares about
//!
//! # Design Decisions
//! - Classification looks at the URI only; nothing is buffered
//! - Programmatic endpoints under the admin prefix count as data, not admin

use axum::http::{HeaderName, Uri};

use crate::config::MaskingConfig;
use crate::masking::output::RequestKind;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Maps a request URI to a [`RequestKind`].
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    admin_prefixes: Vec<String>,
    data_prefixes: Vec<String>,
    data_query_keys: Vec<String>,
    background_prefixes: Vec<String>,
    feed_segment: String,
    feed_query_keys: Vec<String>,
}

impl RequestClassifier {
    pub fn from_config(config: &MaskingConfig) -> Self {
        Self {
            admin_prefixes: config.admin_prefixes.clone(),
            data_prefixes: config.data_prefixes.clone(),
            data_query_keys: config.data_query_keys.clone(),
            background_prefixes: config.background_prefixes.clone(),
            feed_segment: config.feed_segment.clone(),
            feed_query_keys: config.feed_query_keys.clone(),
        }
    }

    /// Classify by path prefix first, then by query keys, then by feed segment.
    pub fn classify(&self, uri: &Uri) -> RequestKind {
        let path = uri.path();
        let query = uri.query().unwrap_or("");

        if has_prefix(path, &self.data_prefixes) || has_query_key(query, &self.data_query_keys) {
            return RequestKind::Data;
        }
        if has_prefix(path, &self.background_prefixes) {
            return RequestKind::Background;
        }
        if has_prefix(path, &self.admin_prefixes) {
            return RequestKind::Admin;
        }
        if self.is_feed(path) || has_query_key(query, &self.feed_query_keys) {
            return RequestKind::Feed;
        }
        RequestKind::Document
    }

    fn is_feed(&self, path: &str) -> bool {
        !self.feed_segment.is_empty()
            && path
                .split('/')
                .any(|segment| segment.eq_ignore_ascii_case(&self.feed_segment))
    }
}

fn has_prefix(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        path.starts_with(prefix.as_str())
            // "/wp-admin/" also covers the bare "/wp-admin"
            || prefix.strip_suffix('/').is_some_and(|bare| !bare.is_empty() && path == bare)
    })
}

fn has_query_key(query: &str, keys: &[String]) -> bool {
    if query.is_empty() || keys.is_empty() {
        return false;
    }
    url::form_urlencoded::parse(query.as_bytes()).any(|(key, _)| keys.iter().any(|k| *k == key))
}
