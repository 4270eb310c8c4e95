//! Outbound body rewriting.
//!
//! # Responsibilities
//! - Decide whether a finished response body may be rewritten at all
//! - Apply the replacement table to the buffered bytes exactly once
//!
//! # Guards (all must pass)
//! ```text
//! request kind      Document only (admin, data, background and feed skip)
//! table             non-empty
//! encoding          identity (compressed bodies are opaque)
//! size              >= min_bytes
//! content type      absent, text/html or application/xhtml+xml
//! ```
//!
//! # Design Decisions
//! - Fail open: when in doubt the original bytes go out untouched
//! - No re-encoding or whitespace changes; only matched substrings differ

use serde::Serialize;
use std::borrow::Cow;

use crate::masking::table::ReplacementTable;

/// Bodies smaller than this are not worth scanning.
pub const MIN_REWRITE_BYTES: usize = 255;

/// What kind of request produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// A page rendered for a visitor.
    Document,
    /// Administrative UI.
    Admin,
    /// Programmatic/data endpoints (AJAX, REST, XML-RPC).
    Data,
    /// Background task runners.
    Background,
    /// Syndication feeds.
    Feed,
}

/// Why a body was passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Admin,
    Data,
    Background,
    Feed,
    EmptyTable,
    Encoded,
    BelowThreshold,
    ContentType,
    AlreadyMasked,
    /// Body larger than the proxy is willing to buffer.
    TooLarge,
    /// HEAD request, or a status that carries no body.
    NoBody,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Admin => "admin",
            SkipReason::Data => "data",
            SkipReason::Background => "background",
            SkipReason::Feed => "feed",
            SkipReason::EmptyTable => "empty_table",
            SkipReason::Encoded => "encoded",
            SkipReason::BelowThreshold => "below_threshold",
            SkipReason::ContentType => "content_type",
            SkipReason::AlreadyMasked => "already_masked",
            SkipReason::TooLarge => "too_large",
            SkipReason::NoBody => "no_body",
        }
    }
}

/// Response facts the guards look at.
#[derive(Debug, Clone, Copy)]
pub struct ResponseMeta<'a> {
    pub kind: RequestKind,
    pub content_type: Option<&'a str>,
    pub content_encoding: Option<&'a str>,
}

impl<'a> ResponseMeta<'a> {
    pub fn document(content_type: Option<&'a str>) -> Self {
        Self {
            kind: RequestKind::Document,
            content_type,
            content_encoding: None,
        }
    }
}

/// Result of one rewrite attempt.
#[derive(Debug)]
pub enum Rewrite<'a> {
    /// The table ran over the body. It may still be byte-identical if nothing matched.
    Applied(Cow<'a, [u8]>),
    /// The body must go out as-is.
    Skipped(SkipReason),
}

/// Applies a replacement table to finished response bodies.
#[derive(Debug, Clone, Copy)]
pub struct OutputRewriter {
    min_bytes: usize,
}

impl Default for OutputRewriter {
    fn default() -> Self {
        Self::new(MIN_REWRITE_BYTES)
    }
}

impl OutputRewriter {
    pub fn new(min_bytes: usize) -> Self {
        Self { min_bytes }
    }

    pub fn min_bytes(&self) -> usize {
        self.min_bytes
    }

    /// Guards that only need the request and headers. Checked before the body
    /// is buffered so skipped responses can stream straight through.
    pub fn precheck(&self, meta: &ResponseMeta<'_>, table: &ReplacementTable) -> Result<(), SkipReason> {
        match meta.kind {
            RequestKind::Document => {}
            RequestKind::Admin => return Err(SkipReason::Admin),
            RequestKind::Data => return Err(SkipReason::Data),
            RequestKind::Background => return Err(SkipReason::Background),
            RequestKind::Feed => return Err(SkipReason::Feed),
        }

        if table.is_empty() {
            return Err(SkipReason::EmptyTable);
        }

        if let Some(encoding) = meta.content_encoding {
            if !encoding.trim().eq_ignore_ascii_case("identity") {
                return Err(SkipReason::Encoded);
            }
        }

        match meta.content_type {
            Some(ct) if !is_markup_type(ct) => Err(SkipReason::ContentType),
            _ => Ok(()),
        }
    }

    /// Run every guard and, if they pass, the table.
    pub fn rewrite<'b>(
        &self,
        meta: &ResponseMeta<'_>,
        buffer: &'b [u8],
        table: &ReplacementTable,
    ) -> Rewrite<'b> {
        if let Err(reason) = self.precheck(meta, table) {
            return Rewrite::Skipped(reason);
        }

        if buffer.len() < self.min_bytes {
            return Rewrite::Skipped(SkipReason::BelowThreshold);
        }

        Rewrite::Applied(table.apply_bytes(buffer))
    }
}

/// `text/html` or `application/xhtml+xml`, ignoring parameters and case.
pub fn is_markup_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    essence.eq_ignore_ascii_case("text/html") || essence.eq_ignore_ascii_case("application/xhtml+xml")
}
