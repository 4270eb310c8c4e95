//! Inbound rewrite matchers.
//!
//! # Responsibilities
//! - Match a root-stripped request path (`assets/x.css`, no leading slash)
//! - Produce the internal target path on match
//!
//! # Design Decisions
//! - Masking rules use literal prefix/exact comparison, no regex in the hot path
//! - Operator rules are regexes with `$n` capture expansion
//! - Matching is case-sensitive, like the web server rules they mirror

use regex::Regex;

/// Rewrites a root-stripped request path to an internal target.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns the internal target if this rule applies.
    fn rewrite(&self, path: &str) -> Option<String>;

    /// Rule rendered as `pattern -> target` for listings.
    fn describe(&self) -> String;
}

/// `^<segment>/(.*)$` → `<target>/$1`.
#[derive(Debug, Clone)]
pub struct SegmentMatcher {
    segment: String,
    target: String,
}

impl SegmentMatcher {
    pub fn new(segment: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            target: target.into().trim_matches('/').to_string(),
        }
    }
}

impl Matcher for SegmentMatcher {
    fn rewrite(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(&self.segment)?.strip_prefix('/')?;
        if rest.contains('\n') {
            return None;
        }
        Some(format!("{}/{}", self.target, rest))
    }

    fn describe(&self) -> String {
        format!("^{}/(.*)$ -> {}/$1", regex::escape(&self.segment), self.target)
    }
}

/// `<segment>` or `<segment>/` → fixed endpoint.
#[derive(Debug, Clone)]
pub struct ExactMatcher {
    segment: String,
    target: String,
}

impl ExactMatcher {
    pub fn new(segment: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            target: target.into().trim_matches('/').to_string(),
        }
    }
}

impl Matcher for ExactMatcher {
    fn rewrite(&self, path: &str) -> Option<String> {
        let path = path.strip_suffix('/').unwrap_or(path);
        (path == self.segment).then(|| self.target.clone())
    }

    fn describe(&self) -> String {
        format!("^{}/?$ -> {}", regex::escape(&self.segment), self.target)
    }
}

/// Operator-supplied regex rule with `$n` / `${name}` expansion.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    pattern: Regex,
    target: String,
}

impl RegexMatcher {
    pub fn new(pattern: &str, target: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            target: target.into(),
        })
    }
}

impl Matcher for RegexMatcher {
    fn rewrite(&self, path: &str) -> Option<String> {
        let captures = self.pattern.captures(path)?;
        let mut out = String::new();
        captures.expand(&self.target, &mut out);
        Some(out.trim_start_matches('/').to_string())
    }

    fn describe(&self) -> String {
        format!("{} -> {}", self.pattern.as_str(), self.target)
    }
}
