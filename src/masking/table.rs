//! Replacement table construction and application.
//!
//! # Responsibilities
//! - Derive (real fragment → virtual fragment) pairs from a `PathConfig`
//! - Expand each pair into root-relative, origin-qualified and escaped variants
//! - Apply the whole table in one literal, case-insensitive pass
//!
//! # Table Order
//! ```text
//! plain             /wp-content/uploads/  /wp-content/  /wp-includes/  /wp-comments-post.php
//! domain-qualified  <origin> + each plain entry, per configured origin
//! escaped           \/wp-content\/uploads\/ ...
//! escaped, trimmed  \/wp-content\/uploads ...
//! ```
//!
//! # Design Decisions
//! - One multi-pattern automaton, not sequential passes: output of one
//!   mapping is never re-scanned by another
//! - Leftmost-longest matching: at a given position the most specific real
//!   fragment always wins, whatever context class it came from
//! - All patterns are literals; no regex backtracking

use aho_corasick::{AhoCorasick, MatchKind};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashSet;

use crate::masking::paths::{InternalLayout, PathConfig, PathRole};

/// Where a table entry is expected to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryContext {
    /// Root-relative: `/wp-content/`.
    Plain,
    /// Absolute URL on one of the site origins.
    DomainQualified,
    /// Slash-escaped, as found inside JSON or inline scripts: `\/wp-content\/`.
    Escaped,
}

/// A single literal substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementEntry {
    pub from: String,
    pub to: String,
    pub role: PathRole,
    pub context: EntryContext,
    /// Trailing slash removed from both sides.
    pub trimmed: bool,
}

/// Real and virtual fragment for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FragmentPair {
    role: PathRole,
    real: String,
    virtual_: String,
}

impl FragmentPair {
    fn new(role: PathRole, real: &str, virtual_segment: &str) -> Self {
        if role.is_directory() {
            Self {
                role,
                real: format!("/{}/", real),
                virtual_: format!("/{}/", virtual_segment),
            }
        } else {
            Self {
                role,
                real: format!("/{}", real),
                virtual_: format!("/{}", virtual_segment),
            }
        }
    }
}

/// The full ordered substitution table for one `PathConfig`.
///
/// Built once per configuration generation and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ReplacementTable {
    entries: Vec<ReplacementEntry>,
    matcher: Option<AhoCorasick>,
}

impl ReplacementTable {
    /// Build the table for `paths` over the real `layout`.
    ///
    /// `origins` are the site origins (`https://example.com`, optionally with a
    /// sub-directory) read from raw configuration.
    pub fn build(paths: &PathConfig, layout: &InternalLayout, origins: &[String]) -> Self {
        let pairs = order_by_specificity(
            paths
                .active_roles()
                .filter(|role| !paths.is_identity(*role, layout))
                .map(|role| FragmentPair::new(role, layout.real(role), paths.get(role)))
                .collect(),
        );

        let mut entries = Vec::with_capacity(pairs.len() * (origins.len() + 3));
        let mut seen = HashSet::new();
        let mut push = |entry: ReplacementEntry| {
            if seen.insert(entry.from.to_ascii_lowercase()) {
                entries.push(entry);
            }
        };

        for pair in &pairs {
            push(ReplacementEntry {
                from: pair.real.clone(),
                to: pair.virtual_.clone(),
                role: pair.role,
                context: EntryContext::Plain,
                trimmed: false,
            });
        }

        for origin in origins {
            let origin = origin.trim_end_matches('/');
            if origin.is_empty() {
                continue;
            }
            for pair in &pairs {
                push(ReplacementEntry {
                    from: format!("{}{}", origin, pair.real),
                    to: format!("{}{}", origin, pair.virtual_),
                    role: pair.role,
                    context: EntryContext::DomainQualified,
                    trimmed: false,
                });
            }
        }

        for pair in &pairs {
            push(ReplacementEntry {
                from: escape_slashes(&pair.real),
                to: escape_slashes(&pair.virtual_),
                role: pair.role,
                context: EntryContext::Escaped,
                trimmed: false,
            });
        }

        for pair in &pairs {
            push(ReplacementEntry {
                from: trim_escaped(&escape_slashes(&pair.real)).to_string(),
                to: trim_escaped(&escape_slashes(&pair.virtual_)).to_string(),
                role: pair.role,
                context: EntryContext::Escaped,
                trimmed: true,
            });
        }

        let matcher = if entries.is_empty() {
            None
        } else {
            match AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .ascii_case_insensitive(true)
                .build(entries.iter().map(|e| e.from.as_str()))
            {
                Ok(ac) => Some(ac),
                Err(e) => {
                    // Whole table or nothing.
                    tracing::warn!(error = %e, patterns = entries.len(), "Failed to compile replacement table");
                    None
                }
            }
        };

        Self { entries, matcher }
    }

    /// Entries in table order.
    pub fn entries(&self) -> &[ReplacementEntry] {
        &self.entries
    }

    /// True when applying the table can never change anything.
    pub fn is_empty(&self) -> bool {
        self.matcher.is_none()
    }

    /// Apply the table to a string.
    pub fn apply<'a>(&self, haystack: &'a str) -> Cow<'a, str> {
        match &self.matcher {
            Some(ac) if ac.is_match(haystack) => {
                let replacements: Vec<&str> = self.entries.iter().map(|e| e.to.as_str()).collect();
                Cow::Owned(ac.replace_all(haystack, &replacements))
            }
            _ => Cow::Borrowed(haystack),
        }
    }

    /// Apply the table to raw bytes. Bytes outside matches are copied untouched.
    pub fn apply_bytes<'a>(&self, haystack: &'a [u8]) -> Cow<'a, [u8]> {
        match &self.matcher {
            Some(ac) if ac.is_match(haystack) => {
                let replacements: Vec<&[u8]> =
                    self.entries.iter().map(|e| e.to.as_bytes()).collect();
                Cow::Owned(ac.replace_all_bytes(haystack, &replacements))
            }
            _ => Cow::Borrowed(haystack),
        }
    }
}

/// Order pairs so that a real fragment never precedes a more specific one it
/// is a prefix of. Otherwise the incoming order is kept.
fn order_by_specificity(pairs: Vec<FragmentPair>) -> Vec<FragmentPair> {
    let mut ordered: Vec<FragmentPair> = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let real = pair.real.to_ascii_lowercase();
        let at = ordered
            .iter()
            .position(|p| real.starts_with(&p.real.to_ascii_lowercase()))
            .unwrap_or(ordered.len());
        ordered.insert(at, pair);
    }
    ordered
}

fn escape_slashes(fragment: &str) -> String {
    fragment.replace('/', "\\/")
}

fn trim_escaped(fragment: &str) -> &str {
    fragment.trim_end_matches(['\\', '/'])
}
