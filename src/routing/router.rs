//! Inbound route translation.
//!
//! # Responsibilities
//! - Hold the ordered rewrite rules (masking rules first, operator rules after)
//! - Translate a masked request path to the real internal path
//!
//! # Design Decisions
//! - Immutable once installed; a new `PathConfig` produces a new rewriter
//! - First match wins, like `[L]` rules in the web server
//! - Translation is internal only: no redirect, no status change
//! - Rules match relative to the site base, so a site served from `/blog`
//!   translates `/blog/media/a.jpg` and keeps the `/blog` prefix

use std::sync::Arc;

use crate::config::RewriteConfig;
use crate::masking::paths::{InternalLayout, PathConfig, PathRole};
use crate::routing::matcher::{ExactMatcher, Matcher, RegexMatcher, SegmentMatcher};

/// Where a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOrigin {
    /// Installed from the path-masking config.
    Masking(PathRole),
    /// Configured by the operator.
    Operator,
}

impl RuleOrigin {
    /// Metric/log label: the role key, or `operator`.
    pub fn label(&self) -> &'static str {
        match self {
            RuleOrigin::Masking(role) => role.key(),
            RuleOrigin::Operator => "operator",
        }
    }
}

/// A named inbound rewrite rule.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub name: String,
    pub origin: RuleOrigin,
    matcher: Arc<dyn Matcher>,
}

impl RewriteRule {
    pub fn new(name: impl Into<String>, origin: RuleOrigin, matcher: Arc<dyn Matcher>) -> Self {
        Self {
            name: name.into(),
            origin,
            matcher,
        }
    }

    /// Compile an operator rule.
    pub fn operator(config: &RewriteConfig) -> Result<Self, regex::Error> {
        let matcher = RegexMatcher::new(&config.pattern, config.target.clone())?;
        Ok(Self::new(config.name.clone(), RuleOrigin::Operator, Arc::new(matcher)))
    }

    /// The masking rule for one role, if the role is masked.
    pub fn for_role(role: PathRole, paths: &PathConfig, layout: &InternalLayout) -> Option<Self> {
        let segment = paths.get(role);
        if segment.is_empty() || paths.is_identity(role, layout) {
            return None;
        }
        let real = layout.real(role);
        let matcher: Arc<dyn Matcher> = if role.is_directory() {
            Arc::new(SegmentMatcher::new(segment, real))
        } else {
            Arc::new(ExactMatcher::new(segment, real))
        };
        Some(Self::new(format!("mask-{}", role), RuleOrigin::Masking(role), matcher))
    }

    pub fn describe(&self) -> String {
        self.matcher.describe()
    }
}

/// Result of a successful translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub rule: String,
    pub origin: RuleOrigin,
    /// Internal path, with a leading slash and the matched site base.
    pub path: String,
}

/// Ordered inbound rewrite rules.
#[derive(Debug, Clone, Default)]
pub struct RouteRewriter {
    rules: Vec<RewriteRule>,
    /// Site base paths (`/blog`), longest first.
    bases: Vec<String>,
}

impl RouteRewriter {
    /// Create a rewriter holding only operator rules.
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self {
            rules,
            bases: Vec::new(),
        }
    }

    /// Set the site base paths rules are matched under. `/` and empty bases are ignored.
    pub fn set_bases<I, S>(&mut self, bases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = Vec::new();
        for base in bases {
            let base = base.as_ref().trim_matches('/');
            if base.is_empty() {
                continue;
            }
            let base = format!("/{}", base);
            if !cleaned.contains(&base) {
                cleaned.push(base);
            }
        }
        cleaned.sort_by(|a, b| b.len().cmp(&a.len()));
        self.bases = cleaned;
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Build from operator rule configs, dropping (and logging) any that fail to compile.
    pub fn from_config(rewrites: &[RewriteConfig]) -> Self {
        let rules = rewrites
            .iter()
            .filter_map(|config| match RewriteRule::operator(config) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(rule = %config.name, error = %e, "Skipping invalid rewrite rule");
                    None
                }
            })
            .collect();
        Self::new(rules)
    }

    /// Install the masking rules for `paths` ahead of every other rule.
    ///
    /// Previously installed masking rules are replaced; operator rules keep their order.
    pub fn install(&mut self, paths: &PathConfig, layout: &InternalLayout) {
        self.rules.retain(|rule| rule.origin == RuleOrigin::Operator);

        let masking: Vec<RewriteRule> = [
            PathRole::Comments,
            PathRole::Content,
            PathRole::Includes,
            PathRole::Uploads,
        ]
        .into_iter()
        .filter_map(|role| RewriteRule::for_role(role, paths, layout))
        .collect();

        tracing::debug!(
            masking_rules = masking.len(),
            operator_rules = self.rules.len(),
            "Installing route rewrite rules"
        );

        self.rules.splice(0..0, masking);
    }

    /// Translate a request path (`/assets/x.css`). `None` means dispatch unchanged.
    pub fn translate(&self, path: &str) -> Option<Translation> {
        let (base, relative) = self.split_base(path);
        self.rules.iter().find_map(|rule| {
            rule.matcher.rewrite(relative).map(|target| Translation {
                rule: rule.name.clone(),
                origin: rule.origin,
                path: format!("{}/{}", base, target),
            })
        })
    }

    /// Split `path` into the longest matching site base and the rest, without
    /// its leading slash. Paths outside every base are relative to `/`.
    fn split_base<'a>(&'a self, path: &'a str) -> (&'a str, &'a str) {
        for base in &self.bases {
            if let Some(relative) = path.strip_prefix(base.as_str()).and_then(|rest| rest.strip_prefix('/')) {
                return (base.as_str(), relative);
            }
        }
        ("", path.strip_prefix('/').unwrap_or(path))
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }
}
