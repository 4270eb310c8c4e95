//! Path roles, operator segments and segment sanitization.
//!
//! # Responsibilities
//! - Name the four masked roles (content, includes, uploads, comments)
//! - Hold the real internal layout the masks stand in for
//! - Turn raw operator input into a fully populated `PathConfig`
//!
//! # Design Decisions
//! - Sanitization never fails: bad input falls back to the role default
//! - A `PathConfig` is immutable; a changed value produces a new one

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four internal locations that can be masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRole {
    Content,
    Includes,
    Uploads,
    Comments,
}

impl PathRole {
    /// Roles in replacement-table order: uploads sits immediately before content.
    pub const ALL: [PathRole; 4] = [
        PathRole::Uploads,
        PathRole::Content,
        PathRole::Includes,
        PathRole::Comments,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            PathRole::Content => "content",
            PathRole::Includes => "includes",
            PathRole::Uploads => "uploads",
            PathRole::Comments => "comments",
        }
    }

    /// Built-in virtual segment used when operator input is unusable.
    pub fn default_segment(&self) -> &'static str {
        match self {
            PathRole::Content => "wp-content",
            PathRole::Includes => "wp-includes",
            PathRole::Uploads => "uploads",
            PathRole::Comments => "wp-comments-post",
        }
    }

    /// Directory roles map `/<real>/` prefixes; comments maps a single endpoint.
    pub fn is_directory(&self) -> bool {
        !matches!(self, PathRole::Comments)
    }
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Real internal names of the masked locations, relative to the site root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InternalLayout {
    /// Static-asset directory.
    pub content_dir: String,

    /// Library directory.
    pub includes_dir: String,

    /// Upload directory. Usually nested inside `content_dir`.
    pub uploads_dir: String,

    /// Form-submission endpoint for comments.
    pub comments_endpoint: String,
}

impl Default for InternalLayout {
    fn default() -> Self {
        Self {
            content_dir: "wp-content".to_string(),
            includes_dir: "wp-includes".to_string(),
            uploads_dir: "wp-content/uploads".to_string(),
            comments_endpoint: "wp-comments-post.php".to_string(),
        }
    }
}

impl InternalLayout {
    /// Real name for a role, without leading or trailing slashes.
    pub fn real(&self, role: PathRole) -> &str {
        let raw = match role {
            PathRole::Content => &self.content_dir,
            PathRole::Includes => &self.includes_dir,
            PathRole::Uploads => &self.uploads_dir,
            PathRole::Comments => &self.comments_endpoint,
        };
        raw.trim_matches('/')
    }

    /// First path segment of a role's real name (`wp-content` for uploads).
    pub fn real_top_segment(&self, role: PathRole) -> &str {
        let real = self.real(role);
        real.split('/').next().unwrap_or(real)
    }
}

/// Raw, unsanitized segments as they arrive from the configuration store or
/// the settings-save surface. Missing keys mean "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawPaths {
    pub content: Option<String>,
    pub includes: Option<String>,
    pub uploads: Option<String>,
    pub comments: Option<String>,
}

impl RawPaths {
    pub fn get(&self, role: PathRole) -> Option<&str> {
        match role {
            PathRole::Content => self.content.as_deref(),
            PathRole::Includes => self.includes.as_deref(),
            PathRole::Uploads => self.uploads.as_deref(),
            PathRole::Comments => self.comments.as_deref(),
        }
    }
}

/// Sanitization switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizePolicy {
    /// Let an explicitly emptied comments segment stay empty (disables that mask).
    pub allow_empty_comments: bool,
}

/// Validated mapping of role to virtual segment.
///
/// Every non-empty segment matches `[A-Za-z0-9_-]+`. Only the comments role can
/// be empty, and only under [`SanitizePolicy::allow_empty_comments`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathConfig {
    content: String,
    includes: String,
    uploads: String,
    comments: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            content: PathRole::Content.default_segment().to_string(),
            includes: PathRole::Includes.default_segment().to_string(),
            uploads: PathRole::Uploads.default_segment().to_string(),
            comments: PathRole::Comments.default_segment().to_string(),
        }
    }
}

impl PathConfig {
    /// Sanitize raw operator input into a complete config.
    pub fn sanitize(raw: &RawPaths, policy: SanitizePolicy) -> Self {
        let resolve = |role: PathRole| -> String {
            let Some(value) = raw.get(role) else {
                return role.default_segment().to_string();
            };
            match sanitize_segment(value) {
                Some(clean) if !clean.is_empty() => clean,
                Some(_) if role == PathRole::Comments && policy.allow_empty_comments => {
                    String::new()
                }
                _ => {
                    tracing::debug!(role = %role, raw = %value, "Unusable path segment, using default");
                    role.default_segment().to_string()
                }
            }
        };

        Self {
            content: resolve(PathRole::Content),
            includes: resolve(PathRole::Includes),
            uploads: resolve(PathRole::Uploads),
            comments: resolve(PathRole::Comments),
        }
    }

    /// Virtual segment for a role. Empty means the role is not masked.
    pub fn get(&self, role: PathRole) -> &str {
        match role {
            PathRole::Content => &self.content,
            PathRole::Includes => &self.includes,
            PathRole::Uploads => &self.uploads,
            PathRole::Comments => &self.comments,
        }
    }

    /// Roles with a non-empty virtual segment, in table order.
    pub fn active_roles(&self) -> impl Iterator<Item = PathRole> + '_ {
        PathRole::ALL
            .into_iter()
            .filter(move |role| !self.get(*role).is_empty())
    }

    /// True when a role's virtual segment is its real name, so masking it is a no-op.
    pub fn is_identity(&self, role: PathRole, layout: &InternalLayout) -> bool {
        self.get(role).eq_ignore_ascii_case(layout.real(role))
    }

    pub fn to_raw(&self) -> RawPaths {
        RawPaths {
            content: Some(self.content.clone()),
            includes: Some(self.includes.clone()),
            uploads: Some(self.uploads.clone()),
            comments: Some(self.comments.clone()),
        }
    }
}

/// Clean one segment.
///
/// Trims whitespace and slashes, rejects input that names a path rather than a
/// segment (`..` tokens or interior separators) with `None`, then strips every
/// character outside `[A-Za-z0-9_-]`. The result may be empty.
pub fn sanitize_segment(value: &str) -> Option<String> {
    let trimmed = value.trim_matches(|c: char| c.is_whitespace() || c == '/' || c == '\\');

    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return None;
    }

    Some(
        trimmed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(content: &str, includes: &str, uploads: &str, comments: &str) -> RawPaths {
        RawPaths {
            content: Some(content.into()),
            includes: Some(includes.into()),
            uploads: Some(uploads.into()),
            comments: Some(comments.into()),
        }
    }

    #[test]
    fn traversal_falls_back_to_default() {
        let paths = PathConfig::sanitize(
            &raw("../../etc", "../../etc", "../../etc", "../../etc"),
            SanitizePolicy::default(),
        );
        for role in PathRole::ALL {
            assert_eq!(paths.get(role), role.default_segment());
        }
    }

    #[test]
    fn dots_and_spaces_are_stripped() {
        let paths = PathConfig::sanitize(
            &raw("My Custom.Folder", "core", "media", "submit"),
            SanitizePolicy::default(),
        );
        assert_eq!(paths.get(PathRole::Content), "MyCustomFolder");
    }

    #[test]
    fn surrounding_slashes_and_whitespace_are_trimmed() {
        assert_eq!(sanitize_segment("  /assets/ ").as_deref(), Some("assets"));
        assert_eq!(sanitize_segment("my_lib-2").as_deref(), Some("my_lib-2"));
        assert_eq!(sanitize_segment("a/b"), None);
        assert_eq!(sanitize_segment("ünï").as_deref(), Some("n"));
    }

    #[test]
    fn missing_and_empty_use_defaults() {
        let paths = PathConfig::sanitize(&RawPaths::default(), SanitizePolicy::default());
        assert_eq!(paths, PathConfig::default());

        let paths = PathConfig::sanitize(&raw("", "%%%", " ", ""), SanitizePolicy::default());
        assert_eq!(paths, PathConfig::default());
    }

    #[test]
    fn comments_may_be_empty_when_allowed() {
        let policy = SanitizePolicy { allow_empty_comments: true };
        let paths = PathConfig::sanitize(&raw("assets", "core", "media", ""), policy);
        assert_eq!(paths.get(PathRole::Comments), "");
        assert_eq!(paths.active_roles().count(), 3);

        // An absent key still gets the default.
        let paths = PathConfig::sanitize(&RawPaths::default(), policy);
        assert_eq!(paths.get(PathRole::Comments), "wp-comments-post");
    }

    #[test]
    fn identity_detection() {
        let layout = InternalLayout::default();
        let paths = PathConfig::default();
        assert!(paths.is_identity(PathRole::Content, &layout));
        assert!(paths.is_identity(PathRole::Includes, &layout));
        assert!(!paths.is_identity(PathRole::Uploads, &layout));
        assert!(!paths.is_identity(PathRole::Comments, &layout));
    }

    #[test]
    fn layout_trims_slashes() {
        let layout = InternalLayout {
            uploads_dir: "/wp-content/uploads/".into(),
            ..InternalLayout::default()
        };
        assert_eq!(layout.real(PathRole::Uploads), "wp-content/uploads");
        assert_eq!(layout.real_top_segment(PathRole::Uploads), "wp-content");
    }
}
