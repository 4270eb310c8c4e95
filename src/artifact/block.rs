//! Rendering and stripping of the marker-delimited rule block.
//!
//! ```text
//! # BEGIN PATH_MASK
//! <IfModule mod_rewrite.c>
//! RewriteEngine On
//! # Fake wp-content
//! RewriteRule ^assets\/(.*)$ wp-content/$1 [L]
//! ...
//! </IfModule>
//! # END PATH_MASK
//! ```

use regex::Regex;
use std::borrow::Cow;

use crate::masking::paths::{InternalLayout, PathConfig, PathRole};

/// Default marker name.
pub const DEFAULT_MARKER: &str = "PATH_MASK";

/// Rule block for `paths`, or `None` when no role is masked.
///
/// Roles with an empty segment, or a segment equal to the real name, get no rule.
///
/// Output ends with exactly one newline.
pub fn render_block(paths: &PathConfig, layout: &InternalLayout, marker: &str) -> Option<String> {
    let mut rules = Vec::new();

    for role in [
        PathRole::Content,
        PathRole::Includes,
        PathRole::Uploads,
        PathRole::Comments,
    ] {
        let segment = paths.get(role);
        if segment.is_empty() || paths.is_identity(role, layout) {
            continue;
        }
        let real = layout.real(role);
        let quoted = regex::escape(segment);
        match role {
            PathRole::Comments => {
                rules.push("# Fake comments processor".to_string());
                rules.push(format!("RewriteRule ^{}$ {} [L]", quoted, real));
            }
            PathRole::Uploads => {
                rules.push("# Fake uploads".to_string());
                rules.push(format!("RewriteRule ^{}\\/(.*)$ {}/$1 [L]", quoted, real));
            }
            _ => {
                rules.push(format!("# Fake {}", real));
                rules.push(format!("RewriteRule ^{}\\/(.*)$ {}/$1 [L]", quoted, real));
            }
        }
    }

    if rules.is_empty() {
        return None;
    }

    let mut block = String::new();
    block.push_str(&format!("# BEGIN {}\n", marker));
    block.push_str("<IfModule mod_rewrite.c>\n");
    block.push_str("RewriteEngine On\n");
    for line in rules {
        block.push_str(&line);
        block.push('\n');
    }
    block.push_str("</IfModule>\n");
    block.push_str(&format!("# END {}\n", marker));
    Some(block)
}

/// Remove every `# BEGIN <marker> ... # END <marker>` region (plus one
/// trailing newline). Everything outside the markers is returned untouched.
pub fn strip_block<'a>(contents: &'a str, marker: &str) -> Result<Cow<'a, str>, regex::Error> {
    let marker = regex::escape(marker);
    let pattern = Regex::new(&format!(r"(?s)# BEGIN {m}\b.*?# END {m}\b\n?", m = marker))?;
    Ok(pattern.replace_all(contents, ""))
}

/// Strip any existing block and append a fresh one.
pub fn splice_block(
    contents: &str,
    paths: &PathConfig,
    layout: &InternalLayout,
    marker: &str,
) -> Result<String, regex::Error> {
    let mut out = strip_block(contents, marker)?.into_owned();
    if let Some(block) = render_block(paths, layout, marker) {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&block);
    }
    Ok(out)
}
