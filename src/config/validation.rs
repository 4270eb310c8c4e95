//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, origins, limits, marker and operator rewrite rules
//! - Detect virtual path segments that collide across roles
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Path collisions reject a save but only warn on load, so a bad file
//!   cannot take the site down

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::masking::paths::{InternalLayout, PathConfig, PathRole};
use crate::masking::snapshot::normalize_origin;
use crate::routing::RewriteRule;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    Address { field: &'static str, value: String },

    #[error("site.origins: invalid origin {0:?}")]
    Origin(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("artifact.marker {0:?} must be non-empty [A-Za-z0-9_-]")]
    Marker(String),

    #[error("rewrites.{name}: {reason}")]
    Rewrite { name: String, reason: String },

    #[error("layout.{0} must not be empty")]
    Layout(&'static str),

    #[error("paths.{role}: segment {segment:?} collides with {other}")]
    PathCollision {
        role: PathRole,
        segment: String,
        other: String,
    },
}

/// Validate everything except path collisions, which are reported by
/// [`validate_paths`] and handled by the caller.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    // Upstream may be a hostname (`wordpress:80`), but needs an explicit port.
    let upstream_ok = config
        .upstream
        .address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if !upstream_ok {
        errors.push(ValidationError::Address {
            field: "upstream.address",
            value: config.upstream.address.clone(),
        });
    }

    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "admin.bind_address",
            value: config.admin.bind_address.clone(),
        });
    }

    for origin in &config.site.origins {
        if normalize_origin(origin).is_none() {
            errors.push(ValidationError::Origin(origin.clone()));
        }
    }

    if config.upstream.max_buffer_bytes == 0 {
        errors.push(ValidationError::Zero { field: "upstream.max_buffer_bytes" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    let marker = &config.artifact.marker;
    if marker.is_empty() || !marker.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        errors.push(ValidationError::Marker(marker.clone()));
    }

    for role in PathRole::ALL {
        if config.layout.real(role).is_empty() {
            errors.push(ValidationError::Layout(role.key()));
        }
    }

    for rewrite in &config.rewrites {
        if let Err(e) = RewriteRule::operator(rewrite) {
            errors.push(ValidationError::Rewrite {
                name: rewrite.name.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Reject virtual segments that would make two roles ambiguous.
///
/// A segment collides when it equals another role's virtual segment, or the
/// top-level real directory of another role (masking `includes` as
/// `wp-content` would swallow real content requests).
pub fn validate_paths(paths: &PathConfig, layout: &InternalLayout) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (i, role) in PathRole::ALL.iter().enumerate() {
        let segment = paths.get(*role);
        if segment.is_empty() {
            continue;
        }

        for other in &PathRole::ALL[i + 1..] {
            if paths.get(*other).eq_ignore_ascii_case(segment) {
                errors.push(ValidationError::PathCollision {
                    role: *role,
                    segment: segment.to_string(),
                    other: format!("the {} segment", other),
                });
            }
        }

        for other in PathRole::ALL.iter().filter(|r| *r != role) {
            if layout.real_top_segment(*other).eq_ignore_ascii_case(segment)
                && !paths.is_identity(*role, layout)
            {
                errors.push(ValidationError::PathCollision {
                    role: *role,
                    segment: segment.to_string(),
                    other: format!("the real {} location", other),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
