//! Response masking middleware.
//!
//! # Responsibilities
//! - Pin the masking snapshot for the whole request
//! - Mask URL-bearing response headers
//! - Buffer and rewrite eligible bodies, then fix up `Content-Length`
//!
//! HEAD responses and bodiless statuses (1xx, 204, 304) keep their headers
//! as sent upstream apart from URL masking.
//!
//! # Design Decisions
//! - Guards that only need headers run before buffering, so skipped
//!   responses stream through untouched
//! - A response carries a [`BodyMasked`] marker once rewritten; a second pass
//!   over the same response is refused

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::borrow::Cow;
use std::sync::Arc;

use crate::http::server::AppState;
use crate::masking::{MaskSnapshot, OutputRewriter, RequestKind, ResponseMeta, Rewrite, SkipReason};
use crate::observability::metrics;

/// Extension marking a response whose body has been through the table.
#[derive(Debug, Clone, Copy)]
pub struct BodyMasked;

/// Route layer: pins the snapshot, runs the handler, masks the response.
pub async fn mask_output(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let snapshot = state.control.snapshot();
    let runtime = state.runtime();
    let kind = runtime.classifier.classify(request.uri());
    let method = request.method().clone();
    request.extensions_mut().insert(Arc::clone(&snapshot));

    let response = next.run(request).await;
    if !runtime.masking_enabled {
        return response;
    }
    mask_response(&snapshot, &runtime.output, runtime.max_buffer_bytes, &method, kind, response).await
}

/// Apply header and body masking to one finished response.
pub async fn mask_response(
    snapshot: &MaskSnapshot,
    output: &OutputRewriter,
    max_buffer_bytes: usize,
    method: &Method,
    kind: RequestKind,
    response: Response,
) -> Response {
    let (mut parts, body) = response.into_parts();

    if parts.extensions.get::<BodyMasked>().is_some() {
        metrics::record_body_skip(SkipReason::AlreadyMasked.as_str());
        return Response::from_parts(parts, body);
    }

    let urls = snapshot.urls();
    let masked_headers = urls.filter_headers(&mut parts.headers);
    if masked_headers > 0 {
        tracing::debug!(count = masked_headers, "Masked URL headers");
    }

    if *method == Method::HEAD || !carries_body(parts.status) {
        metrics::record_body_skip(SkipReason::NoBody.as_str());
        return Response::from_parts(parts, body);
    }

    let content_type = header_string(&parts.headers, header::CONTENT_TYPE);
    let content_encoding = header_string(&parts.headers, header::CONTENT_ENCODING);
    let meta = ResponseMeta {
        kind,
        content_type: content_type.as_deref(),
        content_encoding: content_encoding.as_deref(),
    };

    let table = snapshot.table();
    if let Err(reason) = output.precheck(&meta, table) {
        metrics::record_body_skip(reason.as_str());
        return Response::from_parts(parts, body);
    }

    if declared_length(&parts.headers).is_some_and(|len| len > max_buffer_bytes) {
        metrics::record_body_skip(SkipReason::TooLarge.as_str());
        return Response::from_parts(parts, body);
    }

    let bytes = match axum::body::to_bytes(body, max_buffer_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, limit = max_buffer_bytes, "Failed to buffer upstream body");
            return (StatusCode::BAD_GATEWAY, "Upstream body could not be buffered").into_response();
        }
    };

    let masked = match output.rewrite(&meta, &bytes, table) {
        Rewrite::Applied(Cow::Owned(masked)) => masked,
        Rewrite::Applied(Cow::Borrowed(_)) => {
            parts.extensions.insert(BodyMasked);
            return Response::from_parts(parts, Body::from(bytes.clone()));
        }
        Rewrite::Skipped(reason) => {
            metrics::record_body_skip(reason.as_str());
            return Response::from_parts(parts, Body::from(bytes.clone()));
        }
    };

    metrics::record_body_rewrite();
    tracing::debug!(before = bytes.len(), after = masked.len(), "Response body masked");

    parts.headers.remove(header::TRANSFER_ENCODING);
    parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(masked.len()));
    parts.extensions.insert(BodyMasked);
    Response::from_parts(parts, Body::from(masked))
}

fn carries_body(status: StatusCode) -> bool {
    !(status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED)
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
