//! Raw request body capture.
//!
//! The signature covers the exact bytes Bigblue sent, so the body is buffered
//! before anything parses it. Both the raw bytes and the JSON tree are
//! attached to the request as a [`CapturedBody`] extension.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;
use tracing::warn;

use crate::web::error::PipelineError;
use crate::web::handlers::AppState;

/// Body as received, plus its JSON parse when it had one.
#[derive(Debug, Clone)]
pub struct CapturedBody {
    pub raw: Bytes,
    pub parsed: Option<Value>,
}

fn declared_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Whether a declared content type should be parsed as JSON.
///
/// A missing content type is treated as JSON; Bigblue only sends JSON bodies.
fn is_json_content_type(content_type: Option<&str>) -> bool {
    let content_type = match content_type {
        Some(ct) => ct,
        None => return true,
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || mime.ends_with("+json")
}

/// Parse the raw body as JSON when the declared content type allows it.
///
/// Invalid JSON is not an error here; stages that need the tree decide.
pub fn parse_json_body(content_type: Option<&str>, raw: &[u8]) -> Option<Value> {
    if !is_json_content_type(content_type) {
        return None;
    }

    match serde_json::from_slice(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, body_length = raw.len(), "webhook_body_not_json");
            None
        }
    }
}

/// Middleware that buffers the request body and attaches a [`CapturedBody`].
///
/// Bodies larger than the configured ceiling are rejected with 413 before
/// any signature work happens. If the body stream fails part way, nothing is
/// attached and the request continues with an empty body.
pub async fn capture_raw_body(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let limit = state.config.body_limit_bytes;

    if let Some(length) = declared_content_length(request.headers()) {
        if length > limit as u64 {
            warn!(
                content_length = length,
                limit = limit,
                "webhook_body_too_large"
            );
            return PipelineError::PayloadTooLarge { limit }.into_response();
        }
    }

    let (mut parts, body) = request.into_parts();

    match Limited::new(body, limit).collect().await {
        Ok(collected) => {
            let raw = collected.to_bytes();
            let content_type = parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let parsed = parse_json_body(content_type, &raw);

            parts.extensions.insert(CapturedBody {
                raw: raw.clone(),
                parsed,
            });

            next.run(Request::from_parts(parts, Body::from(raw))).await
        }
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(limit = limit, "webhook_body_too_large");
            PipelineError::PayloadTooLarge { limit }.into_response()
        }
        Err(e) => {
            warn!(error = %e, "webhook_body_read_failed");
            next.run(Request::from_parts(parts, Body::empty())).await
        }
    }
}
