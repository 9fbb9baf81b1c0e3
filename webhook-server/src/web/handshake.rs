//! Bigblue endpoint registration handshake.
//!
//! When a webhook endpoint is registered in the Bigblue merchant application,
//! Bigblue sends a signed `URL_VERIFICATION` event whose body carries a
//! `challenge` value. The endpoint must echo it back as
//! `{"challenge": <value>}`.

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::WebhookSecret;
use crate::web::error::PipelineError;
use crate::web::pipeline::{InboundRequest, Verdict};

/// Header declaring the event type.
pub const EVENT_TYPE_HEADER: &str = "x-bigblue-event-type";

/// Event type sent by Bigblue to verify endpoint ownership.
pub const URL_VERIFICATION: &str = "URL_VERIFICATION";

/// Handshake response body. A missing challenge serializes as `null`.
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub challenge: Value,
}

/// Declared event type of a request, if any.
pub fn event_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(EVENT_TYPE_HEADER).and_then(|v| v.to_str().ok())
}

pub fn is_url_verification(headers: &HeaderMap) -> bool {
    event_type(headers) == Some(URL_VERIFICATION)
}

/// Pipeline stage: answer `URL_VERIFICATION` events and let everything else through.
///
/// Only runs after the signature check, so the challenge echoed back always
/// comes from an authenticated body.
pub fn answer_handshake(
    request: &InboundRequest,
    _secret: &WebhookSecret,
) -> Result<Verdict, PipelineError> {
    if !is_url_verification(request.headers()) {
        return Ok(Verdict::Continue);
    }

    let body = match request.parsed_body() {
        Some(body) => body,
        None => {
            warn!("bigblue_handshake_body_not_json");
            return Err(PipelineError::MalformedBody);
        }
    };

    let challenge = body.get("challenge").cloned().unwrap_or(Value::Null);
    if challenge.is_null() {
        warn!("bigblue_handshake_challenge_missing");
    }

    info!("bigblue_handshake_answered");

    let response = (StatusCode::OK, Json(ChallengeResponse { challenge })).into_response();

    Ok(Verdict::Respond(response))
}
