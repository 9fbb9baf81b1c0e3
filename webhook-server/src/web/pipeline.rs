//! Ordered request pipeline for Bigblue webhooks.
//!
//! ```text
//! capture (layer) → validate_signature → answer_handshake → EventHandler
//! ```
//!
//! Stages are plain functions run in order by [`Pipeline::run`]; the first
//! verdict other than `Continue` ends the request.

use std::fmt;

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::config::WebhookSecret;
use crate::web::error::PipelineError;
use crate::web::handshake::answer_handshake;
use crate::web::signature::validate_signature;

/// A webhook request as seen by the pipeline stages.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    headers: HeaderMap,
    raw_body: Option<Bytes>,
    parsed_body: Option<Value>,
}

impl InboundRequest {
    pub fn new(headers: HeaderMap, raw_body: Option<Bytes>, parsed_body: Option<Value>) -> Self {
        Self {
            headers,
            raw_body,
            parsed_body,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Exact bytes received, or `None` when the capture layer attached nothing.
    pub fn raw_body(&self) -> Option<&Bytes> {
        self.raw_body.as_ref()
    }

    /// JSON tree of the body, if it was declared and valid JSON.
    pub fn parsed_body(&self) -> Option<&Value> {
        self.parsed_body.as_ref()
    }
}

/// Outcome of a single stage.
pub enum Verdict {
    /// Hand the request to the next stage.
    Continue,
    /// Stop with an error status and a plain-text message.
    Reject(StatusCode, &'static str),
    /// Stop with a complete response.
    Respond(Response),
}

impl fmt::Debug for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("Continue"),
            Self::Reject(status, message) => {
                f.debug_tuple("Reject").field(status).field(message).finish()
            }
            Self::Respond(response) => f.debug_tuple("Respond").field(&response.status()).finish(),
        }
    }
}

impl IntoResponse for Verdict {
    fn into_response(self) -> Response {
        match self {
            Self::Continue => StatusCode::OK.into_response(),
            Self::Reject(status, message) => (status, message).into_response(),
            Self::Respond(response) => response,
        }
    }
}

/// A pipeline stage.
pub type Stage = fn(&InboundRequest, &WebhookSecret) -> Result<Verdict, PipelineError>;

/// Ordered list of stages driven by [`Pipeline::run`].
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<(&'static str, Stage)>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage; stages run in insertion order.
    pub fn stage(mut self, name: &'static str, stage: Stage) -> Self {
        self.stages.push((name, stage));
        self
    }

    /// Signature check followed by the URL verification handshake.
    pub fn bigblue() -> Self {
        Self::new()
            .stage("validate_signature", validate_signature)
            .stage("answer_handshake", answer_handshake)
    }

    #[cfg(test)]
    fn stage_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|(name, _)| *name)
    }

    /// Run every stage in order, stopping at the first terminal verdict or error.
    ///
    /// Returns `Verdict::Continue` when all stages passed and the request
    /// should be forwarded to business logic.
    pub fn run(
        &self,
        request: &InboundRequest,
        secret: &WebhookSecret,
    ) -> Result<Verdict, PipelineError> {
        for (name, stage) in &self.stages {
            match stage(request, secret)? {
                Verdict::Continue => continue,
                verdict => {
                    tracing::debug!(stage = *name, verdict = ?verdict, "pipeline_terminated");
                    return Ok(verdict);
                }
            }
        }

        Ok(Verdict::Continue)
    }
}
