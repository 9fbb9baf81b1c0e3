//! Failures that end a webhook request outside the normal verdict flow.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Errors raised while processing a webhook request.
///
/// Authentication failures are not errors: they are `Verdict::Reject` values.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Body exceeded the configured size ceiling.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The handshake needs a parsed body but the payload was not valid JSON.
    #[error("request body is not valid JSON")]
    MalformedBody,

    /// The raw body capture layer did not run, or the body stream was aborted.
    #[error("raw request body was not captured; is the capture layer installed on this route?")]
    MissingRawBody,

    /// The business handler rejected the event.
    #[error("event handler failed: {0}")]
    Handler(anyhow::Error),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MalformedBody => StatusCode::BAD_REQUEST,
            Self::MissingRawBody | Self::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::PayloadTooLarge { .. } => "Payload Too Large",
            Self::MalformedBody => "Bad Request",
            Self::MissingRawBody => {
                error!(error = %self, "webhook_raw_body_missing");
                "Internal Server Error"
            }
            Self::Handler(ref e) => {
                error!(error = %e, "webhook_handler_failed");
                "Internal Server Error"
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            PipelineError::PayloadTooLarge { limit: 10 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(PipelineError::MalformedBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PipelineError::MissingRawBody.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            PipelineError::Handler(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = PipelineError::MissingRawBody.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
