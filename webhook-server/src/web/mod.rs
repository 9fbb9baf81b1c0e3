//! Web server module for handling inbound Bigblue webhooks.
//!
//! Requests to `POST /` go through a fixed sequence:
//! - Capture the raw body exactly as received
//! - Verify the HMAC-SHA256 signature over those bytes
//! - Answer the `URL_VERIFICATION` handshake
//! - Hand everything else to the configured [`EventHandler`]

pub mod capture;
pub mod error;
pub mod handlers;
pub mod handshake;
pub mod pipeline;
pub mod signature;

pub use capture::{capture_raw_body, CapturedBody};
pub use error::PipelineError;
pub use handlers::{
    bigblue_webhook, health, router, AppState, EventHandler, HealthResponse, LogEventHandler,
    WebhookEvent,
};
pub use handshake::{EVENT_TYPE_HEADER, URL_VERIFICATION};
pub use pipeline::{InboundRequest, Pipeline, Verdict};
pub use signature::{compute_signature, verify_signature, SignatureCheck, EVENT_SIGNATURE_HEADER};
