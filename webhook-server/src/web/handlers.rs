//! Webhook endpoint handlers.
//!
//! `POST /` runs the capture layer, then the [`Pipeline`], and only hands
//! authenticated, non-handshake events to the configured [`EventHandler`].

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::web::capture::{capture_raw_body, CapturedBody};
use crate::web::error::PipelineError;
use crate::web::handshake::event_type;
use crate::web::pipeline::{InboundRequest, Pipeline, Verdict};
use crate::Config;

/// An authenticated Bigblue event handed to business logic.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Value of the `x-bigblue-event-type` header
    pub event_type: Option<String>,
    /// Body exactly as received and signed
    pub raw_body: Bytes,
    /// JSON payload, if the body parsed
    pub payload: Option<Value>,
}

/// Business logic extension point.
///
/// Called exactly once per authenticated, non-handshake request. Returning
/// an error answers the request with 500.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: WebhookEvent) -> Result<()>;
}

/// Default handler: logs the event and accepts it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventHandler;

impl EventHandler for LogEventHandler {
    fn handle(&self, event: WebhookEvent) -> Result<()> {
        let payload = event.payload.unwrap_or_default().to_string();
        info!(
            event_type = event.event_type.as_deref().unwrap_or("unknown"),
            body_length = event.raw_body.len(),
            payload = %payload,
            "bigblue_webhook_received"
        );
        Ok(())
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<Pipeline>,
    pub handler: Arc<dyn EventHandler>,
}

impl AppState {
    pub fn new(config: Config, handler: impl EventHandler + 'static) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(Pipeline::bigblue()),
            handler: Arc::new(handler),
        }
    }
}

/// Build the router: `POST /` for webhooks and `GET /health`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            post(bigblue_webhook).layer(middleware::from_fn_with_state(
                state.clone(),
                capture_raw_body,
            )),
        )
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Bigblue Webhook
// =============================================================================

/// Bigblue webhook endpoint.
///
/// This endpoint:
/// 1. Verifies the HMAC signature of the captured raw body
/// 2. Answers `URL_VERIFICATION` handshakes
/// 3. Forwards everything else to the event handler and returns `OK`
pub async fn bigblue_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    captured: Option<Extension<CapturedBody>>,
) -> Result<Response, PipelineError> {
    let request = match captured {
        Some(Extension(CapturedBody { raw, parsed })) => {
            InboundRequest::new(headers, Some(raw), parsed)
        }
        None => InboundRequest::new(headers, None, None),
    };

    match state.pipeline.run(&request, &state.config.webhook_secret)? {
        Verdict::Continue => {}
        verdict => return Ok(verdict.into_response()),
    }

    let event = WebhookEvent {
        event_type: event_type(request.headers()).map(str::to_string),
        raw_body: request.raw_body().cloned().unwrap_or_default(),
        payload: request.parsed_body().cloned(),
    };

    state.handler.handle(event).map_err(PipelineError::Handler)?;

    Ok((StatusCode::OK, "OK").into_response())
}
