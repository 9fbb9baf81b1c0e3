//! Bigblue webhook receiver.
//!
//! This library provides the request pipeline used by the `bigblue-web`
//! binary to authenticate and answer Bigblue webhook deliveries.
//!
//! ## Architecture
//!
//! ```text
//! Bigblue → capture raw body → verify signature → handshake → EventHandler
//! ```

pub mod config;
pub mod web;

// Re-export commonly used types
pub use config::{Config, WebhookSecret};
pub use web::{router, AppState, EventHandler, LogEventHandler, WebhookEvent};
