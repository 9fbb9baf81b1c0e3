//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup and is immutable afterwards.

use std::env;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

/// Default ceiling for inbound webhook bodies (10 MiB).
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Shared secret used to sign Bigblue webhook payloads.
///
/// Cheap to clone and never printed: the `Debug` impl is redacted.
#[derive(Clone)]
pub struct WebhookSecret(Arc<[u8]>);

impl WebhookSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(secret.as_ref()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Bigblue webhook signing secret
    pub webhook_secret: WebhookSecret,

    /// Maximum accepted request body size in bytes
    pub body_limit_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let webhook_secret = env::var("BIGBLUE_WEBHOOK_SECRET").unwrap_or_default();
        if webhook_secret.is_empty() {
            warn!("bigblue_webhook_secret_empty");
        }

        Config {
            port: parse_or("PORT", 8080),

            webhook_secret: WebhookSecret::new(webhook_secret),

            body_limit_bytes: parse_or("BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT_BYTES),
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_valid() {
        env::set_var("TEST_BODY_LIMIT", "2048");
        assert_eq!(parse_or("TEST_BODY_LIMIT", 0usize), 2048);
        env::remove_var("TEST_BODY_LIMIT");
    }

    #[test]
    fn test_parse_or_invalid_uses_default() {
        env::set_var("TEST_BAD_PORT", "not-a-port");
        assert_eq!(parse_or("TEST_BAD_PORT", 8080u16), 8080);
        env::remove_var("TEST_BAD_PORT");
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(parse_or("NONEXISTENT_VAR", 42u64), 42);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = WebhookSecret::new("super-secret");
        let printed = format!("{:?}", secret);
        assert!(!printed.contains("super-secret"));
        assert_eq!(secret.as_bytes(), b"super-secret");
    }
}
