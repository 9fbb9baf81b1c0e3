//! Bigblue webhook signature verification.
//!
//! Bigblue signs the raw request body with HMAC-SHA256 using the webhook
//! secret and sends the base64-encoded digest in the `x-bigblue-hmac-sha256`
//! header.

use axum::http::{HeaderMap, StatusCode};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::config::WebhookSecret;
use crate::web::error::PipelineError;
use crate::web::pipeline::{InboundRequest, Verdict};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the sender's base64 HMAC-SHA256 digest of the raw body.
pub const EVENT_SIGNATURE_HEADER: &str = "x-bigblue-hmac-sha256";

/// Outcome of checking a signature header against a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    /// Header absent or empty.
    Missing,
    /// Header present but not valid base64 text.
    Malformed,
    /// Header decoded but does not match the expected digest.
    Mismatch,
}

impl SignatureCheck {
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }

    fn reason(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Missing => "missing",
            Self::Malformed => "malformed",
            Self::Mismatch => "mismatch",
        }
    }
}

fn hmac_digest(secret: &WebhookSecret, body: &[u8]) -> Option<[u8; 32]> {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("bigblue_signature_invalid_key");
            return None;
        }
    };
    mac.update(body);

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    Some(digest)
}

/// Compute the signature Bigblue would send for `body`:
/// `base64(HMAC-SHA256(secret, body))`.
///
/// Returns `None` if the secret cannot key an HMAC.
pub fn compute_signature(secret: &WebhookSecret, body: &[u8]) -> Option<String> {
    hmac_digest(secret, body).map(|digest| BASE64_STANDARD.encode(digest))
}

/// Check a signature header value against the raw body.
///
/// The provided value is decoded and compared to the expected digest with
/// `subtle`, so comparison time does not depend on where the buffers differ.
/// A decoded value of the wrong length never matches; its content is not
/// inspected.
pub fn check_signature(
    secret: &WebhookSecret,
    body: &[u8],
    signature: Option<&str>,
) -> SignatureCheck {
    let signature = match signature {
        Some(s) if !s.is_empty() => s,
        _ => return SignatureCheck::Missing,
    };

    let provided = match BASE64_STANDARD.decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return SignatureCheck::Malformed,
    };

    let expected = match hmac_digest(secret, body) {
        Some(digest) => digest,
        None => return SignatureCheck::Mismatch,
    };

    if bool::from(expected[..].ct_eq(provided.as_slice())) {
        SignatureCheck::Valid
    } else {
        SignatureCheck::Mismatch
    }
}

/// Verify a Bigblue webhook signature.
pub fn verify_signature(secret: &WebhookSecret, body: &[u8], signature: Option<&str>) -> bool {
    check_signature(secret, body, signature).is_valid()
}

fn signature_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(EVENT_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
}

/// Pipeline stage: authenticate the request before anything trusts its payload.
///
/// Every authentication failure yields the same 403 so callers cannot tell
/// an absent header from a wrong one.
pub fn validate_signature(
    request: &InboundRequest,
    secret: &WebhookSecret,
) -> Result<Verdict, PipelineError> {
    let raw_body = request.raw_body().ok_or(PipelineError::MissingRawBody)?;

    let check = check_signature(secret, raw_body, signature_header(request.headers()));
    if !check.is_valid() {
        warn!(
            reason = check.reason(),
            body_length = raw_body.len(),
            "bigblue_signature_invalid"
        );
        return Ok(Verdict::Reject(StatusCode::FORBIDDEN, "Unauthorized"));
    }

    Ok(Verdict::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::HeaderValue;

    fn secret() -> WebhookSecret {
        WebhookSecret::new("test-webhook-secret")
    }

    #[test]
    fn test_verify_signature_valid() {
        let body = br#"{"id":"evt_1","type":"ORDER_SHIPPED"}"#;
        let signature = compute_signature(&secret(), body).unwrap();
        assert!(verify_signature(&secret(), body, Some(&signature)));
    }

    #[test]
    fn test_compute_signature_known_vector() {
        // RFC 4231 test case 2.
        let secret = WebhookSecret::new("Jefe");
        let signature = compute_signature(&secret, b"what do ya want for nothing?").unwrap();
        assert_eq!(signature, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[test]
    fn test_verify_signature_missing() {
        assert_eq!(
            check_signature(&secret(), b"{}", None),
            SignatureCheck::Missing
        );
        assert_eq!(
            check_signature(&secret(), b"{}", Some("")),
            SignatureCheck::Missing
        );
    }

    #[test]
    fn test_signature_compared_as_received() {
        let body = b"{}";
        let signature = compute_signature(&secret(), body).unwrap();

        let padded = format!(" {} ", signature);
        assert!(!verify_signature(&secret(), body, Some(&padded)));
        assert!(!verify_signature(&secret(), body, Some("   ")));
        assert!(verify_signature(&secret(), body, Some(&signature)));
    }

    #[test]
    fn test_any_secret_length_keys_hmac() {
        let long = WebhookSecret::new("k".repeat(200));
        for secret in [WebhookSecret::new(""), WebhookSecret::new("k"), long] {
            let signature = compute_signature(&secret, b"payload")
                .expect("HMAC-SHA256 accepts keys of any length");
            assert_eq!(BASE64_STANDARD.decode(&signature).unwrap().len(), 32);
            assert!(verify_signature(&secret, b"payload", Some(&signature)));
        }
    }

    #[test]
    fn test_verify_signature_malformed() {
        assert_eq!(
            check_signature(&secret(), b"{}", Some("not base64!!")),
            SignatureCheck::Malformed
        );
    }

    #[test]
    fn test_verify_signature_wrong_length() {
        let short = BASE64_STANDARD.encode([0u8; 16]);
        assert_eq!(
            check_signature(&secret(), b"{}", Some(&short)),
            SignatureCheck::Mismatch
        );

        let mut long = hmac_digest(&secret(), b"{}").unwrap().to_vec();
        long.push(0);
        let long = BASE64_STANDARD.encode(long);
        assert_eq!(
            check_signature(&secret(), b"{}", Some(&long)),
            SignatureCheck::Mismatch
        );
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let body = b"payload";
        let signature = compute_signature(&WebhookSecret::new("other"), body).unwrap();
        assert_eq!(
            check_signature(&secret(), body, Some(&signature)),
            SignatureCheck::Mismatch
        );
    }

    #[test]
    fn test_single_byte_flip_rejected() {
        let body = br#"{"challenge":"abc123","nested":{"value":42}}"#.to_vec();
        let signature = compute_signature(&secret(), &body).unwrap();

        for i in 0..body.len() {
            let mut tampered = body.clone();
            tampered[i] ^= 0x01;
            assert!(
                !verify_signature(&secret(), &tampered, Some(&signature)),
                "flip at byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_empty_body_and_secret() {
        let empty = WebhookSecret::new("");
        let signature = compute_signature(&empty, b"").unwrap();
        assert!(verify_signature(&empty, b"", Some(&signature)));
        assert!(!verify_signature(&secret(), b"", Some(&signature)));
    }

    #[test]
    fn test_validate_signature_stage() {
        let body = Bytes::from_static(br#"{"id":"evt_1"}"#);
        let mut headers = HeaderMap::new();
        headers.insert(
            EVENT_SIGNATURE_HEADER,
            HeaderValue::from_str(&compute_signature(&secret(), &body).unwrap()).unwrap(),
        );

        let request = InboundRequest::new(headers, Some(body), None);
        assert!(matches!(
            validate_signature(&request, &secret()),
            Ok(Verdict::Continue)
        ));
    }

    #[test]
    fn test_validate_signature_stage_rejects_missing_header() {
        let request = InboundRequest::new(HeaderMap::new(), Some(Bytes::from_static(b"{}")), None);
        match validate_signature(&request, &secret()) {
            Ok(Verdict::Reject(status, message)) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("Expected reject, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_signature_stage_missing_raw_body() {
        let mut headers = HeaderMap::new();
        headers.insert(EVENT_SIGNATURE_HEADER, HeaderValue::from_static("abc="));

        let request = InboundRequest::new(headers, None, None);
        assert!(matches!(
            validate_signature(&request, &secret()),
            Err(PipelineError::MissingRawBody)
        ));
    }
}
