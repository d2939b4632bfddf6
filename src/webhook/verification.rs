//! Webhook signature verification.

use crate::error::Result;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Trait for verifying webhook signatures.
///
/// The reconciliation core treats verification as a trusted
/// collaborator: an event only reaches the reconciler after this
/// check has passed.
#[async_trait]
pub trait WebhookVerifier: Send + Sync {
    /// Verify the signature over the signed content.
    ///
    /// `signed_content` is the provider's canonical byte string (for
    /// the identity provider: `"{id}.{timestamp}.{body}"`).
    ///
    /// Returns `Ok(true)` if valid, `Ok(false)` if invalid.
    async fn verify_signature(&self, signed_content: &[u8], signature: &str) -> Result<bool>;
}

/// No-op verifier that accepts all webhooks.
///
/// Only for tests and local development; never wire this up against a
/// real provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVerification;

#[async_trait]
impl WebhookVerifier for NoVerification {
    async fn verify_signature(&self, _signed_content: &[u8], _signature: &str) -> Result<bool> {
        tracing::warn!("NoVerification webhook verifier used - all events accepted");
        Ok(true)
    }
}

/// HMAC-SHA256 verifier with timing-safe comparison.
///
/// Providers encode signatures differently: hex (`a1b2c3...`), hex
/// with a `sha256=` prefix, or base64 with a `v1,` version tag
/// (`v1,K5oZfzN95Z9UVu1EsfQmfVNQhnkZ2M...`). All of these are
/// accepted. During secret rotation the header may carry several
/// space-separated signatures; verification succeeds if any of them
/// matches.
pub struct HmacSha256Verifier {
    secret: Vec<u8>,
}

impl HmacSha256Verifier {
    /// Create a verifier from the shared webhook secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn compute_signature(&self, signed_content: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(signed_content);
        mac.finalize().into_bytes().to_vec()
    }

    /// Decode a signature candidate under every supported encoding.
    fn decodings(candidate: &str) -> impl Iterator<Item = Vec<u8>> {
        let sig = candidate
            .strip_prefix("v1,")
            .or_else(|| candidate.strip_prefix("sha256="))
            .unwrap_or(candidate);

        let as_hex = hex_decode(sig);
        let as_base64 =
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, sig).ok();
        [as_hex, as_base64].into_iter().flatten()
    }
}

#[async_trait]
impl WebhookVerifier for HmacSha256Verifier {
    async fn verify_signature(&self, signed_content: &[u8], signature: &str) -> Result<bool> {
        let expected = self.compute_signature(signed_content);

        for candidate in signature.split_whitespace() {
            for provided in Self::decodings(candidate) {
                if provided.ct_eq(&expected).into() {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

/// Decode a hex string to bytes.
fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() || s.len() % 2 != 0 {
        return None;
    }

    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
