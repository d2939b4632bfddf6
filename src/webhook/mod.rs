//! Webhook transport for identity-provider events.
//!
//! Provides signature verification and the HTTP entry point that feeds
//! verified events to the reconciler.

mod endpoint;
mod verification;

pub use endpoint::{router, router_at, router_from_config, WebhookState};
pub use verification::{HmacSha256Verifier, NoVerification, WebhookVerifier};
