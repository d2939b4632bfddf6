//! HTTP entry point for provider events.
//!
//! Accepts a signed event envelope over POST, verifies the signature,
//! and feeds the event to the reconciler. Response statuses are chosen
//! for the provider's redelivery loop: 2xx acknowledges (including
//! events this core does not care about), 400 means the delivery is
//! bad and must not be retried, and 503 asks for redelivery of a
//! transiently unappliable event.

use super::verification::{HmacSha256Verifier, WebhookVerifier};
use crate::config::WebhookConfig;
use crate::error::CoachwayError;
use crate::reconcile::{Applied, EventEnvelope, IdentityReconciler};
use crate::storage::{MembershipStore, OrganizationStore, UserStore};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Required trusted headers on every delivery.
const HEADER_EVENT_ID: &str = "webhook-id";
const HEADER_TIMESTAMP: &str = "webhook-timestamp";
const HEADER_SIGNATURE: &str = "webhook-signature";

/// Shared state for the webhook endpoint.
pub struct WebhookState<U, O, M>
where
    U: UserStore,
    O: OrganizationStore,
    M: MembershipStore,
{
    verifier: Arc<dyn WebhookVerifier>,
    reconciler: Arc<IdentityReconciler<U, O, M>>,
}

impl<U, O, M> Clone for WebhookState<U, O, M>
where
    U: UserStore,
    O: OrganizationStore,
    M: MembershipStore,
{
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
            reconciler: Arc::clone(&self.reconciler),
        }
    }
}

impl<U, O, M> WebhookState<U, O, M>
where
    U: UserStore,
    O: OrganizationStore,
    M: MembershipStore,
{
    /// Create endpoint state from an injected verifier and reconciler.
    #[must_use]
    pub fn new(
        verifier: Arc<dyn WebhookVerifier>,
        reconciler: Arc<IdentityReconciler<U, O, M>>,
    ) -> Self {
        Self {
            verifier,
            reconciler,
        }
    }
}

/// Build a router exposing `POST /webhooks/identity`.
pub fn router<U, O, M>(state: WebhookState<U, O, M>) -> Router
where
    U: UserStore + 'static,
    O: OrganizationStore + 'static,
    M: MembershipStore + 'static,
{
    router_at("/webhooks/identity", state)
}

/// Build a router from configuration, using HMAC-SHA256 verification
/// with the configured secret.
pub fn router_from_config<U, O, M>(
    config: &WebhookConfig,
    reconciler: Arc<IdentityReconciler<U, O, M>>,
) -> Router
where
    U: UserStore + 'static,
    O: OrganizationStore + 'static,
    M: MembershipStore + 'static,
{
    let verifier = Arc::new(HmacSha256Verifier::new(config.secret.clone()));
    router_at(&config.path, WebhookState::new(verifier, reconciler))
}

/// Build a router exposing the endpoint at a configured path.
pub fn router_at<U, O, M>(path: &str, state: WebhookState<U, O, M>) -> Router
where
    U: UserStore + 'static,
    O: OrganizationStore + 'static,
    M: MembershipStore + 'static,
{
    Router::new()
        .route(path, post(receive_event::<U, O, M>))
        .with_state(state)
}

/// Handle one provider delivery.
async fn receive_event<U, O, M>(
    State(state): State<WebhookState<U, O, M>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    U: UserStore,
    O: OrganizationStore,
    M: MembershipStore,
{
    let Some((event_id, timestamp, signature)) = required_headers(&headers) else {
        return (StatusCode::BAD_REQUEST, "missing webhook headers").into_response();
    };

    // The provider signs "{id}.{timestamp}.{body}".
    let mut signed_content = Vec::with_capacity(event_id.len() + timestamp.len() + body.len() + 2);
    signed_content.extend_from_slice(event_id.as_bytes());
    signed_content.push(b'.');
    signed_content.extend_from_slice(timestamp.as_bytes());
    signed_content.push(b'.');
    signed_content.extend_from_slice(&body);

    match state.verifier.verify_signature(&signed_content, signature).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(event_id, "Webhook signature verification failed");
            return (StatusCode::BAD_REQUEST, "invalid signature").into_response();
        }
        Err(err) => return err.into_response(),
    }

    let envelope = match EventEnvelope::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(event_id, error = %err, "Rejecting malformed webhook payload");
            return (StatusCode::BAD_REQUEST, "malformed payload").into_response();
        }
    };

    match state.reconciler.apply_event(&envelope).await {
        Ok(Applied::Ignored) => {
            // Acknowledge so the provider does not retry events this
            // core does not care about.
            debug!(event_id, kind = %envelope.kind, "Acknowledged unhandled event type");
            StatusCode::OK.into_response()
        }
        Ok(applied) => {
            debug!(event_id, kind = %envelope.kind, ?applied, "Event applied");
            StatusCode::OK.into_response()
        }
        Err(CoachwayError::Validation(msg)) => {
            warn!(event_id, error = %msg, "Rejecting invalid event");
            (StatusCode::BAD_REQUEST, "invalid event").into_response()
        }
        Err(err) if err.is_retryable() => {
            // Transient: dependent org/user not reconciled yet, or a
            // storage failure. Ask the provider to redeliver.
            warn!(event_id, error = %err, "Event not yet appliable, requesting redelivery");
            (StatusCode::SERVICE_UNAVAILABLE, "retry later").into_response()
        }
        Err(err) => err.into_response(),
    }
}

fn required_headers(headers: &HeaderMap) -> Option<(&str, &str, &str)> {
    let event_id = headers.get(HEADER_EVENT_ID)?.to_str().ok()?;
    let timestamp = headers.get(HEADER_TIMESTAMP)?.to_str().ok()?;
    let signature = headers.get(HEADER_SIGNATURE)?.to_str().ok()?;
    Some((event_id, timestamp, signature))
}
