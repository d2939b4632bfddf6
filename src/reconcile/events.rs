//! Provider event envelope and payload types.
//!
//! The identity provider pushes change notifications as a JSON
//! envelope of `{ "type": ..., "data": ... }`. Payloads are decoded
//! lazily per event kind so an unrecognized type can be acknowledged
//! without inspecting its data at all.

use crate::error::{CoachwayError, Result};
use serde::Deserialize;

/// Raw signed event envelope as delivered by the provider.
#[derive(Clone, Debug, Deserialize)]
pub struct EventEnvelope {
    /// Event type, e.g. `"user.created"` or
    /// `"organizationMembership.updated"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event payload; shape depends on `kind`.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventEnvelope {
    /// Parse an envelope from a raw body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| CoachwayError::validation(format!("malformed event envelope: {e}")))
    }

    /// Decode the payload for this envelope's kind.
    pub(crate) fn payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            CoachwayError::validation(format!("malformed {} payload: {e}", self.kind))
        })
    }
}

/// Payload of `user.created` / `user.updated`.
#[derive(Clone, Debug, Deserialize)]
pub struct UserPayload {
    /// Provider-issued user id.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar reference.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Payload of `organization.created` / `organization.updated`.
#[derive(Clone, Debug, Deserialize)]
pub struct OrganizationPayload {
    /// Provider-issued organization id.
    pub id: String,
    /// Organization name.
    pub name: String,
}

/// Payload of `organizationMembership.created` / `.updated`.
#[derive(Clone, Debug, Deserialize)]
pub struct MembershipPayload {
    /// Provider-issued membership id.
    pub id: String,
    /// Provider-issued organization id.
    pub organization_id: String,
    /// Provider-issued user id.
    pub user_id: String,
    /// Role label in the provider's vocabulary.
    pub role: String,
}

/// Payload of the deletion events: only the provider id matters.
#[derive(Clone, Debug, Deserialize)]
pub struct DeletedPayload {
    /// Provider-issued id of the deleted entity.
    pub id: String,
}
