//! Request-scoped authentication context.
//!
//! [`AuthContextResolver`] assembles a *candidate* context from a
//! request's trusted signals only. It never touches the membership
//! store; authority over the role is established later by
//! [`OrgAccessGuard`](crate::access::OrgAccessGuard). Keeping
//! resolution signal-only means public and user-scoped operations
//! never pay for a membership lookup.

use crate::error::{CoachwayError, Result};
use crate::roles::OrgRole;

/// Trusted signals extracted from an inbound request.
///
/// All fields are optional; the resolver decides which combinations
/// constitute an authenticated caller and which organization the call
/// is aimed at.
#[derive(Clone, Debug, Default)]
pub struct RequestSignals {
    /// Verified caller user id (absent for anonymous requests).
    pub user_id: Option<String>,
    /// Active session id, when the transport layer knows it.
    pub session_id: Option<String>,
    /// Organization id taken from the route path, when the call is for
    /// a specific organization.
    pub path_org_id: Option<String>,
    /// Organization id supplied via a header, for server-to-server calls.
    pub header_org_id: Option<String>,
    /// The provider-reported "currently active organization".
    pub active_org_id: Option<String>,
    /// The provider-reported role label for the active organization.
    /// Advisory only; never trusted for authorization decisions.
    pub active_org_role: Option<String>,
}

impl RequestSignals {
    /// Signals for an authenticated caller with no org hints.
    #[must_use]
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Attach a session id.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attach a route-path organization id.
    #[must_use]
    pub fn with_path_org(mut self, org_id: impl Into<String>) -> Self {
        self.path_org_id = Some(org_id.into());
        self
    }

    /// Attach a header-supplied organization id.
    #[must_use]
    pub fn with_header_org(mut self, org_id: impl Into<String>) -> Self {
        self.header_org_id = Some(org_id.into());
        self
    }

    /// Attach the provider's active organization and advisory role label.
    #[must_use]
    pub fn with_active_org(
        mut self,
        org_id: impl Into<String>,
        role_label: Option<String>,
    ) -> Self {
        self.active_org_id = Some(org_id.into());
        self.active_org_role = role_label;
        self
    }
}

/// Who is calling, in which organization, with what role.
///
/// Constructed once per request, immutable afterwards, never persisted.
/// `org_role` is `None` until [`OrgAccessGuard`](crate::access::OrgAccessGuard)
/// has confirmed it against the membership store; the resolver's own
/// role hint is advisory and is deliberately not stored here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    /// The authenticated caller's user id.
    pub user_id: String,
    /// The caller's session id, when known.
    pub session_id: Option<String>,
    /// The organization the call is acting in, when one was selected.
    pub org_id: Option<String>,
    /// The caller's role in `org_id`, once authoritatively resolved.
    pub org_role: Option<OrgRole>,
}

impl AuthContext {
    /// Return a copy with the authoritative role filled in.
    #[must_use]
    pub(crate) fn with_role(&self, role: OrgRole) -> Self {
        Self {
            org_role: Some(role),
            ..self.clone()
        }
    }
}

/// Builds a candidate [`AuthContext`] from request signals.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuthContextResolver;

impl AuthContextResolver {
    /// Create a resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve a candidate context from the request's trusted signals.
    ///
    /// Fails with `Unauthenticated` when no caller identity signal is
    /// present. The organization id is chosen by strict precedence:
    /// route path, then header, then the provider's active org. The
    /// path is the most specific signal of *intended* tenant, the
    /// header is a secondary override for server-to-server calls, and
    /// the active org is only a convenience default for callers who
    /// belong to many organizations.
    pub fn resolve(&self, signals: &RequestSignals) -> Result<AuthContext> {
        let user_id = signals
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoachwayError::unauthenticated("no caller identity"))?;

        let org_id = [
            signals.path_org_id.as_deref(),
            signals.header_org_id.as_deref(),
            signals.active_org_id.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|id| !id.is_empty())
        .map(str::to_string);

        Ok(AuthContext {
            user_id: user_id.to_string(),
            session_id: signals.session_id.clone(),
            org_id,
            org_role: None,
        })
    }
}
