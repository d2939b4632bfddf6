//! Handler guard: policy-driven composition of resolution and access
//! checking around a protected operation.
//!
//! This is the single translation boundary between typed failures and
//! transport responses. Operations wrapped by [`AccessGuard::run`]
//! receive an injected [`AuthContext`] and never deal with status
//! codes; any failure raised by resolution, authorization, or the
//! operation itself is mapped here via the error taxonomy.

use crate::access::OrgAccessGuard;
use crate::context::{AuthContext, AuthContextResolver, RequestSignals};
use crate::error::Result;
use crate::roles::OrgRole;
use crate::storage::MembershipStore;
use axum::response::{IntoResponse, Response};
use std::future::Future;

/// Access policy for a protected operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessPolicy {
    /// No identity required; the operation runs unmodified.
    Public,
    /// Requires a valid caller identity, but no organization.
    AuthenticatedOnly,
    /// Requires membership in the selected organization, optionally at
    /// a minimum role.
    OrgScoped {
        /// Minimum role, when the operation needs more than membership.
        min_role: Option<OrgRole>,
    },
}

impl AccessPolicy {
    /// Org-scoped policy requiring membership only.
    #[must_use]
    pub fn org() -> Self {
        Self::OrgScoped { min_role: None }
    }

    /// Org-scoped policy requiring at least the given role.
    #[must_use]
    pub fn org_with_min_role(min_role: OrgRole) -> Self {
        Self::OrgScoped {
            min_role: Some(min_role),
        }
    }
}

/// Composes [`AuthContextResolver`] and [`OrgAccessGuard`] around
/// protected operations.
///
/// # Example
///
/// ```rust,ignore
/// use coachway::{AccessGuard, AccessPolicy, OrgRole};
///
/// let guard = AccessGuard::new(membership_store);
///
/// let response = guard
///     .run(&signals, &AccessPolicy::org_with_min_role(OrgRole::Coach), |ctx| async move {
///         let ctx = ctx.expect("org-scoped policies always inject a context");
///         start_session(&ctx).await
///     })
///     .await;
/// ```
pub struct AccessGuard<M: MembershipStore> {
    resolver: AuthContextResolver,
    org_guard: OrgAccessGuard<M>,
}

impl<M: MembershipStore> AccessGuard<M> {
    /// Create a guard over the given membership store.
    #[must_use]
    pub fn new(membership_store: M) -> Self {
        Self {
            resolver: AuthContextResolver::new(),
            org_guard: OrgAccessGuard::new(membership_store),
        }
    }

    /// Authorize a request against a policy.
    ///
    /// Returns `None` for `Public` (no context is built at all) and an
    /// injected context otherwise. For `OrgScoped`, the returned
    /// context carries the store-confirmed role.
    pub async fn authorize(
        &self,
        signals: &RequestSignals,
        policy: &AccessPolicy,
    ) -> Result<Option<AuthContext>> {
        match policy {
            AccessPolicy::Public => Ok(None),
            AccessPolicy::AuthenticatedOnly => Ok(Some(self.resolver.resolve(signals)?)),
            AccessPolicy::OrgScoped { min_role } => {
                let candidate = self.resolver.resolve(signals)?;
                let authoritative = self
                    .org_guard
                    .assert_org_access(&candidate, *min_role)
                    .await?;
                Ok(Some(authoritative))
            }
        }
    }

    /// Run an operation under a policy, translating all failures to a
    /// transport response.
    ///
    /// The operation is only invoked after authorization succeeds; an
    /// unauthenticated call to an org-scoped operation never reaches it.
    pub async fn run<F, Fut, T>(
        &self,
        signals: &RequestSignals,
        policy: &AccessPolicy,
        operation: F,
    ) -> Response
    where
        F: FnOnce(Option<AuthContext>) -> Fut,
        Fut: Future<Output = Result<T>>,
        T: IntoResponse,
    {
        let ctx = match self.authorize(signals, policy).await {
            Ok(ctx) => ctx,
            Err(err) => return err.into_response(),
        };

        match operation(ctx).await {
            Ok(value) => value.into_response(),
            Err(err) => err.into_response(),
        }
    }
}
