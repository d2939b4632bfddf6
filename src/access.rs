//! Organization access guard.
//!
//! Confirms membership and role sufficiency against the membership
//! store. This is the authoritative half of the double-resolution
//! design: whatever role hint a request carried, every privileged
//! operation re-derives the role from storage at call time, so a
//! forged or stale advisory signal can never escalate privilege.

use crate::context::AuthContext;
use crate::error::{CoachwayError, Result};
use crate::roles::OrgRole;
use crate::storage::MembershipStore;
use tracing::instrument;

/// Validates organization access for a resolved context.
pub struct OrgAccessGuard<M: MembershipStore> {
    membership_store: M,
}

impl<M: MembershipStore> OrgAccessGuard<M> {
    /// Create a guard over the given membership store.
    #[must_use]
    pub fn new(membership_store: M) -> Self {
        Self { membership_store }
    }

    /// Assert that the context's caller may act in its organization.
    ///
    /// Fails with `Forbidden` when no organization is selected, when
    /// the caller holds no membership in it, or when `min_role` is set
    /// and the store-confirmed role does not satisfy it. On success the
    /// returned context carries the authoritative role, overwriting
    /// anything the resolver had. If the store has no role for the
    /// caller, access is denied regardless of any advisory value.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn assert_org_access(
        &self,
        ctx: &AuthContext,
        min_role: Option<OrgRole>,
    ) -> Result<AuthContext> {
        let org_id = ctx
            .org_id
            .as_deref()
            .ok_or_else(|| CoachwayError::forbidden("no organization selected"))?;

        let membership = self
            .membership_store
            .get_membership(org_id, &ctx.user_id)
            .await?
            .ok_or_else(|| CoachwayError::forbidden("not a member of this organization"))?;

        if let Some(min) = min_role {
            if !membership.role.has_at_least(min) {
                return Err(CoachwayError::forbidden(format!(
                    "insufficient role: requires at least {min}"
                )));
            }
        }

        Ok(ctx.with_role(membership.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDirectory;

    fn ctx(user_id: &str, org_id: Option<&str>) -> AuthContext {
        AuthContext {
            user_id: user_id.to_string(),
            session_id: None,
            org_id: org_id.map(str::to_string),
            org_role: None,
        }
    }

    #[tokio::test]
    async fn test_no_org_selected_is_forbidden() {
        let guard = OrgAccessGuard::new(InMemoryDirectory::new());
        let err = guard
            .assert_org_access(&ctx("u1", None), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoachwayError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_non_member_is_forbidden_even_with_advisory_role() {
        let store = InMemoryDirectory::new();
        let org_id = store.seed_org("ext-1", "Gym A");
        let guard = OrgAccessGuard::new(store);

        // Advisory role on the context must not act as a fallback.
        let mut context = ctx("u1", Some(&org_id));
        context.org_role = Some(OrgRole::Owner);

        let err = guard
            .assert_org_access(&context, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoachwayError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_min_role_boundary() {
        let store = InMemoryDirectory::new();
        let org_id = store.seed_org("ext-1", "Gym A");
        let athlete = store.seed_user(Some("ext-a"), "athlete@example.com");
        let coach = store.seed_user(Some("ext-c"), "coach@example.com");
        store.seed_membership(&org_id, &athlete, OrgRole::Athlete);
        store.seed_membership(&org_id, &coach, OrgRole::Coach);
        let guard = OrgAccessGuard::new(store);

        let err = guard
            .assert_org_access(&ctx(&athlete, Some(&org_id)), Some(OrgRole::Coach))
            .await
            .unwrap_err();
        assert!(matches!(err, CoachwayError::Forbidden(_)));

        let resolved = guard
            .assert_org_access(&ctx(&coach, Some(&org_id)), Some(OrgRole::Coach))
            .await
            .unwrap();
        assert_eq!(resolved.org_role, Some(OrgRole::Coach));
    }

    #[tokio::test]
    async fn test_authoritative_role_overwrites_advisory() {
        let store = InMemoryDirectory::new();
        let org_id = store.seed_org("ext-1", "Gym A");
        let user_id = store.seed_user(Some("ext-u"), "member@example.com");
        store.seed_membership(&org_id, &user_id, OrgRole::Athlete);
        let guard = OrgAccessGuard::new(store);

        let mut context = ctx(&user_id, Some(&org_id));
        context.org_role = Some(OrgRole::Admin); // forged advisory value

        let resolved = guard.assert_org_access(&context, None).await.unwrap();
        assert_eq!(resolved.org_role, Some(OrgRole::Athlete));
    }

    #[tokio::test]
    async fn test_higher_roles_satisfy_min_role() {
        let store = InMemoryDirectory::new();
        let org_id = store.seed_org("ext-1", "Gym A");
        for (email, ext, role) in [
            ("admin@example.com", "ext-ad", OrgRole::Admin),
            ("owner@example.com", "ext-ow", OrgRole::Owner),
        ] {
            let user_id = store.seed_user(Some(ext), email);
            store.seed_membership(&org_id, &user_id, role);
            let guard = OrgAccessGuard::new(store.clone());
            let resolved = guard
                .assert_org_access(&ctx(&user_id, Some(&org_id)), Some(OrgRole::Coach))
                .await
                .unwrap();
            assert_eq!(resolved.org_role, Some(role));
        }
    }
}
