//! Membership storage trait.

use super::Membership;
use crate::error::Result;
use crate::roles::OrgRole;
use async_trait::async_trait;

/// Field set applied by a membership upsert.
///
/// Org and user ids here are *internal* ids; the reconciler resolves
/// them from provider ids before reaching the store.
#[derive(Clone, Debug)]
pub struct MembershipUpsert {
    /// Internal organization id.
    pub org_id: String,
    /// Internal user id.
    pub user_id: String,
    /// Role to hold in the organization.
    pub role: OrgRole,
    /// Provider-issued membership id.
    pub external_id: Option<String>,
}

/// Trait for membership storage operations.
///
/// The (org_id, user_id) pair is unique at the storage layer; the
/// upsert primitive below leans on that constraint instead of any
/// application-level locking.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Get the membership for a (org, user) pair.
    async fn get_membership(&self, org_id: &str, user_id: &str) -> Result<Option<Membership>>;

    /// List all memberships held by a user.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Membership>>;

    /// Update role (and keep external id) on the row matching a
    /// provider membership id. Returns `false` when zero rows matched.
    async fn update_by_external_id(&self, external_id: &str, role: OrgRole) -> Result<bool>;

    /// Insert a membership; on an (org, user) uniqueness conflict,
    /// update role and external id on the existing row instead.
    ///
    /// Must be a single atomic statement. Two concurrent inserts for
    /// the same pair must resolve to one surviving row whose role is
    /// the last writer's (by event processing order).
    async fn insert_on_pair_conflict_update(&self, fields: &MembershipUpsert)
        -> Result<Membership>;

    /// Delete the row matching a provider membership id. Returns
    /// `false` when no row matched.
    async fn delete_by_external_id(&self, external_id: &str) -> Result<bool>;

    /// Check if a user is a member of an organization.
    async fn is_member(&self, org_id: &str, user_id: &str) -> Result<bool> {
        Ok(self.get_membership(org_id, user_id).await?.is_some())
    }
}
