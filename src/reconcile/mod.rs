//! Identity reconciliation.
//!
//! Consumes verified provider change-events and keeps the user,
//! organization, and membership tables consistent with the external
//! identity provider. Delivery may be reordered or duplicated, so
//! every write path is an idempotent upsert or a redelivery-safe
//! delete, and ordering is pushed down to storage-level unique
//! constraints instead of application locking.
//!
//! Signature verification happens upstream; events reaching this
//! module are already trusted.

mod events;

pub use events::{
    DeletedPayload, EventEnvelope, MembershipPayload, OrganizationPayload, UserPayload,
};

use crate::error::{CoachwayError, Result};
use crate::roles::OrgRole;
use crate::storage::{
    MembershipStore, MembershipUpsert, OrganizationStore, OrganizationUpsert, UserStore,
    UserUpsert,
};
use tracing::{debug, info, instrument};

/// What applying an event did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// A user row was created or updated.
    UserUpserted,
    /// A user row was deleted (or was already gone).
    UserDeleted,
    /// An organization row was created or renamed.
    OrganizationUpserted,
    /// A membership row was created or its role updated.
    MembershipUpserted,
    /// A membership row was deleted (or was already gone).
    MembershipDeleted,
    /// The event type is not one this core cares about.
    Ignored,
}

/// Applies provider events against the three stores.
///
/// Stores are constructor-injected so tests can substitute fakes
/// without process-wide state.
pub struct IdentityReconciler<U, O, M>
where
    U: UserStore,
    O: OrganizationStore,
    M: MembershipStore,
{
    users: U,
    orgs: O,
    memberships: M,
}

impl<U, O, M> IdentityReconciler<U, O, M>
where
    U: UserStore,
    O: OrganizationStore,
    M: MembershipStore,
{
    /// Create a reconciler over the given stores.
    #[must_use]
    pub fn new(users: U, orgs: O, memberships: M) -> Self {
        Self {
            users,
            orgs,
            memberships,
        }
    }

    /// Apply one verified provider event.
    ///
    /// Unrecognized event types return [`Applied::Ignored`] so the
    /// transport can acknowledge them and stop redelivery. A
    /// `NotFound` failure from the membership path is transient under
    /// out-of-order delivery; the transport is expected to redeliver.
    #[instrument(skip(self, envelope), fields(kind = %envelope.kind))]
    pub async fn apply_event(&self, envelope: &EventEnvelope) -> Result<Applied> {
        match envelope.kind.as_str() {
            "user.created" | "user.updated" => self.upsert_user(envelope.payload()?).await,
            "user.deleted" => self.delete_user(envelope.payload()?).await,
            "organization.created" | "organization.updated" => {
                self.upsert_organization(envelope.payload()?).await
            }
            "organizationMembership.created" | "organizationMembership.updated" => {
                self.upsert_membership(envelope.payload()?).await
            }
            "organizationMembership.deleted" => self.delete_membership(envelope.payload()?).await,
            other => {
                debug!(kind = other, "Ignoring unrecognized event type");
                Ok(Applied::Ignored)
            }
        }
    }

    /// Create or update a user, keyed by provider id.
    ///
    /// Two-path strategy: update the row matching the external id; if
    /// zero rows matched, insert with an atomic email-conflict update.
    /// The fallback exists because a user may predate their provider
    /// link (seeded or migrated rows), leaving email as the durable
    /// secondary key until the external id is attached.
    async fn upsert_user(&self, payload: UserPayload) -> Result<Applied> {
        let fields = UserUpsert {
            external_id: payload.id.clone(),
            email: payload.email,
            display_name: payload.name,
            avatar_url: payload.avatar_url,
        };

        if self.users.update_by_external_id(&payload.id, &fields).await? {
            debug!(external_id = %payload.id, "User updated by external id");
            return Ok(Applied::UserUpserted);
        }

        let user = self.users.insert_on_email_conflict_update(&fields).await?;
        info!(external_id = %payload.id, user_id = %user.id, "User reconciled");
        Ok(Applied::UserUpserted)
    }

    /// Hard-delete a user; a no-op when already gone (redelivery-safe).
    async fn delete_user(&self, payload: DeletedPayload) -> Result<Applied> {
        if self.users.delete_by_external_id(&payload.id).await? {
            info!(external_id = %payload.id, "User deleted");
        } else {
            debug!(external_id = %payload.id, "User already absent");
        }
        Ok(Applied::UserDeleted)
    }

    /// Create or rename an organization, keyed by provider id.
    ///
    /// Names are not unique, so there is no secondary-key fallback
    /// here: zero rows matched means insert, full stop.
    async fn upsert_organization(&self, payload: OrganizationPayload) -> Result<Applied> {
        let fields = OrganizationUpsert {
            external_id: payload.id.clone(),
            name: payload.name,
        };

        if self.orgs.update_by_external_id(&payload.id, &fields).await? {
            debug!(external_id = %payload.id, "Organization renamed");
            return Ok(Applied::OrganizationUpserted);
        }

        let org = self.orgs.insert(&fields).await?;
        info!(external_id = %payload.id, org_id = %org.id, "Organization reconciled");
        Ok(Applied::OrganizationUpserted)
    }

    /// Create or update a membership.
    ///
    /// A membership event can legitimately arrive before its
    /// organization or user event has been processed; either side
    /// missing is a retryable `NotFound`, and no partial row is
    /// written. Role labels are translated through the role table.
    async fn upsert_membership(&self, payload: MembershipPayload) -> Result<Applied> {
        let org = self
            .orgs
            .find_by_external_id(&payload.organization_id)
            .await?
            .ok_or_else(|| {
                CoachwayError::not_found(format!(
                    "organization {} not reconciled yet",
                    payload.organization_id
                ))
            })?;

        let user = self
            .users
            .find_by_external_id(&payload.user_id)
            .await?
            .ok_or_else(|| {
                CoachwayError::not_found(format!("user {} not reconciled yet", payload.user_id))
            })?;

        let role = OrgRole::from_external_label(&payload.role);

        if self.memberships.update_by_external_id(&payload.id, role).await? {
            debug!(external_id = %payload.id, role = %role, "Membership updated by external id");
            return Ok(Applied::MembershipUpserted);
        }

        let fields = MembershipUpsert {
            org_id: org.id.clone(),
            user_id: user.id.clone(),
            role,
            external_id: Some(payload.id.clone()),
        };
        let membership = self
            .memberships
            .insert_on_pair_conflict_update(&fields)
            .await?;
        info!(
            external_id = %payload.id,
            membership_id = %membership.id,
            role = %role,
            "Membership reconciled"
        );
        Ok(Applied::MembershipUpserted)
    }

    /// Delete a membership; a no-op when already gone.
    async fn delete_membership(&self, payload: DeletedPayload) -> Result<Applied> {
        if self.memberships.delete_by_external_id(&payload.id).await? {
            info!(external_id = %payload.id, "Membership deleted");
        } else {
            debug!(external_id = %payload.id, "Membership already absent");
        }
        Ok(Applied::MembershipDeleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDirectory;

    fn reconciler(
        store: &InMemoryDirectory,
    ) -> IdentityReconciler<InMemoryDirectory, InMemoryDirectory, InMemoryDirectory> {
        IdentityReconciler::new(store.clone(), store.clone(), store.clone())
    }

    fn event(kind: &str, data: serde_json::Value) -> EventEnvelope {
        EventEnvelope {
            kind: kind.to_string(),
            data,
        }
    }

    #[tokio::test]
    async fn test_user_upsert_is_idempotent() {
        let store = InMemoryDirectory::new();
        let rec = reconciler(&store);
        let ev = event(
            "user.created",
            serde_json::json!({"id": "ext-u-1", "email": "a@b.co", "name": "Ana"}),
        );

        rec.apply_event(&ev).await.unwrap();
        rec.apply_event(&ev).await.unwrap();

        let users = store.users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].external_id.as_deref(), Some("ext-u-1"));
        assert_eq!(users[0].email, "a@b.co");
        assert_eq!(users[0].display_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_user_update_changes_fields_in_place() {
        let store = InMemoryDirectory::new();
        let rec = reconciler(&store);
        rec.apply_event(&event(
            "user.created",
            serde_json::json!({"id": "ext-u-1", "email": "a@b.co"}),
        ))
        .await
        .unwrap();
        rec.apply_event(&event(
            "user.updated",
            serde_json::json!({"id": "ext-u-1", "email": "new@b.co", "name": "Ana"}),
        ))
        .await
        .unwrap();

        let users = store.users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "new@b.co");
    }

    #[tokio::test]
    async fn test_user_event_reattaches_external_id_by_email() {
        let store = InMemoryDirectory::new();
        // Seeded before ever being linked to the provider.
        store.seed_user(None, "seeded@b.co");
        let rec = reconciler(&store);

        rec.apply_event(&event(
            "user.created",
            serde_json::json!({"id": "ext-u-9", "email": "seeded@b.co"}),
        ))
        .await
        .unwrap();

        let users = store.users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].external_id.as_deref(), Some("ext-u-9"));
    }

    #[tokio::test]
    async fn test_user_delete_is_redelivery_safe() {
        let store = InMemoryDirectory::new();
        store.seed_user(Some("ext-u-1"), "a@b.co");
        let rec = reconciler(&store);
        let ev = event("user.deleted", serde_json::json!({"id": "ext-u-1"}));

        assert_eq!(rec.apply_event(&ev).await.unwrap(), Applied::UserDeleted);
        assert_eq!(rec.apply_event(&ev).await.unwrap(), Applied::UserDeleted);
        assert!(store.users().is_empty());
    }

    #[tokio::test]
    async fn test_user_delete_cascades_memberships() {
        let store = InMemoryDirectory::new();
        let org_id = store.seed_org("ext-1", "Gym A");
        let user_id = store.seed_user(Some("ext-u-1"), "a@b.co");
        store.seed_membership(&org_id, &user_id, OrgRole::Coach);
        let rec = reconciler(&store);

        rec.apply_event(&event("user.deleted", serde_json::json!({"id": "ext-u-1"})))
            .await
            .unwrap();
        assert!(store.memberships().is_empty());
    }

    #[tokio::test]
    async fn test_organization_upsert_and_rename() {
        let store = InMemoryDirectory::new();
        let rec = reconciler(&store);

        rec.apply_event(&event(
            "organization.created",
            serde_json::json!({"id": "ext-1", "name": "Gym A"}),
        ))
        .await
        .unwrap();
        rec.apply_event(&event(
            "organization.updated",
            serde_json::json!({"id": "ext-1", "name": "Gym Alpha"}),
        ))
        .await
        .unwrap();

        let orgs = store.orgs();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].name, "Gym Alpha");
    }

    #[tokio::test]
    async fn test_membership_before_org_is_retryable_with_no_partial_row() {
        let store = InMemoryDirectory::new();
        store.seed_user(Some("ext-u-1"), "a@b.co");
        let rec = reconciler(&store);

        let membership_ev = event(
            "organizationMembership.created",
            serde_json::json!({
                "id": "m-1", "organization_id": "ext-1",
                "user_id": "ext-u-1", "role": "admin"
            }),
        );

        let err = rec.apply_event(&membership_ev).await.unwrap_err();
        assert!(matches!(err, CoachwayError::NotFound(_)));
        assert!(err.is_retryable());
        assert!(store.memberships().is_empty());

        // Organization arrives; redelivery now succeeds.
        rec.apply_event(&event(
            "organization.created",
            serde_json::json!({"id": "ext-1", "name": "Gym A"}),
        ))
        .await
        .unwrap();
        rec.apply_event(&membership_ev).await.unwrap();

        let memberships = store.memberships();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].role, OrgRole::Admin);
    }

    #[tokio::test]
    async fn test_membership_before_user_is_retryable() {
        let store = InMemoryDirectory::new();
        store.seed_org("ext-1", "Gym A");
        let rec = reconciler(&store);

        let err = rec
            .apply_event(&event(
                "organizationMembership.created",
                serde_json::json!({
                    "id": "m-1", "organization_id": "ext-1",
                    "user_id": "ext-u-1", "role": "coach"
                }),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, CoachwayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_membership_last_write_wins_single_row() {
        let store = InMemoryDirectory::new();
        store.seed_org("ext-1", "Gym A");
        store.seed_user(Some("ext-u-1"), "a@b.co");
        let rec = reconciler(&store);

        rec.apply_event(&event(
            "organizationMembership.created",
            serde_json::json!({
                "id": "m-1", "organization_id": "ext-1",
                "user_id": "ext-u-1", "role": "coach"
            }),
        ))
        .await
        .unwrap();
        rec.apply_event(&event(
            "organizationMembership.updated",
            serde_json::json!({
                "id": "m-1", "organization_id": "ext-1",
                "user_id": "ext-u-1", "role": "admin"
            }),
        ))
        .await
        .unwrap();

        let memberships = store.memberships();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].role, OrgRole::Admin);
    }

    #[tokio::test]
    async fn test_membership_replay_is_a_noop_on_state() {
        let store = InMemoryDirectory::new();
        store.seed_org("ext-1", "Gym A");
        store.seed_user(Some("ext-u-1"), "a@b.co");
        let rec = reconciler(&store);

        let ev = event(
            "organizationMembership.created",
            serde_json::json!({
                "id": "m-1", "organization_id": "ext-1",
                "user_id": "ext-u-1", "role": "admin"
            }),
        );
        rec.apply_event(&ev).await.unwrap();
        let before = store.memberships();
        rec.apply_event(&ev).await.unwrap();
        assert_eq!(store.memberships(), before);
    }

    #[tokio::test]
    async fn test_membership_with_unknown_role_label_maps_to_viewer() {
        let store = InMemoryDirectory::new();
        store.seed_org("ext-1", "Gym A");
        store.seed_user(Some("ext-u-1"), "a@b.co");
        let rec = reconciler(&store);

        rec.apply_event(&event(
            "organizationMembership.created",
            serde_json::json!({
                "id": "m-1", "organization_id": "ext-1",
                "user_id": "ext-u-1", "role": "grandmaster"
            }),
        ))
        .await
        .unwrap();

        assert_eq!(store.memberships()[0].role, OrgRole::Viewer);
    }

    #[tokio::test]
    async fn test_membership_delete_is_redelivery_safe() {
        let store = InMemoryDirectory::new();
        store.seed_org("ext-1", "Gym A");
        store.seed_user(Some("ext-u-1"), "a@b.co");
        let rec = reconciler(&store);

        rec.apply_event(&event(
            "organizationMembership.created",
            serde_json::json!({
                "id": "m-1", "organization_id": "ext-1",
                "user_id": "ext-u-1", "role": "coach"
            }),
        ))
        .await
        .unwrap();

        let ev = event(
            "organizationMembership.deleted",
            serde_json::json!({"id": "m-1"}),
        );
        assert_eq!(rec.apply_event(&ev).await.unwrap(), Applied::MembershipDeleted);
        assert_eq!(rec.apply_event(&ev).await.unwrap(), Applied::MembershipDeleted);
        assert!(store.memberships().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_event_type_is_ignored() {
        let store = InMemoryDirectory::new();
        let rec = reconciler(&store);
        let applied = rec
            .apply_event(&event("session.created", serde_json::json!({"id": "s-1"})))
            .await
            .unwrap();
        assert_eq!(applied, Applied::Ignored);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_validation_error() {
        let store = InMemoryDirectory::new();
        let rec = reconciler(&store);
        let err = rec
            .apply_event(&event("user.created", serde_json::json!({"id": "ext-u-1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, CoachwayError::Validation(_)));
        assert!(!err.is_retryable());
    }
}
