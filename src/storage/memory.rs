//! In-memory store implementing all three storage traits.
//!
//! For development and testing; production deployments implement the
//! traits against their relational engine. Enforces the same
//! uniqueness rules real storage would (unique email on users, unique
//! (org_id, user_id) pair on memberships) so the reconciler's conflict
//! paths are exercised exactly as they would be against a database.
//! Cloning shares the same underlying data.

use super::{
    Membership, MembershipStore, MembershipUpsert, Organization, OrganizationStore,
    OrganizationUpsert, User, UserStore, UserUpsert,
};
use crate::error::Result;
use crate::roles::OrgRole;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

struct DirectoryInner {
    users: RwLock<HashMap<String, User>>, // id -> user
    orgs: RwLock<HashMap<String, Organization>>, // id -> org
    memberships: RwLock<HashMap<String, Membership>>, // id -> membership
    next_id: RwLock<u64>,
}

/// Shared in-memory directory of users, organizations, and memberships.
#[derive(Clone)]
pub struct InMemoryDirectory {
    inner: Arc<DirectoryInner>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                users: RwLock::new(HashMap::new()),
                orgs: RwLock::new(HashMap::new()),
                memberships: RwLock::new(HashMap::new()),
                next_id: RwLock::new(1),
            }),
        }
    }

    fn allocate_id(&self, prefix: &str) -> String {
        let mut next = self.inner.next_id.write().unwrap();
        let id = format!("{prefix}-{next}");
        *next += 1;
        id
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    /// Seed a user directly (for test setup). Returns the internal id.
    pub fn seed_user(&self, external_id: Option<&str>, email: &str) -> String {
        let id = self.allocate_id("user");
        let now = Self::now();
        self.inner.users.write().unwrap().insert(
            id.clone(),
            User {
                id: id.clone(),
                external_id: external_id.map(str::to_string),
                email: email.to_string(),
                display_name: None,
                avatar_url: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    /// Seed an organization directly. Returns the internal id.
    pub fn seed_org(&self, external_id: &str, name: &str) -> String {
        let id = self.allocate_id("org");
        self.inner.orgs.write().unwrap().insert(
            id.clone(),
            Organization {
                id: id.clone(),
                external_id: external_id.to_string(),
                name: name.to_string(),
            },
        );
        id
    }

    /// Seed a membership directly. Returns the internal id.
    pub fn seed_membership(&self, org_id: &str, user_id: &str, role: OrgRole) -> String {
        let id = self.allocate_id("mem");
        self.inner.memberships.write().unwrap().insert(
            id.clone(),
            Membership {
                id: id.clone(),
                org_id: org_id.to_string(),
                user_id: user_id.to_string(),
                role,
                external_id: None,
            },
        );
        id
    }

    /// Snapshot of all user rows (for test assertions).
    pub fn users(&self) -> Vec<User> {
        self.inner.users.read().unwrap().values().cloned().collect()
    }

    /// Snapshot of all organization rows.
    pub fn orgs(&self) -> Vec<Organization> {
        self.inner.orgs.read().unwrap().values().cloned().collect()
    }

    /// Snapshot of all membership rows.
    pub fn memberships(&self) -> Vec<Membership> {
        self.inner
            .memberships
            .read()
            .unwrap()
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UserStore for InMemoryDirectory {
    async fn update_by_external_id(&self, external_id: &str, fields: &UserUpsert) -> Result<bool> {
        let mut users = self.inner.users.write().unwrap();
        let matched = users
            .values_mut()
            .find(|u| u.external_id.as_deref() == Some(external_id));
        match matched {
            Some(user) => {
                user.email = fields.email.clone();
                user.display_name = fields.display_name.clone();
                user.avatar_url = fields.avatar_url.clone();
                user.updated_at = Self::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_on_email_conflict_update(&self, fields: &UserUpsert) -> Result<User> {
        let mut users = self.inner.users.write().unwrap();

        // Email is a unique column; an insert racing an existing row
        // becomes an update that re-attaches the external id.
        if let Some(existing) = users.values_mut().find(|u| u.email == fields.email) {
            existing.external_id = Some(fields.external_id.clone());
            existing.display_name = fields.display_name.clone();
            existing.avatar_url = fields.avatar_url.clone();
            existing.updated_at = Self::now();
            return Ok(existing.clone());
        }

        let id = self.allocate_id("user");
        let now = Self::now();
        let user = User {
            id: id.clone(),
            external_id: Some(fields.external_id.clone()),
            email: fields.email.clone(),
            display_name: fields.display_name.clone(),
            avatar_url: fields.avatar_url.clone(),
            created_at: now,
            updated_at: now,
        };
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn delete_by_external_id(&self, external_id: &str) -> Result<bool> {
        let removed: Option<String> = {
            let users = self.inner.users.read().unwrap();
            users
                .values()
                .find(|u| u.external_id.as_deref() == Some(external_id))
                .map(|u| u.id.clone())
        };
        match removed {
            Some(id) => {
                self.inner.users.write().unwrap().remove(&id);
                // Cascade, as the relational FK constraint would.
                self.inner
                    .memberships
                    .write()
                    .unwrap()
                    .retain(|_, m| m.user_id != id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl OrganizationStore for InMemoryDirectory {
    async fn update_by_external_id(
        &self,
        external_id: &str,
        fields: &OrganizationUpsert,
    ) -> Result<bool> {
        let mut orgs = self.inner.orgs.write().unwrap();
        match orgs.values_mut().find(|o| o.external_id == external_id) {
            Some(org) => {
                org.name = fields.name.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert(&self, fields: &OrganizationUpsert) -> Result<Organization> {
        let id = self.allocate_id("org");
        let org = Organization {
            id: id.clone(),
            external_id: fields.external_id.clone(),
            name: fields.name.clone(),
        };
        self.inner.orgs.write().unwrap().insert(id, org.clone());
        Ok(org)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Organization>> {
        Ok(self
            .inner
            .orgs
            .read()
            .unwrap()
            .values()
            .find(|o| o.external_id == external_id)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>> {
        Ok(self.inner.orgs.read().unwrap().get(id).cloned())
    }
}

#[async_trait]
impl MembershipStore for InMemoryDirectory {
    async fn get_membership(&self, org_id: &str, user_id: &str) -> Result<Option<Membership>> {
        Ok(self
            .inner
            .memberships
            .read()
            .unwrap()
            .values()
            .find(|m| m.org_id == org_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Membership>> {
        Ok(self
            .inner
            .memberships
            .read()
            .unwrap()
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_by_external_id(&self, external_id: &str, role: OrgRole) -> Result<bool> {
        let mut memberships = self.inner.memberships.write().unwrap();
        match memberships
            .values_mut()
            .find(|m| m.external_id.as_deref() == Some(external_id))
        {
            Some(membership) => {
                membership.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_on_pair_conflict_update(
        &self,
        fields: &MembershipUpsert,
    ) -> Result<Membership> {
        let mut memberships = self.inner.memberships.write().unwrap();

        // The (org_id, user_id) pair is unique; a racing insert becomes
        // an update with last-writer-wins on role.
        if let Some(existing) = memberships
            .values_mut()
            .find(|m| m.org_id == fields.org_id && m.user_id == fields.user_id)
        {
            existing.role = fields.role;
            existing.external_id = fields.external_id.clone();
            return Ok(existing.clone());
        }

        let id = self.allocate_id("mem");
        let membership = Membership {
            id: id.clone(),
            org_id: fields.org_id.clone(),
            user_id: fields.user_id.clone(),
            role: fields.role,
            external_id: fields.external_id.clone(),
        };
        memberships.insert(id, membership.clone());
        Ok(membership)
    }

    async fn delete_by_external_id(&self, external_id: &str) -> Result<bool> {
        let mut memberships = self.inner.memberships.write().unwrap();
        let id = memberships
            .values()
            .find(|m| m.external_id.as_deref() == Some(external_id))
            .map(|m| m.id.clone());
        match id {
            Some(id) => {
                memberships.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_by_email_and_external_id() {
        let store = InMemoryDirectory::new();
        store.seed_user(Some("ext-u-1"), "coach@example.com");

        let by_email = store.find_by_email("coach@example.com").await.unwrap();
        assert_eq!(by_email.unwrap().external_id.as_deref(), Some("ext-u-1"));

        let by_external = UserStore::find_by_external_id(&store, "ext-u-1")
            .await
            .unwrap();
        assert_eq!(by_external.unwrap().email, "coach@example.com");

        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_org_find_by_id() {
        let store = InMemoryDirectory::new();
        let org_id = store.seed_org("ext-1", "Gym A");

        let org = store.find_by_id(&org_id).await.unwrap().unwrap();
        assert_eq!(org.name, "Gym A");

        assert!(store.find_by_id("org-999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_user_spans_organizations() {
        let store = InMemoryDirectory::new();
        let gym_a = store.seed_org("ext-1", "Gym A");
        let gym_b = store.seed_org("ext-2", "Gym B");
        let user_id = store.seed_user(Some("ext-u-1"), "coach@example.com");
        let other = store.seed_user(Some("ext-u-2"), "other@example.com");
        store.seed_membership(&gym_a, &user_id, OrgRole::Coach);
        store.seed_membership(&gym_b, &user_id, OrgRole::Athlete);
        store.seed_membership(&gym_a, &other, OrgRole::Viewer);

        let mut memberships = store.list_for_user(&user_id).await.unwrap();
        memberships.sort_by(|a, b| a.org_id.cmp(&b.org_id));
        assert_eq!(memberships.len(), 2);
        assert_eq!(memberships[0].org_id, gym_a);
        assert_eq!(memberships[0].role, OrgRole::Coach);
        assert_eq!(memberships[1].org_id, gym_b);
        assert_eq!(memberships[1].role, OrgRole::Athlete);
    }

    #[tokio::test]
    async fn test_is_member_reflects_membership_only() {
        let store = InMemoryDirectory::new();
        let org_id = store.seed_org("ext-1", "Gym A");
        let member = store.seed_user(Some("ext-u-1"), "member@example.com");
        let outsider = store.seed_user(Some("ext-u-2"), "outsider@example.com");
        store.seed_membership(&org_id, &member, OrgRole::Viewer);

        assert!(store.is_member(&org_id, &member).await.unwrap());
        assert!(!store.is_member(&org_id, &outsider).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_delete_cascades_memberships() {
        let store = InMemoryDirectory::new();
        let org_id = store.seed_org("ext-1", "Gym A");
        let user_id = store.seed_user(Some("ext-u-1"), "coach@example.com");
        store.seed_membership(&org_id, &user_id, OrgRole::Coach);

        assert!(UserStore::delete_by_external_id(&store, "ext-u-1")
            .await
            .unwrap());
        assert!(store.users().is_empty());
        assert!(store.memberships().is_empty());
    }
}
