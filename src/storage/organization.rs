//! Organization storage trait.

use super::Organization;
use crate::error::Result;
use async_trait::async_trait;

/// Field set applied by an organization upsert.
#[derive(Clone, Debug)]
pub struct OrganizationUpsert {
    /// Provider-issued organization id.
    pub external_id: String,
    /// Organization name.
    pub name: String,
}

/// Trait for organization storage operations.
///
/// There is no secondary-key fallback for organizations (names are not
/// unique), so the write surface is smaller than the user store's:
/// update by provider id, or plain insert.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Rename the row matching a provider organization id.
    ///
    /// Returns `true` when a row matched, `false` when zero rows did.
    async fn update_by_external_id(
        &self,
        external_id: &str,
        fields: &OrganizationUpsert,
    ) -> Result<bool>;

    /// Insert a new organization row.
    async fn insert(&self, fields: &OrganizationUpsert) -> Result<Organization>;

    /// Look up an organization by provider id.
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Organization>>;

    /// Look up an organization by internal id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>>;
}
