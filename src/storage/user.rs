//! User storage trait.

use super::User;
use crate::error::Result;
use async_trait::async_trait;

/// Field set applied by a user upsert.
///
/// Carries the provider's view of the user; the store fills in the
/// internal id and timestamps.
#[derive(Clone, Debug)]
pub struct UserUpsert {
    /// Provider-issued user id.
    pub external_id: String,
    /// Email address (unique column).
    pub email: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Avatar reference.
    pub avatar_url: Option<String>,
}

/// Trait for user storage operations.
///
/// # Example
///
/// ```rust,ignore
/// use coachway::storage::{UserStore, UserUpsert};
/// use async_trait::async_trait;
///
/// struct PgUserStore { pool: PgPool }
///
/// #[async_trait]
/// impl UserStore for PgUserStore {
///     async fn update_by_external_id(&self, external_id: &str, fields: &UserUpsert) -> Result<bool> {
///         let rows = sqlx::query("UPDATE users SET email = $2, ... WHERE external_id = $1")
///             .execute(&self.pool).await?.rows_affected();
///         Ok(rows > 0)
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Update the row matching a provider user id.
    ///
    /// Returns `true` when a row matched, `false` when zero rows did.
    async fn update_by_external_id(&self, external_id: &str, fields: &UserUpsert) -> Result<bool>;

    /// Insert a new user; on an email-uniqueness conflict, update the
    /// existing row instead, re-attaching `external_id` to it.
    ///
    /// Must be a single atomic statement (`INSERT ... ON CONFLICT
    /// (email) DO UPDATE` or equivalent) so that two concurrent
    /// deliveries for the same email resolve to one surviving row.
    async fn insert_on_email_conflict_update(&self, fields: &UserUpsert) -> Result<User>;

    /// Hard-delete the row matching a provider user id, cascading to
    /// dependent memberships. Returns `false` when no row matched.
    async fn delete_by_external_id(&self, external_id: &str) -> Result<bool>;

    /// Look up a user by provider id.
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>>;

    /// Look up a user by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}
