//! Storage collaborator traits and durable entity types.
//!
//! The relational engine itself is out of scope; these traits are the
//! contract this core consumes: row reads keyed by unique columns and
//! atomic "insert, or update on conflict" primitives. Reconciliation
//! must never implement its own check-then-write locking, so every
//! write that can race a concurrent redelivery is expressed here as a
//! single atomic operation.

pub mod memory;
mod membership;
mod organization;
mod user;

pub use membership::{MembershipStore, MembershipUpsert};
pub use memory::InMemoryDirectory;
pub use organization::{OrganizationStore, OrganizationUpsert};
pub use user::{UserStore, UserUpsert};

use crate::roles::OrgRole;

/// Durable user identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// Internal id, system-generated and stable.
    pub id: String,
    /// Provider-issued id. Absent for users created outside the
    /// provider flow (seeded or migrated) until their first provider
    /// event re-attaches it.
    pub external_id: Option<String>,
    /// Unique email; the durable secondary key while `external_id` is
    /// absent.
    pub email: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Avatar reference.
    pub avatar_url: Option<String>,
    /// Creation timestamp (Unix seconds).
    pub created_at: u64,
    /// Last update timestamp (Unix seconds).
    pub updated_at: u64,
}

/// Durable tenant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Organization {
    /// Internal id.
    pub id: String,
    /// Provider-issued id. Not guaranteed unique by a storage
    /// constraint, so reconciliation handles "no existing row" vs
    /// "existing row" explicitly.
    pub external_id: String,
    /// Organization name.
    pub name: String,
}

/// Join entity binding one user to one organization with one role.
///
/// At most one row exists per (org_id, user_id) pair; the storage
/// layer enforces this with a uniqueness constraint that the upsert
/// primitives rely on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Membership {
    /// Internal id.
    pub id: String,
    /// Internal organization id.
    pub org_id: String,
    /// Internal user id.
    pub user_id: String,
    /// The member's role.
    pub role: OrgRole,
    /// Provider-issued membership id, for idempotent correlation with
    /// provider events.
    pub external_id: Option<String>,
}
