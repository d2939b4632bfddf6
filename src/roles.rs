//! Organization role hierarchy.
//!
//! Roles form a strict total order from least to most privileged:
//! `viewer < athlete < coach < admin < owner`. "Sufficiency" is an
//! index comparison, never a per-permission lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a user holds within one organization.
///
/// The set is closed: callers may only require and receive these five
/// values. Ordering is by privilege, lowest first.
///
/// # Example
///
/// ```rust
/// use coachway::OrgRole;
///
/// assert!(OrgRole::Admin.has_at_least(OrgRole::Coach));
/// assert!(!OrgRole::Athlete.has_at_least(OrgRole::Coach));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    /// Read-only access to organization data.
    #[default]
    Viewer,
    /// A training participant.
    Athlete,
    /// Runs sessions and programs for athletes.
    Coach,
    /// Manages members and organization settings.
    Admin,
    /// Organization owner with full privileges.
    Owner,
}

impl OrgRole {
    /// Get the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Athlete => "athlete",
            Self::Coach => "coach",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Get the hierarchy level (higher = more privileged).
    #[must_use]
    pub fn hierarchy_level(&self) -> u8 {
        match self {
            Self::Viewer => 1,
            Self::Athlete => 2,
            Self::Coach => 3,
            Self::Admin => 4,
            Self::Owner => 5,
        }
    }

    /// Check if this role is at least as privileged as another.
    #[must_use]
    pub fn has_at_least(&self, other: Self) -> bool {
        self.hierarchy_level() >= other.hierarchy_level()
    }

    /// Translate a role label from the identity provider's vocabulary.
    ///
    /// The provider's label set is open-ended; this table maps the
    /// labels it is known to emit (including `org:`-prefixed forms)
    /// onto the closed internal set. Unrecognized labels map to
    /// [`OrgRole::Viewer`] rather than failing, so an otherwise-valid
    /// identity event is never rejected over an unfamiliar label.
    /// Authorization still fails closed: `Viewer` grants nothing above
    /// the lowest tier.
    #[must_use]
    pub fn from_external_label(label: &str) -> Self {
        let label = label.strip_prefix("org:").unwrap_or(label);
        match label {
            "owner" => Self::Owner,
            "admin" => Self::Admin,
            "coach" | "trainer" => Self::Coach,
            "athlete" | "member" | "basic_member" => Self::Athlete,
            _ => Self::Viewer,
        }
    }
}

/// Check that a possibly-absent role satisfies a minimum.
///
/// Absence of a role is never sufficient, regardless of the minimum.
#[must_use]
pub fn role_satisfies(role: Option<OrgRole>, min: OrgRole) -> bool {
    role.is_some_and(|r| r.has_at_least(min))
}

/// Error returned when parsing a role string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    invalid_value: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid role: '{}' (expected: viewer, athlete, coach, admin, or owner)",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for OrgRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "athlete" => Ok(Self::Athlete),
            "coach" => Ok(Self::Coach),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            _ => Err(ParseRoleError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERED: [OrgRole; 5] = [
        OrgRole::Viewer,
        OrgRole::Athlete,
        OrgRole::Coach,
        OrgRole::Admin,
        OrgRole::Owner,
    ];

    #[test]
    fn test_total_order_consistent_with_declared_sequence() {
        for (i, a) in ORDERED.iter().enumerate() {
            for (j, b) in ORDERED.iter().enumerate() {
                assert_eq!(a.has_at_least(*b), i >= j, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_absent_role_is_never_sufficient() {
        for min in ORDERED {
            assert!(!role_satisfies(None, min));
        }
        assert!(role_satisfies(Some(OrgRole::Viewer), OrgRole::Viewer));
    }

    #[test]
    fn test_external_label_translation() {
        assert_eq!(OrgRole::from_external_label("owner"), OrgRole::Owner);
        assert_eq!(OrgRole::from_external_label("org:admin"), OrgRole::Admin);
        assert_eq!(OrgRole::from_external_label("coach"), OrgRole::Coach);
        assert_eq!(OrgRole::from_external_label("basic_member"), OrgRole::Athlete);
        assert_eq!(OrgRole::from_external_label("member"), OrgRole::Athlete);
    }

    #[test]
    fn test_unknown_external_label_maps_to_viewer() {
        assert_eq!(OrgRole::from_external_label("superuser"), OrgRole::Viewer);
        assert_eq!(OrgRole::from_external_label(""), OrgRole::Viewer);
        assert_eq!(OrgRole::from_external_label("org:billing"), OrgRole::Viewer);
    }

    #[test]
    fn test_role_parsing_and_display() {
        assert_eq!("owner".parse::<OrgRole>().unwrap(), OrgRole::Owner);
        assert_eq!("COACH".parse::<OrgRole>().unwrap(), OrgRole::Coach);
        assert!("manager".parse::<OrgRole>().is_err());
        assert_eq!(OrgRole::Athlete.to_string(), "athlete");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&OrgRole::Coach).unwrap();
        assert_eq!(json, "\"coach\"");
        let parsed: OrgRole = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, OrgRole::Coach);
    }
}
