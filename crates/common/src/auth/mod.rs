//! Identity and role model
//!
//! Authentication itself (passwords, OAuth) lives in the identity provider
//! sitting in front of the gateway. That provider forwards the authenticated
//! user as trusted headers; this module extracts them into a [`UserIdentity`]
//! and defines the review-authority ordering over roles.

use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Review roles, ordered by authority: Lecturer < DRO < Super-Admin.
///
/// `Ord` follows declaration order, so `Role::Lecturer < Role::SuperAdmin`
/// holds and `rank()` is only needed where a number is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Rank 1: submits papers, edits own drafts
    Lecturer,
    /// Rank 2: first-stage verifier ("DRO")
    DepartmentResearchOfficer,
    /// Rank 3: final verifier and publisher; may view/delete any paper
    SuperAdmin,
}

impl Role {
    /// Numeric authority rank (1-based)
    pub fn rank(&self) -> u8 {
        match self {
            Role::Lecturer => 1,
            Role::DepartmentResearchOfficer => 2,
            Role::SuperAdmin => 3,
        }
    }

    /// Wire name as issued by the identity provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Lecturer => "Lecturer",
            Role::DepartmentResearchOfficer => "Department Research Officer",
            Role::SuperAdmin => "Super-Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        // The hyphenated DRO spelling appears in older identity records.
        match s {
            "Lecturer" => Ok(Role::Lecturer),
            "Department Research Officer" | "Department-Research-Officer" => {
                Ok(Role::DepartmentResearchOfficer)
            }
            "Super-Admin" => Ok(Role::SuperAdmin),
            other => Err(AppError::Unauthorized {
                message: format!("Unknown role: {}", other),
            }),
        }
    }
}

/// Authenticated user identity, as supplied by the identity provider.
///
/// The profile fields are carried for display only and never influence
/// workflow decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub research_interests: Vec<String>,
}

impl UserIdentity {
    /// Check membership in an allowed-role set
    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }

    /// Require membership in an allowed-role set
    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if self.has_role(allowed) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Role {} is not permitted to perform this action",
                self.role
            )))
        }
    }
}

fn required_header(parts: &Parts, name: &str) -> Result<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .ok_or_else(|| AppError::Unauthorized {
            message: format!("Missing or invalid {} header", name),
        })
}

/// Axum extractor for UserIdentity
///
/// Reads the identity headers injected by the provider: `x-user-id`,
/// `x-user-name`, `x-user-email`, `x-user-role`.
impl<S> FromRequestParts<S> for UserIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let id = required_header(parts, "x-user-id")?;
        let id = Uuid::parse_str(&id).map_err(|_| AppError::Unauthorized {
            message: "Invalid x-user-id header".to_string(),
        })?;

        let name = required_header(parts, "x-user-name")?;
        let email = required_header(parts, "x-user-email")?;
        let role = required_header(parts, "x-user-role")?.parse()?;

        Ok(UserIdentity {
            id,
            name,
            email,
            role,
            department: None,
            position: None,
            bio: None,
            institution: None,
            research_interests: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> UserIdentity {
        UserIdentity {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.edu".to_string(),
            role,
            department: None,
            position: None,
            bio: None,
            institution: None,
            research_interests: Vec::new(),
        }
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Lecturer < Role::DepartmentResearchOfficer);
        assert!(Role::DepartmentResearchOfficer < Role::SuperAdmin);
        assert_eq!(Role::Lecturer.rank(), 1);
        assert_eq!(Role::SuperAdmin.rank(), 3);
    }

    #[test]
    fn test_role_parse_roundtrip() {
        for role in [
            Role::Lecturer,
            Role::DepartmentResearchOfficer,
            Role::SuperAdmin,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(
            "Department-Research-Officer".parse::<Role>().unwrap(),
            Role::DepartmentResearchOfficer
        );
        assert!("Dean".parse::<Role>().is_err());
    }

    #[test]
    fn test_has_role() {
        let dro = identity(Role::DepartmentResearchOfficer);
        assert!(dro.has_role(&[Role::DepartmentResearchOfficer, Role::SuperAdmin]));
        assert!(!dro.has_role(&[Role::SuperAdmin]));
        assert!(dro
            .require_role(&[Role::Lecturer, Role::DepartmentResearchOfficer])
            .is_ok());
        assert!(dro.require_role(&[Role::SuperAdmin]).is_err());
    }
}
