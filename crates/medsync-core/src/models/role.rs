//! Account roles.
//!
//! The set of roles is closed. Role strings that were issued by earlier
//! releases are recognised through [`RETIRED_ROLES`] so that stale data
//! surfaces as a typed error instead of silently falling through.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A current account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Platform operator. Manages hospitals and their admin accounts only.
    SuperAdmin,
    /// Hospital administrator, bound to exactly one hospital.
    Admin,
    /// Clinician, bound to exactly one hospital.
    Doctor,
    /// Patient. Hospital affiliation is optional and established per record.
    Patient,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::Admin, Role::Doctor, Role::Patient];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }

    /// Whether principals with this role must carry a hospital reference.
    pub fn requires_tenant(&self) -> bool {
        matches!(self, Role::Admin | Role::Doctor)
    }

    /// Whether principals with this role own a 1:1 role profile.
    pub fn has_profile(&self) -> bool {
        matches!(self, Role::Doctor | Role::Patient)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles that are no longer issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetiredRole {
    Receptionist,
    Pharmacist,
}

/// Migration table for retired role strings.
///
/// A `None` successor means accounts holding the role are not mapped onto a
/// current role and cannot be loaded until an administrator reassigns them.
pub static RETIRED_ROLES: &[(&str, RetiredRole, Option<Role>)] = &[
    ("receptionist", RetiredRole::Receptionist, None),
    ("pharmacist", RetiredRole::Pharmacist, None),
];

impl RetiredRole {
    pub fn as_str(&self) -> &'static str {
        RETIRED_ROLES
            .iter()
            .find(|(_, retired, _)| retired == self)
            .map(|(name, _, _)| *name)
            .unwrap_or("retired")
    }

    /// The current role that replaces this one, if any.
    pub fn successor(&self) -> Option<Role> {
        RETIRED_ROLES
            .iter()
            .find(|(_, retired, _)| retired == self)
            .and_then(|(_, _, successor)| *successor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleParseError {
    #[error("role {} has been retired", .0.as_str())]
    Retired(RetiredRole),

    #[error("unknown role: {0}")]
    Unknown(String),
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(role) = Role::ALL.iter().find(|r| r.as_str() == s) {
            return Ok(*role);
        }
        match RETIRED_ROLES.iter().find(|(name, _, _)| *name == s) {
            Some((_, _, Some(successor))) => Ok(*successor),
            Some((_, retired, None)) => Err(RoleParseError::Retired(*retired)),
            None => Err(RoleParseError::Unknown(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_roles_round_trip_through_strings() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn retired_roles_are_typed() {
        assert_eq!(
            "receptionist".parse::<Role>(),
            Err(RoleParseError::Retired(RetiredRole::Receptionist))
        );
        assert_eq!(
            "pharmacist".parse::<Role>(),
            Err(RoleParseError::Retired(RetiredRole::Pharmacist))
        );
        assert_eq!(RetiredRole::Pharmacist.successor(), None);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(
            "nurse".parse::<Role>(),
            Err(RoleParseError::Unknown("nurse".into()))
        );
        // Matching is exact; no case folding.
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"super-admin\"");
        assert!(serde_json::from_str::<Role>("\"receptionist\"").is_err());
    }

    #[test]
    fn tenant_requirements() {
        assert!(Role::Admin.requires_tenant());
        assert!(Role::Doctor.requires_tenant());
        assert!(!Role::Patient.requires_tenant());
        assert!(!Role::SuperAdmin.requires_tenant());
    }
}
