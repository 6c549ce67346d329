//! Vocabulary shared by the authorization policy and the record facade.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kinds of resource the authorization policy knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Tenant,
    AdminAccount,
    Doctor,
    Patient,
    Appointment,
    Prescription,
    LabReport,
    /// A principal's own password.
    Credential,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Tenant => "tenant",
            ResourceKind::AdminAccount => "admin_account",
            ResourceKind::Doctor => "doctor",
            ResourceKind::Patient => "patient",
            ResourceKind::Appointment => "appointment",
            ResourceKind::Prescription => "prescription",
            ResourceKind::LabReport => "lab_report",
            ResourceKind::Credential => "credential",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
        })
    }
}

/// An operation on a kind of resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub kind: ResourceKind,
    pub operation: Operation,
}

impl Action {
    pub const fn new(kind: ResourceKind, operation: Operation) -> Self {
        Self { kind, operation }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.operation)
    }
}
