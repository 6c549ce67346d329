//! Declarative access policy.
//!
//! [`POLICY`] is the single place that says which role may perform which
//! operation on which kind of resource, and whether the role is limited to
//! resources it owns. [`PATCH_RULES`] says which fields a role may change.

use medsync_core::error::{MedsyncError, MedsyncResult};
use medsync_core::models::access::{Operation, ResourceKind};
use medsync_core::models::role::Role;

/// How a kind of resource relates to hospitals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScoping {
    /// Not bound to a hospital.
    Global,
    /// Always carries a hospital; callers with a hospital only see their own.
    Required,
    /// Carries a hospital only sometimes; checked when present. Callers
    /// resolve an absent hospital from the records before asking.
    Affiliated,
}

pub fn scoping(kind: ResourceKind) -> TenantScoping {
    match kind {
        ResourceKind::Tenant | ResourceKind::Credential => TenantScoping::Global,
        ResourceKind::Patient => TenantScoping::Affiliated,
        ResourceKind::AdminAccount
        | ResourceKind::Doctor
        | ResourceKind::Appointment
        | ResourceKind::Prescription
        | ResourceKind::LabReport => TenantScoping::Required,
    }
}

/// Which reference on a target identifies its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// The patient the resource is about.
    Patient,
    /// The doctor responsible for the resource.
    Doctor,
    /// The principal the resource is.
    Subject,
}

/// Permission for one role. `owner` limits it to resources whose owning
/// reference is the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub role: Role,
    pub owner: Option<Owner>,
}

const fn any(role: Role) -> Grant {
    Grant { role, owner: None }
}

const fn own(role: Role, owner: Owner) -> Grant {
    Grant {
        role,
        owner: Some(owner),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub kind: ResourceKind,
    pub operation: Operation,
    pub grants: &'static [Grant],
}

const fn rule(kind: ResourceKind, operation: Operation, grants: &'static [Grant]) -> Rule {
    Rule {
        kind,
        operation,
        grants,
    }
}

use Operation::{Create, Delete, List, Read, Update};
use ResourceKind as K;
use Role::{Admin, Doctor, Patient, SuperAdmin};

const SUPER_ADMIN_ONLY: &[Grant] = &[any(SuperAdmin)];

/// Role whitelist. A (kind, operation) pair without a rule is denied.
pub static POLICY: &[Rule] = &[
    rule(K::Tenant, Create, SUPER_ADMIN_ONLY),
    rule(K::Tenant, Read, SUPER_ADMIN_ONLY),
    rule(K::Tenant, Update, SUPER_ADMIN_ONLY),
    rule(K::Tenant, Delete, SUPER_ADMIN_ONLY),
    rule(K::Tenant, List, SUPER_ADMIN_ONLY),
    //
    rule(K::AdminAccount, Create, SUPER_ADMIN_ONLY),
    rule(K::AdminAccount, Read, SUPER_ADMIN_ONLY),
    rule(K::AdminAccount, Update, SUPER_ADMIN_ONLY),
    rule(K::AdminAccount, Delete, SUPER_ADMIN_ONLY),
    rule(K::AdminAccount, List, SUPER_ADMIN_ONLY),
    //
    rule(K::Doctor, Create, &[any(Admin)]),
    rule(K::Doctor, Read, &[any(Admin), own(Doctor, Owner::Doctor)]),
    rule(K::Doctor, Update, &[any(Admin), own(Doctor, Owner::Doctor)]),
    rule(K::Doctor, Delete, &[any(Admin)]),
    rule(K::Doctor, List, &[any(Admin), any(Doctor), any(Patient)]),
    //
    rule(K::Patient, Create, &[any(Admin)]),
    rule(
        K::Patient,
        Read,
        &[any(Admin), any(Doctor), own(Patient, Owner::Patient)],
    ),
    rule(K::Patient, Update, &[any(Admin), any(Doctor)]),
    rule(K::Patient, Delete, &[any(Admin)]),
    //
    rule(K::Appointment, Create, &[any(Admin), any(Patient)]),
    rule(
        K::Appointment,
        Read,
        &[any(Admin), own(Doctor, Owner::Doctor), own(Patient, Owner::Patient)],
    ),
    rule(K::Appointment, Update, &[any(Admin)]),
    rule(K::Appointment, Delete, &[any(Admin)]),
    rule(
        K::Appointment,
        List,
        &[any(Admin), own(Doctor, Owner::Doctor), own(Patient, Owner::Patient)],
    ),
    //
    rule(K::Prescription, Create, &[any(Doctor)]),
    rule(
        K::Prescription,
        Read,
        &[own(Doctor, Owner::Doctor), own(Patient, Owner::Patient)],
    ),
    rule(K::Prescription, Update, &[own(Doctor, Owner::Doctor)]),
    rule(K::Prescription, Delete, &[own(Doctor, Owner::Doctor)]),
    rule(
        K::Prescription,
        List,
        &[own(Doctor, Owner::Doctor), own(Patient, Owner::Patient)],
    ),
    //
    rule(K::LabReport, Create, &[any(Doctor), any(Admin)]),
    rule(
        K::LabReport,
        Read,
        &[any(Doctor), any(Admin), own(Patient, Owner::Patient)],
    ),
    rule(K::LabReport, Update, &[any(Doctor), any(Admin)]),
    rule(K::LabReport, Delete, &[any(Doctor), any(Admin)]),
    rule(
        K::LabReport,
        List,
        &[any(Doctor), any(Admin), own(Patient, Owner::Patient)],
    ),
    //
    rule(
        K::Credential,
        Update,
        &[
            own(SuperAdmin, Owner::Subject),
            own(Admin, Owner::Subject),
            own(Doctor, Owner::Subject),
            own(Patient, Owner::Subject),
        ],
    ),
];

/// Kinds a super-admin may act on at all.
pub const SUPER_ADMIN_KINDS: &[ResourceKind] =
    &[K::Tenant, K::AdminAccount, K::Credential];

pub fn find_rule(kind: ResourceKind, operation: Operation) -> Option<&'static Rule> {
    POLICY
        .iter()
        .find(|r| r.kind == kind && r.operation == operation)
}

/// The grant `role` holds for the action, if any.
pub fn grant_for(kind: ResourceKind, operation: Operation, role: Role) -> Option<Grant> {
    find_rule(kind, operation)?
        .grants
        .iter()
        .find(|g| g.role == role)
        .copied()
}

/// Fields each role may set when updating a kind of resource.
pub static PATCH_RULES: &[(ResourceKind, Role, &[&str])] = &[
    (K::Tenant, SuperAdmin, &["name", "address", "contact"]),
    (K::AdminAccount, SuperAdmin, &["name", "email", "contact"]),
    (K::Doctor, Admin, &["specialty", "department", "contact"]),
    (K::Doctor, Doctor, &["specialty", "department", "contact"]),
    (K::Patient, Admin, &["health_summary"]),
    (K::Patient, Doctor, &["health_summary"]),
    (K::Appointment, Admin, &["date", "time", "status", "visit_type"]),
    (K::Prescription, Doctor, &["medication", "quantity", "status", "date"]),
    (K::LabReport, Doctor, &["test", "date", "status", "result"]),
    (K::LabReport, Admin, &["test", "date", "status", "result"]),
];

/// Reject empty patches and patches touching fields outside the role's set.
pub fn check_patch(kind: ResourceKind, role: Role, fields: &[&str]) -> MedsyncResult<()> {
    if fields.is_empty() {
        return Err(MedsyncError::validation("update contains no fields"));
    }
    let allowed = PATCH_RULES
        .iter()
        .find(|(k, r, _)| *k == kind && *r == role)
        .map(|(_, _, fields)| *fields)
        .unwrap_or(&[]);
    if let Some(field) = fields.iter().find(|f| !allowed.contains(f)) {
        return Err(MedsyncError::forbidden(format!(
            "{role} may not change {kind} field {field}"
        )));
    }
    Ok(())
}
