//! Authorization decisions.
//!
//! Evaluation is pure: it reads the claims, the policy table and the
//! target's references, and never touches storage or fails.

use std::fmt;

use chrono::{DateTime, Utc};
use medsync_core::models::access::{Action, ResourceKind};
use medsync_core::models::role::Role;
use medsync_core::models::session::SessionClaims;
use tracing::debug;
use uuid::Uuid;

use crate::policy::{self, Owner, SUPER_ADMIN_KINDS, TenantScoping};

/// References on the resource being acted on. Owner references are
/// principal ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub tenant: Option<Uuid>,
    pub patient: Option<Uuid>,
    pub doctor: Option<Uuid>,
    pub subject: Option<Uuid>,
}

impl Target {
    fn owner(&self, owner: Owner) -> Option<Uuid> {
        match owner {
            Owner::Patient => self.patient,
            Owner::Doctor => self.doctor,
            Owner::Subject => self.subject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    RotationRequired,
    RoleNotPermitted,
    TenantMismatch,
    NotOwner,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Denial::Unauthenticated => "unauthenticated",
            Denial::RotationRequired => "password rotation required",
            Denial::RoleNotPermitted => "role not permitted",
            Denial::TenantMismatch => "tenant mismatch",
            Denial::NotOwner => "not owner",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(Denial),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Decide whether `claims` may perform `action` on `target`.
///
/// Without a target only the role checks run; callers use that as a
/// preflight before loading anything.
pub fn authorize(
    claims: Option<&SessionClaims>,
    action: Action,
    target: Option<&Target>,
    now: DateTime<Utc>,
) -> Verdict {
    let verdict = evaluate(claims, action, target, now);
    if let Verdict::Deny(denial) = verdict {
        debug!(
            action = %action,
            principal_id = ?claims.map(|c| c.sub),
            denial = %denial,
            "Access denied"
        );
    }
    verdict
}

fn evaluate(
    claims: Option<&SessionClaims>,
    action: Action,
    target: Option<&Target>,
    now: DateTime<Utc>,
) -> Verdict {
    let Some(claims) = claims.filter(|c| !c.is_expired_at(now)) else {
        return Verdict::Deny(Denial::Unauthenticated);
    };

    if claims.must_rotate && action.kind != ResourceKind::Credential {
        return Verdict::Deny(Denial::RotationRequired);
    }

    if claims.role == Role::SuperAdmin && !SUPER_ADMIN_KINDS.contains(&action.kind) {
        return Verdict::Deny(Denial::RoleNotPermitted);
    }

    let Some(grant) = policy::grant_for(action.kind, action.operation, claims.role) else {
        return Verdict::Deny(Denial::RoleNotPermitted);
    };

    let Some(target) = target else {
        return Verdict::Allow;
    };

    if let Some(own_tenant) = claims.tenant {
        let mismatch = match policy::scoping(action.kind) {
            TenantScoping::Global => false,
            TenantScoping::Required => target.tenant != Some(own_tenant),
            TenantScoping::Affiliated => target.tenant.is_some_and(|t| t != own_tenant),
        };
        if mismatch {
            return Verdict::Deny(Denial::TenantMismatch);
        }
    }

    if let Some(owner) = grant.owner {
        if target.owner(owner) != Some(claims.sub) {
            return Verdict::Deny(Denial::NotOwner);
        }
    }

    Verdict::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use medsync_core::models::access::Operation;

    fn claims(role: Role, tenant: Option<Uuid>) -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            sub: Uuid::new_v4(),
            role,
            tenant,
            must_rotate: false,
            iat: now.timestamp(),
            exp: (now + Duration::days(7)).timestamp(),
        }
    }

    fn act(kind: ResourceKind, operation: Operation) -> Action {
        Action::new(kind, operation)
    }

    #[test]
    fn missing_or_expired_claims_are_unauthenticated() {
        let action = act(ResourceKind::Appointment, Operation::List);
        assert_eq!(
            authorize(None, action, None, Utc::now()),
            Verdict::Deny(Denial::Unauthenticated)
        );

        let c = claims(Role::Admin, Some(Uuid::new_v4()));
        let later = Utc::now() + Duration::days(8);
        assert_eq!(
            authorize(Some(&c), action, None, later),
            Verdict::Deny(Denial::Unauthenticated)
        );
    }

    #[test]
    fn rotation_flag_blocks_everything_but_credentials() {
        let mut c = claims(Role::Doctor, Some(Uuid::new_v4()));
        c.must_rotate = true;
        let now = Utc::now();

        assert_eq!(
            authorize(Some(&c), act(ResourceKind::Doctor, Operation::List), None, now),
            Verdict::Deny(Denial::RotationRequired)
        );
        let own = Target {
            subject: Some(c.sub),
            ..Default::default()
        };
        assert!(
            authorize(
                Some(&c),
                act(ResourceKind::Credential, Operation::Update),
                Some(&own),
                now
            )
            .is_allowed()
        );
    }

    #[test]
    fn super_admin_never_reaches_clinical_records() {
        let c = claims(Role::SuperAdmin, None);
        let now = Utc::now();
        for kind in [
            ResourceKind::Doctor,
            ResourceKind::Patient,
            ResourceKind::Appointment,
            ResourceKind::Prescription,
            ResourceKind::LabReport,
        ] {
            for op in [Operation::Create, Operation::Read, Operation::List] {
                assert_eq!(
                    authorize(Some(&c), act(kind, op), None, now),
                    Verdict::Deny(Denial::RoleNotPermitted),
                    "{kind}:{op}"
                );
            }
        }
        assert!(authorize(Some(&c), act(ResourceKind::Tenant, Operation::Create), None, now).is_allowed());
    }

    #[test]
    fn role_whitelist_is_enforced() {
        let now = Utc::now();
        let admin = claims(Role::Admin, Some(Uuid::new_v4()));
        assert_eq!(
            authorize(Some(&admin), act(ResourceKind::Prescription, Operation::Read), None, now),
            Verdict::Deny(Denial::RoleNotPermitted)
        );
        assert_eq!(
            authorize(Some(&admin), act(ResourceKind::Tenant, Operation::List), None, now),
            Verdict::Deny(Denial::RoleNotPermitted)
        );
        let patient = claims(Role::Patient, None);
        assert_eq!(
            authorize(Some(&patient), act(ResourceKind::Patient, Operation::List), None, now),
            Verdict::Deny(Denial::RoleNotPermitted)
        );
    }

    #[test]
    fn tenant_mismatch_is_absolute() {
        let now = Utc::now();
        let tenant = Uuid::new_v4();
        let admin = claims(Role::Admin, Some(tenant));
        let foreign = Target {
            tenant: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert_eq!(
            authorize(Some(&admin), act(ResourceKind::Appointment, Operation::Read), Some(&foreign), now),
            Verdict::Deny(Denial::TenantMismatch)
        );

        // Required scoping treats a missing target tenant as foreign.
        assert_eq!(
            authorize(
                Some(&admin),
                act(ResourceKind::LabReport, Operation::Read),
                Some(&Target::default()),
                now
            ),
            Verdict::Deny(Denial::TenantMismatch)
        );

        let home = Target {
            tenant: Some(tenant),
            ..Default::default()
        };
        assert!(
            authorize(Some(&admin), act(ResourceKind::Appointment, Operation::Read), Some(&home), now)
                .is_allowed()
        );
    }

    #[test]
    fn affiliated_patients_are_checked_only_when_affiliated() {
        let now = Utc::now();
        let doctor = claims(Role::Doctor, Some(Uuid::new_v4()));
        let action = act(ResourceKind::Patient, Operation::Read);

        assert!(authorize(Some(&doctor), action, Some(&Target::default()), now).is_allowed());
        let elsewhere = Target {
            tenant: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert_eq!(
            authorize(Some(&doctor), action, Some(&elsewhere), now),
            Verdict::Deny(Denial::TenantMismatch)
        );
    }

    #[test]
    fn self_only_roles_need_ownership() {
        let now = Utc::now();
        let tenant = Uuid::new_v4();
        let patient = claims(Role::Patient, None);
        let action = act(ResourceKind::Prescription, Operation::Read);

        let theirs = Target {
            tenant: Some(tenant),
            patient: Some(Uuid::new_v4()),
            doctor: Some(Uuid::new_v4()),
            subject: None,
        };
        assert_eq!(
            authorize(Some(&patient), action, Some(&theirs), now),
            Verdict::Deny(Denial::NotOwner)
        );

        let mine = Target {
            patient: Some(patient.sub),
            ..theirs.clone()
        };
        assert!(authorize(Some(&patient), action, Some(&mine), now).is_allowed());

        let doctor = claims(Role::Doctor, Some(tenant));
        assert_eq!(
            authorize(Some(&doctor), action, Some(&mine), now),
            Verdict::Deny(Denial::NotOwner)
        );
        let prescribed = Target {
            doctor: Some(doctor.sub),
            ..mine
        };
        assert!(authorize(Some(&doctor), action, Some(&prescribed), now).is_allowed());
    }

    #[test]
    fn preflight_skips_target_checks() {
        let doctor = claims(Role::Doctor, Some(Uuid::new_v4()));
        assert!(
            authorize(
                Some(&doctor),
                act(ResourceKind::Prescription, Operation::Update),
                None,
                Utc::now()
            )
            .is_allowed()
        );
    }
}
