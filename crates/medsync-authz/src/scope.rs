//! Tenant-scoped repository facade.
//!
//! Application code never talks to the raw stores. It asks the [`Gateway`]
//! for a [`Scope`] bound to the caller's session claims, and every read or
//! write through that scope is authorized, stamped with the caller's
//! hospital and filtered to what the caller may see.

use std::sync::Arc;

use chrono::Utc;
use medsync_auth::credential::CredentialIssuer;
use medsync_auth::notifier::Notifier;
use medsync_core::error::{MedsyncError, MedsyncResult};
use medsync_core::models::access::{Action, Operation};
use medsync_core::models::profile::{DoctorProfile, PatientProfile};
use medsync_core::models::record::{
    Appointment, ClinicalRecord, LabReport, Prescription, RecordDraft, RecordFilter, RecordPatch,
    RecordQuery,
};
use medsync_core::models::role::Role;
use medsync_core::models::session::SessionClaims;
use medsync_core::repository::{
    DoctorProfileRepository, PaginatedResult, Pagination, PatientProfileRepository,
    RecordRepository, Repositories,
};
use tracing::info;
use uuid::Uuid;

use crate::evaluator::{self, Denial, Target, Verdict};
use crate::policy::{self, Owner};

/// Entry point to the stores for request handlers.
pub struct Gateway<S: Repositories, N: Notifier> {
    repos: Arc<S>,
    credentials: Arc<CredentialIssuer<S, N>>,
}

impl<S: Repositories, N: Notifier> Clone for Gateway<S, N> {
    fn clone(&self) -> Self {
        Self {
            repos: self.repos.clone(),
            credentials: self.credentials.clone(),
        }
    }
}

impl<S: Repositories, N: Notifier> Gateway<S, N> {
    pub fn new(repos: Arc<S>, credentials: CredentialIssuer<S, N>) -> Self {
        Self {
            repos,
            credentials: Arc::new(credentials),
        }
    }

    pub fn credentials(&self) -> &CredentialIssuer<S, N> {
        &self.credentials
    }

    /// A scope acting for the holder of `claims`.
    pub fn scope(&self, claims: &SessionClaims) -> Scope<'_, S, N> {
        Scope {
            gateway: self,
            claims: Some(claims.clone()),
        }
    }

    /// A scope for a request that presented no valid session. Every call
    /// through it fails with `AuthenticationFailed`.
    pub fn anonymous(&self) -> Scope<'_, S, N> {
        Scope {
            gateway: self,
            claims: None,
        }
    }
}

/// A principal's view of the stores.
pub struct Scope<'g, S: Repositories, N: Notifier> {
    pub(crate) gateway: &'g Gateway<S, N>,
    pub(crate) claims: Option<SessionClaims>,
}

/// Map a denial onto the error callers see. Tenant mismatches, and
/// ownership failures on reads, look like the resource does not exist.
pub(crate) fn denial_error(denial: Denial, action: Action, id: Option<Uuid>) -> MedsyncError {
    let id = id.map(|id| id.to_string()).unwrap_or_default();
    match denial {
        Denial::Unauthenticated => MedsyncError::AuthenticationFailed {
            reason: "a valid session is required".into(),
        },
        Denial::RotationRequired => MedsyncError::PasswordRotationRequired,
        Denial::RoleNotPermitted => {
            MedsyncError::forbidden(format!("{action} is not permitted for this role"))
        }
        Denial::TenantMismatch => MedsyncError::not_found(action.kind.as_str(), id),
        Denial::NotOwner => match action.operation {
            Operation::Read | Operation::List => MedsyncError::not_found(action.kind.as_str(), id),
            _ => MedsyncError::forbidden(format!("only the owner may {}", action.operation)),
        },
    }
}

impl<'g, S: Repositories, N: Notifier> Scope<'g, S, N> {
    pub fn claims(&self) -> Option<&SessionClaims> {
        self.claims.as_ref()
    }

    pub(crate) fn repos(&self) -> &'g S {
        &self.gateway.repos
    }

    pub(crate) fn credentials(&self) -> &'g CredentialIssuer<S, N> {
        &self.gateway.credentials
    }

    fn records(&self) -> &'g S::Records {
        self.gateway.repos.records()
    }

    async fn has_records<R>(&self, filter: &RecordFilter) -> MedsyncResult<bool>
    where
        R: ClinicalRecord,
        S::Records: RecordRepository<R>,
    {
        let first = Pagination {
            offset: 0,
            limit: 1,
        };
        let page =
            <S::Records as RecordRepository<R>>::list(self.records(), filter.clone(), first).await?;
        Ok(page.total > 0)
    }

    /// Whether a hospital holds any clinical record about a patient profile.
    /// Unaffiliated patients belong to the hospitals that treat them.
    pub(crate) async fn treated_in(
        &self,
        patient_id: Uuid,
        tenant_id: Uuid,
    ) -> MedsyncResult<bool> {
        let filter = RecordFilter {
            tenant_id: Some(tenant_id),
            patient_id: Some(patient_id),
            doctor_id: None,
        };
        Ok(self.has_records::<Appointment>(&filter).await?
            || self.has_records::<Prescription>(&filter).await?
            || self.has_records::<LabReport>(&filter).await?)
    }

    /// Role check without a target. Returns the caller's claims.
    pub(crate) fn preflight(&self, action: Action) -> MedsyncResult<&SessionClaims> {
        match evaluator::authorize(self.claims.as_ref(), action, None, Utc::now()) {
            Verdict::Allow => self
                .claims
                .as_ref()
                .ok_or_else(|| denial_error(Denial::Unauthenticated, action, None)),
            Verdict::Deny(denial) => Err(denial_error(denial, action, None)),
        }
    }

    /// Full check against a loaded resource.
    pub(crate) fn authorize(&self, action: Action, target: &Target, id: Uuid) -> MedsyncResult<()> {
        match evaluator::authorize(self.claims.as_ref(), action, Some(target), Utc::now()) {
            Verdict::Allow => Ok(()),
            Verdict::Deny(denial) => Err(denial_error(denial, action, Some(id))),
        }
    }

    // -----------------------------------------------------------------------
    // Profile resolution
    // -----------------------------------------------------------------------

    /// Principal owning a patient profile, if the profile still exists.
    async fn patient_principal(&self, profile_id: Uuid) -> MedsyncResult<Option<Uuid>> {
        match self.repos().patients().get_by_id(profile_id).await {
            Ok(profile) => Ok(Some(profile.principal_id)),
            Err(MedsyncError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn doctor_principal(&self, profile_id: Uuid) -> MedsyncResult<Option<Uuid>> {
        match self.repos().doctors().get_by_id(profile_id).await {
            Ok(profile) => Ok(Some(profile.principal_id)),
            Err(MedsyncError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn own_patient_profile(
        &self,
        claims: &SessionClaims,
    ) -> MedsyncResult<Option<PatientProfile>> {
        match self.repos().patients().get_by_principal(claims.sub).await {
            Ok(profile) => Ok(Some(profile)),
            Err(MedsyncError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn own_doctor_profile(
        &self,
        claims: &SessionClaims,
    ) -> MedsyncResult<Option<DoctorProfile>> {
        match self.repos().doctors().get_by_principal(claims.sub).await {
            Ok(profile) => Ok(Some(profile)),
            Err(MedsyncError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Owner references of a record, resolved only as far as the caller's
    /// role needs them.
    async fn record_target<R: ClinicalRecord>(
        &self,
        claims: &SessionClaims,
        record: &R,
    ) -> MedsyncResult<Target> {
        let mut target = Target {
            tenant: Some(record.tenant_id()),
            ..Default::default()
        };
        match claims.role {
            Role::Patient => target.patient = self.patient_principal(record.patient_id()).await?,
            Role::Doctor => {
                if let Some(doctor_id) = record.doctor_id() {
                    target.doctor = self.doctor_principal(doctor_id).await?;
                }
            }
            Role::Admin | Role::SuperAdmin => {}
        }
        Ok(target)
    }

    // -----------------------------------------------------------------------
    // Clinical records
    // -----------------------------------------------------------------------

    /// Create a record in the caller's hospital.
    ///
    /// Patients always book for themselves. A patient without a hospital
    /// claim books into the hospital of the referenced doctor.
    pub async fn create<R>(&self, mut draft: R::Draft) -> MedsyncResult<R>
    where
        R: ClinicalRecord,
        S::Records: RecordRepository<R>,
    {
        let claims = self.preflight(Action::new(R::KIND, Operation::Create))?;
        draft.validate()?;

        if claims.role == Role::Patient {
            let me = self
                .own_patient_profile(claims)
                .await?
                .ok_or_else(|| MedsyncError::validation("caller has no patient profile"))?;
            draft.set_patient_id(me.id);
        } else {
            match self.repos().patients().get_by_id(draft.patient_id()).await {
                Ok(_) => {}
                Err(MedsyncError::NotFound { .. }) => {
                    return Err(MedsyncError::validation("referenced patient does not exist"));
                }
                Err(e) => return Err(e),
            }
        }

        let doctor = match draft.doctor_id() {
            Some(doctor_id) => match self.repos().doctors().get_by_id(doctor_id).await {
                Ok(profile) => Some(profile),
                Err(MedsyncError::NotFound { .. }) => {
                    return Err(MedsyncError::validation("referenced doctor does not exist"));
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        if claims.role == Role::Doctor {
            let me = self
                .own_doctor_profile(claims)
                .await?
                .ok_or_else(|| MedsyncError::validation("caller has no doctor profile"))?;
            if doctor.as_ref().is_some_and(|d| d.id != me.id) {
                return Err(MedsyncError::forbidden(
                    "doctors create records under their own profile",
                ));
            }
        }

        let tenant_id = match (claims.tenant, &doctor) {
            (Some(own), Some(d)) if d.tenant_id != own => {
                return Err(MedsyncError::CrossTenantReference {
                    entity: "doctor".into(),
                });
            }
            (Some(own), _) => own,
            (None, Some(d)) => d.tenant_id,
            (None, None) => {
                return Err(MedsyncError::validation(
                    "a hospital is required to create this record",
                ));
            }
        };

        let record =
            <S::Records as RecordRepository<R>>::create(self.records(), tenant_id, draft).await?;
        info!(
            kind = %R::KIND,
            record_id = %record.id(),
            tenant_id = %tenant_id,
            principal_id = %claims.sub,
            "Record created"
        );
        Ok(record)
    }

    pub async fn get<R>(&self, id: Uuid) -> MedsyncResult<R>
    where
        R: ClinicalRecord,
        S::Records: RecordRepository<R>,
    {
        let action = Action::new(R::KIND, Operation::Read);
        let claims = self.preflight(action)?;
        let record = <S::Records as RecordRepository<R>>::get_by_id(self.records(), id).await?;
        let target = self.record_target(claims, &record).await?;
        self.authorize(action, &target, id)?;
        Ok(record)
    }

    /// List records visible to the caller. The hospital filter always comes
    /// from the claims; roles limited to their own records only see those.
    pub async fn list<R>(
        &self,
        query: RecordQuery,
        pagination: Pagination,
    ) -> MedsyncResult<PaginatedResult<R>>
    where
        R: ClinicalRecord,
        S::Records: RecordRepository<R>,
    {
        let claims = self.preflight(Action::new(R::KIND, Operation::List))?;
        let mut filter = RecordFilter {
            tenant_id: claims.tenant,
            patient_id: query.patient_id,
            doctor_id: query.doctor_id,
        };

        let owner = policy::grant_for(R::KIND, Operation::List, claims.role).and_then(|g| g.owner);
        if let Some(owner) = owner {
            let (own, slot) = match owner {
                Owner::Patient => (
                    self.own_patient_profile(claims).await?.map(|p| p.id),
                    &mut filter.patient_id,
                ),
                Owner::Doctor => (
                    self.own_doctor_profile(claims).await?.map(|d| d.id),
                    &mut filter.doctor_id,
                ),
                Owner::Subject => (None, &mut filter.patient_id),
            };
            match own {
                Some(own) if slot.is_none_or(|requested| requested == own) => *slot = Some(own),
                _ => return Ok(empty_page(pagination)),
            }
        }

        <S::Records as RecordRepository<R>>::list(self.records(), filter, pagination).await
    }

    pub async fn update<R>(&self, id: Uuid, patch: R::Patch) -> MedsyncResult<R>
    where
        R: ClinicalRecord,
        S::Records: RecordRepository<R>,
    {
        let action = Action::new(R::KIND, Operation::Update);
        let claims = self.preflight(action)?;
        let current = <S::Records as RecordRepository<R>>::get_by_id(self.records(), id).await?;
        let target = self.record_target(claims, &current).await?;
        self.authorize(action, &target, id)?;
        policy::check_patch(R::KIND, claims.role, &patch.fields())?;
        patch.validate()?;

        let updated = <S::Records as RecordRepository<R>>::update(self.records(), id, patch).await?;
        info!(kind = %R::KIND, record_id = %id, principal_id = %claims.sub, "Record updated");
        Ok(updated)
    }

    pub async fn delete<R>(&self, id: Uuid) -> MedsyncResult<()>
    where
        R: ClinicalRecord,
        S::Records: RecordRepository<R>,
    {
        let action = Action::new(R::KIND, Operation::Delete);
        let claims = self.preflight(action)?;
        let current = <S::Records as RecordRepository<R>>::get_by_id(self.records(), id).await?;
        let target = self.record_target(claims, &current).await?;
        self.authorize(action, &target, id)?;

        <S::Records as RecordRepository<R>>::delete(self.records(), id).await?;
        info!(kind = %R::KIND, record_id = %id, principal_id = %claims.sub, "Record deleted");
        Ok(())
    }
}

pub(crate) fn empty_page<T>(pagination: Pagination) -> PaginatedResult<T> {
    PaginatedResult {
        items: Vec::new(),
        total: 0,
        offset: pagination.offset,
        limit: pagination.limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medsync_core::models::access::ResourceKind;

    #[test]
    fn hidden_resources_look_missing() {
        let read = Action::new(ResourceKind::Appointment, Operation::Read);
        let update = Action::new(ResourceKind::Appointment, Operation::Update);
        let id = Some(Uuid::new_v4());

        assert!(matches!(
            denial_error(Denial::TenantMismatch, update, id),
            MedsyncError::NotFound { .. }
        ));
        assert!(matches!(
            denial_error(Denial::NotOwner, read, id),
            MedsyncError::NotFound { .. }
        ));
        assert!(matches!(
            denial_error(Denial::NotOwner, update, id),
            MedsyncError::Forbidden { .. }
        ));
        assert!(matches!(
            denial_error(Denial::RotationRequired, read, None),
            MedsyncError::PasswordRotationRequired
        ));
        assert!(matches!(
            denial_error(Denial::Unauthenticated, read, None),
            MedsyncError::AuthenticationFailed { .. }
        ));
    }
}
