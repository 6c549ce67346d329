//! Doctor and patient profiles through a [`Scope`].

use medsync_auth::notifier::Notifier;
use medsync_core::error::{MedsyncError, MedsyncResult};
use medsync_core::models::access::{Action, Operation, ResourceKind};
use medsync_core::models::principal::{Principal, UpdatePrincipal};
use medsync_core::models::profile::{
    DoctorProfile, PatientProfile, UpdateDoctorProfile, UpdatePatientProfile,
};
use medsync_core::repository::{
    DoctorProfileRepository, PaginatedResult, Pagination, PatientProfileRepository,
    PrincipalRepository, Repositories,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::evaluator::Target;
use crate::policy;
use crate::scope::Scope;

/// A role profile together with the account that owns it.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView<P> {
    pub principal: Principal,
    pub profile: P,
}

fn doctor_target(profile: &DoctorProfile) -> Target {
    Target {
        tenant: Some(profile.tenant_id),
        doctor: Some(profile.principal_id),
        subject: Some(profile.principal_id),
        ..Default::default()
    }
}

fn patient_target(profile: &PatientProfile) -> Target {
    Target {
        tenant: profile.tenant_id,
        patient: Some(profile.principal_id),
        subject: Some(profile.principal_id),
        ..Default::default()
    }
}

fn doctor_fields(input: &UpdateDoctorProfile) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if input.specialty.is_some() {
        fields.push("specialty");
    }
    if input.department.is_some() {
        fields.push("department");
    }
    if input.contact.is_some() {
        fields.push("contact");
    }
    fields
}

impl<S: Repositories, N: Notifier> Scope<'_, S, N> {
    async fn load_doctor(&self, action: Action, id: Uuid) -> MedsyncResult<DoctorProfile> {
        self.preflight(action)?;
        let profile = self.repos().doctors().get_by_id(id).await?;
        self.authorize(action, &doctor_target(&profile), id)?;
        Ok(profile)
    }

    /// Load a patient profile for `action`.
    ///
    /// A profile without a hospital is visible to hospital-bound callers
    /// only when their hospital holds a record about the patient.
    async fn load_patient(&self, action: Action, id: Uuid) -> MedsyncResult<PatientProfile> {
        let claims = self.preflight(action)?;
        let profile = self.repos().patients().get_by_id(id).await?;

        let mut target = patient_target(&profile);
        if let (None, Some(own)) = (target.tenant, claims.tenant) {
            if !self.treated_in(profile.id, own).await? {
                return Err(MedsyncError::not_found(ResourceKind::Patient.as_str(), id));
            }
            target.tenant = Some(own);
        }

        self.authorize(action, &target, id)?;
        Ok(profile)
    }

    // -----------------------------------------------------------------------
    // Doctors
    // -----------------------------------------------------------------------

    pub async fn get_doctor(&self, id: Uuid) -> MedsyncResult<ProfileView<DoctorProfile>> {
        let profile = self
            .load_doctor(Action::new(ResourceKind::Doctor, Operation::Read), id)
            .await?;
        let principal = self.repos().principals().get_by_id(profile.principal_id).await?;
        Ok(ProfileView { principal, profile })
    }

    /// Doctors of one hospital.
    ///
    /// Hospital-bound callers always see their own hospital. Patients
    /// without an affiliation name the hospital they are browsing.
    pub async fn list_doctors(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> MedsyncResult<PaginatedResult<DoctorProfile>> {
        let claims = self.preflight(Action::new(ResourceKind::Doctor, Operation::List))?;
        let tenant_id = match (claims.tenant, tenant_id) {
            (Some(own), Some(requested)) if requested != own => {
                return Err(MedsyncError::forbidden(
                    "doctors of another hospital are not visible",
                ));
            }
            (Some(own), _) => own,
            (None, Some(requested)) => requested,
            (None, None) => {
                return Err(MedsyncError::validation("a hospital must be named"));
            }
        };
        self.repos()
            .doctors()
            .list(Some(tenant_id), pagination)
            .await
    }

    /// Update a doctor profile. Contact details are written to the
    /// owning account.
    pub async fn update_doctor(
        &self,
        id: Uuid,
        input: UpdateDoctorProfile,
    ) -> MedsyncResult<ProfileView<DoctorProfile>> {
        let action = Action::new(ResourceKind::Doctor, Operation::Update);
        let claims = self.preflight(action)?;
        policy::check_patch(ResourceKind::Doctor, claims.role, &doctor_fields(&input))?;
        let mut profile = self.load_doctor(action, id).await?;

        // Profile first: a rejected profile patch leaves the account untouched.
        let contact = input.contact.clone();
        if input.specialty.is_some() || input.department.is_some() {
            profile = self.repos().doctors().update(id, input).await?;
        }
        let principal = match contact {
            Some(contact) => {
                let update = UpdatePrincipal {
                    contact: Some(contact),
                    ..Default::default()
                };
                self.repos()
                    .principals()
                    .update(profile.principal_id, update)
                    .await?
            }
            None => self.repos().principals().get_by_id(profile.principal_id).await?,
        };

        info!(doctor_id = %id, principal_id = %claims.sub, "Doctor profile updated");
        Ok(ProfileView { principal, profile })
    }

    /// Remove a doctor's account and profile. Their records stay behind.
    pub async fn delete_doctor(&self, id: Uuid) -> MedsyncResult<()> {
        let action = Action::new(ResourceKind::Doctor, Operation::Delete);
        let claims = self.preflight(action)?;
        let profile = self.load_doctor(action, id).await?;

        self.repos().principals().delete(profile.principal_id).await?;
        info!(doctor_id = %id, principal_id = %claims.sub, "Doctor deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Patients
    // -----------------------------------------------------------------------

    pub async fn get_patient(&self, id: Uuid) -> MedsyncResult<ProfileView<PatientProfile>> {
        let profile = self
            .load_patient(Action::new(ResourceKind::Patient, Operation::Read), id)
            .await?;
        let principal = self.repos().principals().get_by_id(profile.principal_id).await?;
        Ok(ProfileView { principal, profile })
    }

    pub async fn update_patient(
        &self,
        id: Uuid,
        input: UpdatePatientProfile,
    ) -> MedsyncResult<PatientProfile> {
        let action = Action::new(ResourceKind::Patient, Operation::Update);
        let claims = self.preflight(action)?;
        let fields: &[&str] = if input.health_summary.is_some() {
            &["health_summary"]
        } else {
            &[]
        };
        policy::check_patch(ResourceKind::Patient, claims.role, fields)?;
        self.load_patient(action, id).await?;

        let profile = self.repos().patients().update(id, input).await?;
        info!(patient_id = %id, principal_id = %claims.sub, "Patient profile updated");
        Ok(profile)
    }

    pub async fn delete_patient(&self, id: Uuid) -> MedsyncResult<()> {
        let action = Action::new(ResourceKind::Patient, Operation::Delete);
        let claims = self.preflight(action)?;
        let profile = self.load_patient(action, id).await?;

        self.repos().principals().delete(profile.principal_id).await?;
        info!(patient_id = %id, principal_id = %claims.sub, "Patient deleted");
        Ok(())
    }
}
