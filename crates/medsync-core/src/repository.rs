//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. These are raw stores: they do not
//! authorize anything. Application code reaches them through the
//! tenant-scoped facade, which injects hospital filters and checks the
//! caller's entitlement before every read or write.

use uuid::Uuid;

use crate::error::MedsyncResult;
use crate::models::{
    principal::{CreatePrincipal, Principal, PrincipalFilter, UpdatePrincipal},
    profile::{
        CreateDoctorProfile, CreatePatientProfile, DoctorProfile, PatientProfile,
        UpdateDoctorProfile, UpdatePatientProfile,
    },
    record::{Appointment, ClinicalRecord, LabReport, Prescription, RecordFilter},
    role::Role,
    tenant::{CreateTenant, Tenant, UpdateTenant},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Identity store
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = MedsyncResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MedsyncResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = MedsyncResult<Tenant>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = MedsyncResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = MedsyncResult<PaginatedResult<Tenant>>> + Send;
}

pub trait PrincipalRepository: Send + Sync {
    /// Hash the password and persist the account.
    ///
    /// Fails with `DuplicateEmail` when the normalized email is taken; the
    /// store enforces this with a unique index, so concurrent creations for
    /// the same address cannot both succeed.
    fn create(
        &self,
        input: CreatePrincipal,
    ) -> impl Future<Output = MedsyncResult<Principal>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MedsyncResult<Principal>> + Send;
    /// Case-insensitive lookup.
    fn get_by_email(&self, email: &str)
    -> impl Future<Output = MedsyncResult<Principal>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePrincipal,
    ) -> impl Future<Output = MedsyncResult<Principal>> + Send;
    /// Re-hash the password and clear the must-rotate flag.
    ///
    /// This is the only write path that touches either field.
    fn update_password(
        &self,
        id: Uuid,
        password: &str,
    ) -> impl Future<Output = MedsyncResult<Principal>> + Send;
    fn set_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> impl Future<Output = MedsyncResult<Principal>> + Send;
    /// Delete the account together with its role profile.
    fn delete(&self, id: Uuid) -> impl Future<Output = MedsyncResult<()>> + Send;
    /// Delete every account of `role` bound to a hospital. Returns the count.
    fn delete_by_tenant(
        &self,
        tenant_id: Uuid,
        role: Role,
    ) -> impl Future<Output = MedsyncResult<u64>> + Send;
    fn list(
        &self,
        filter: PrincipalFilter,
        pagination: Pagination,
    ) -> impl Future<Output = MedsyncResult<PaginatedResult<Principal>>> + Send;
}

// ---------------------------------------------------------------------------
// Role profiles
// ---------------------------------------------------------------------------

pub trait DoctorProfileRepository: Send + Sync {
    fn create(
        &self,
        input: CreateDoctorProfile,
    ) -> impl Future<Output = MedsyncResult<DoctorProfile>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MedsyncResult<DoctorProfile>> + Send;
    fn get_by_principal(
        &self,
        principal_id: Uuid,
    ) -> impl Future<Output = MedsyncResult<DoctorProfile>> + Send;
    /// Applies specialty and department; contact lives on the principal.
    fn update(
        &self,
        id: Uuid,
        input: UpdateDoctorProfile,
    ) -> impl Future<Output = MedsyncResult<DoctorProfile>> + Send;
    fn list(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> impl Future<Output = MedsyncResult<PaginatedResult<DoctorProfile>>> + Send;
}

pub trait PatientProfileRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePatientProfile,
    ) -> impl Future<Output = MedsyncResult<PatientProfile>> + Send;
    fn get_by_id(&self, id: Uuid)
    -> impl Future<Output = MedsyncResult<PatientProfile>> + Send;
    fn get_by_principal(
        &self,
        principal_id: Uuid,
    ) -> impl Future<Output = MedsyncResult<PatientProfile>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePatientProfile,
    ) -> impl Future<Output = MedsyncResult<PatientProfile>> + Send;
}

// ---------------------------------------------------------------------------
// Clinical records
// ---------------------------------------------------------------------------

/// Raw storage for one kind of clinical record.
pub trait RecordRepository<R: ClinicalRecord>: Send + Sync {
    fn create(
        &self,
        tenant_id: Uuid,
        draft: R::Draft,
    ) -> impl Future<Output = MedsyncResult<R>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MedsyncResult<R>> + Send;
    fn update(&self, id: Uuid, patch: R::Patch) -> impl Future<Output = MedsyncResult<R>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = MedsyncResult<()>> + Send;
    fn list(
        &self,
        filter: RecordFilter,
        pagination: Pagination,
    ) -> impl Future<Output = MedsyncResult<PaginatedResult<R>>> + Send;
}

/// Bundle of every store the application needs, so that services can be
/// generic over a single parameter.
pub trait Repositories: Send + Sync + 'static {
    type Tenants: TenantRepository;
    type Principals: PrincipalRepository;
    type Doctors: DoctorProfileRepository;
    type Patients: PatientProfileRepository;
    type Records: RecordRepository<Appointment>
        + RecordRepository<Prescription>
        + RecordRepository<LabReport>;

    fn tenants(&self) -> &Self::Tenants;
    fn principals(&self) -> &Self::Principals;
    fn doctors(&self) -> &Self::Doctors;
    fn patients(&self) -> &Self::Patients;
    fn records(&self) -> &Self::Records;
}
