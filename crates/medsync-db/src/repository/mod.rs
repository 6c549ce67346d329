//! SurrealDB repository implementations.

mod appointment;
mod doctor_profile;
mod lab_report;
mod patient_profile;
mod prescription;
mod principal;
mod record;
mod tenant;

use medsync_core::repository::Repositories;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

pub use doctor_profile::SurrealDoctorProfileRepository;
pub use patient_profile::SurrealPatientProfileRepository;
pub use principal::{SurrealPrincipalRepository, hash_password};
pub use record::SurrealRecordRepository;
pub use tenant::SurrealTenantRepository;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Every SurrealDB store over one client.
#[derive(Clone)]
pub struct SurrealRepositories<C: Connection> {
    tenants: SurrealTenantRepository<C>,
    principals: SurrealPrincipalRepository<C>,
    doctors: SurrealDoctorProfileRepository<C>,
    patients: SurrealPatientProfileRepository<C>,
    records: SurrealRecordRepository<C>,
}

impl<C: Connection> SurrealRepositories<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self::build(db, None)
    }

    /// Like [`new`](Self::new), hashing passwords with a server-side pepper.
    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self::build(db, Some(pepper))
    }

    fn build(db: Surreal<C>, pepper: Option<String>) -> Self {
        let principals = match pepper {
            Some(pepper) => SurrealPrincipalRepository::with_pepper(db.clone(), pepper),
            None => SurrealPrincipalRepository::new(db.clone()),
        };
        Self {
            tenants: SurrealTenantRepository::new(db.clone()),
            principals,
            doctors: SurrealDoctorProfileRepository::new(db.clone()),
            patients: SurrealPatientProfileRepository::new(db.clone()),
            records: SurrealRecordRepository::new(db),
        }
    }
}

impl<C: Connection> Repositories for SurrealRepositories<C> {
    type Tenants = SurrealTenantRepository<C>;
    type Principals = SurrealPrincipalRepository<C>;
    type Doctors = SurrealDoctorProfileRepository<C>;
    type Patients = SurrealPatientProfileRepository<C>;
    type Records = SurrealRecordRepository<C>;

    fn tenants(&self) -> &Self::Tenants {
        &self.tenants
    }

    fn principals(&self) -> &Self::Principals {
        &self.principals
    }

    fn doctors(&self) -> &Self::Doctors {
        &self.doctors
    }

    fn patients(&self) -> &Self::Patients {
        &self.patients
    }

    fn records(&self) -> &Self::Records {
        &self.records
    }
}
