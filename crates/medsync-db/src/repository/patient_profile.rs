//! SurrealDB implementation of [`PatientProfileRepository`].
//!
//! The health summary is stored as four flat optional columns.

use chrono::{DateTime, Utc};
use medsync_core::error::MedsyncResult;
use medsync_core::models::profile::{
    CreatePatientProfile, HealthSummary, PatientProfile, UpdatePatientProfile,
};
use medsync_core::repository::PatientProfileRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_opt_uuid, parse_uuid};

#[derive(Debug, SurrealValue)]
struct PatientProfileRow {
    record_id: String,
    principal_id: String,
    tenant_id: Option<String>,
    blood_pressure: Option<String>,
    weight: Option<String>,
    glucose: Option<String>,
    heart_rate: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PatientProfileRow {
    fn try_into_profile(self) -> Result<PatientProfile, DbError> {
        Ok(PatientProfile {
            id: parse_uuid("patient_profile", &self.record_id)?,
            principal_id: parse_uuid("principal", &self.principal_id)?,
            tenant_id: parse_opt_uuid("tenant", self.tenant_id.as_deref())?,
            health_summary: HealthSummary {
                blood_pressure: self.blood_pressure,
                weight: self.weight,
                glucose: self.glucose,
                heart_rate: self.heart_rate,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_ONE: &str =
    "SELECT meta::id(id) AS record_id, * FROM type::record('patient_profile', $id)";

#[derive(Clone)]
pub struct SurrealPatientProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPatientProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PatientProfileRepository for SurrealPatientProfileRepository<C> {
    async fn create(&self, input: CreatePatientProfile) -> MedsyncResult<PatientProfile> {
        let id_str = Uuid::new_v4().to_string();
        let summary = input.health_summary;

        let result = self
            .db
            .query(format!(
                "CREATE type::record('patient_profile', $id) SET \
                 principal_id = $principal_id, tenant_id = $tenant_id, \
                 blood_pressure = $blood_pressure, weight = $weight, \
                 glucose = $glucose, heart_rate = $heart_rate; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id_str.clone()))
            .bind(("principal_id", input.principal_id.to_string()))
            .bind(("tenant_id", input.tenant_id.map(|t| t.to_string())))
            .bind(("blood_pressure", summary.blood_pressure))
            .bind(("weight", summary.weight))
            .bind(("glucose", summary.glucose))
            .bind(("heart_rate", summary.heart_rate))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<PatientProfileRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "patient_profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn get_by_id(&self, id: Uuid) -> MedsyncResult<PatientProfile> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PatientProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "patient_profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn get_by_principal(&self, principal_id: Uuid) -> MedsyncResult<PatientProfile> {
        let principal_id_str = principal_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM patient_profile \
                 WHERE principal_id = $principal_id",
            )
            .bind(("principal_id", principal_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PatientProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "patient_profile".into(),
            id: format!("principal_id={principal_id_str}"),
        })?;

        Ok(row.try_into_profile()?)
    }

    /// Replaces the whole health summary when one is given.
    async fn update(&self, id: Uuid, input: UpdatePatientProfile) -> MedsyncResult<PatientProfile> {
        let current = self.get_by_id(id).await?;
        let Some(summary) = input.health_summary else {
            return Ok(current);
        };

        let id_str = id.to_string();
        let result = self
            .db
            .query(format!(
                "UPDATE type::record('patient_profile', $id) SET \
                 blood_pressure = $blood_pressure, weight = $weight, \
                 glucose = $glucose, heart_rate = $heart_rate, \
                 updated_at = time::now(); \
                 {SELECT_ONE};"
            ))
            .bind(("id", id_str.clone()))
            .bind(("blood_pressure", summary.blood_pressure))
            .bind(("weight", summary.weight))
            .bind(("glucose", summary.glucose))
            .bind(("heart_rate", summary.heart_rate))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<PatientProfileRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "patient_profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile()?)
    }
}
