//! SurrealDB implementation of [`DoctorProfileRepository`].

use chrono::{DateTime, Utc};
use medsync_core::error::MedsyncResult;
use medsync_core::models::profile::{CreateDoctorProfile, DoctorProfile, UpdateDoctorProfile};
use medsync_core::repository::{DoctorProfileRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::CountRow;
use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct DoctorProfileRow {
    record_id: String,
    principal_id: String,
    tenant_id: String,
    specialty: Option<String>,
    department: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DoctorProfileRow {
    fn try_into_profile(self) -> Result<DoctorProfile, DbError> {
        Ok(DoctorProfile {
            id: parse_uuid("doctor_profile", &self.record_id)?,
            principal_id: parse_uuid("principal", &self.principal_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            specialty: self.specialty,
            department: self.department,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_ONE: &str =
    "SELECT meta::id(id) AS record_id, * FROM type::record('doctor_profile', $id)";

#[derive(Clone)]
pub struct SurrealDoctorProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDoctorProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DoctorProfileRepository for SurrealDoctorProfileRepository<C> {
    async fn create(&self, input: CreateDoctorProfile) -> MedsyncResult<DoctorProfile> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(format!(
                "CREATE type::record('doctor_profile', $id) SET \
                 principal_id = $principal_id, tenant_id = $tenant_id, \
                 specialty = $specialty, department = $department; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id_str.clone()))
            .bind(("principal_id", input.principal_id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("specialty", input.specialty))
            .bind(("department", input.department))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<DoctorProfileRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "doctor_profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn get_by_id(&self, id: Uuid) -> MedsyncResult<DoctorProfile> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DoctorProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "doctor_profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn get_by_principal(&self, principal_id: Uuid) -> MedsyncResult<DoctorProfile> {
        let principal_id_str = principal_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM doctor_profile \
                 WHERE principal_id = $principal_id",
            )
            .bind(("principal_id", principal_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DoctorProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "doctor_profile".into(),
            id: format!("principal_id={principal_id_str}"),
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn update(&self, id: Uuid, input: UpdateDoctorProfile) -> MedsyncResult<DoctorProfile> {
        input.validate()?;
        self.get_by_id(id).await?;

        let mut sets = Vec::new();
        if input.specialty.is_some() {
            sets.push("specialty = $specialty");
        }
        if input.department.is_some() {
            sets.push("department = $department");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('doctor_profile', $id) SET {}; {SELECT_ONE};",
            sets.join(", ")
        );

        let id_str = id.to_string();
        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(specialty) = input.specialty {
            builder = builder.bind(("specialty", specialty));
        }
        if let Some(department) = input.department {
            builder = builder.bind(("department", department));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<DoctorProfileRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "doctor_profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn list(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> MedsyncResult<PaginatedResult<DoctorProfile>> {
        let where_clause = if tenant_id.is_some() {
            "WHERE tenant_id = $tenant_id"
        } else {
            ""
        };
        let tenant_id = tenant_id.map(|t| t.to_string());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM doctor_profile {where_clause} GROUP ALL"
            ))
            .bind(("tenant_id", tenant_id.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM doctor_profile {where_clause} \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("tenant_id", tenant_id))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DoctorProfileRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_profile())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
