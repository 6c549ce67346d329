//! Appointment storage.

use chrono::{DateTime, Utc};
use medsync_core::error::MedsyncResult;
use medsync_core::models::record::{
    Appointment, AppointmentStatus, CreateAppointment, RecordFilter, UpdateAppointment,
};
use medsync_core::repository::{PaginatedResult, Pagination, RecordRepository};
use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::record::{SurrealRecordRepository, where_clause};
use crate::error::{DbError, parse_uuid};

const TABLE: &str = "appointment";
const SELECT_ONE: &str =
    "SELECT meta::id(id) AS record_id, * FROM type::record('appointment', $id)";

#[derive(Debug, SurrealValue)]
struct AppointmentRow {
    record_id: String,
    tenant_id: String,
    patient_id: String,
    doctor_id: String,
    date: String,
    time: String,
    status: String,
    visit_type: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AppointmentRow {
    fn try_into_appointment(self) -> Result<Appointment, DbError> {
        let status: AppointmentStatus = self
            .status
            .parse()
            .map_err(|_| DbError::Corrupt(format!("unknown appointment status: {}", self.status)))?;
        Ok(Appointment {
            id: parse_uuid(TABLE, &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            patient_id: parse_uuid("patient", &self.patient_id)?,
            doctor_id: parse_uuid("doctor", &self.doctor_id)?,
            date: self.date,
            time: self.time,
            status,
            visit_type: self.visit_type,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl<C: Connection> RecordRepository<Appointment> for SurrealRecordRepository<C> {
    async fn create(&self, tenant_id: Uuid, draft: CreateAppointment) -> MedsyncResult<Appointment> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(format!(
                "CREATE type::record('appointment', $id) SET \
                 tenant_id = $tenant_id, patient_id = $patient_id, \
                 doctor_id = $doctor_id, date = $date, time = $time, \
                 status = $status, visit_type = $visit_type; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("patient_id", draft.patient_id.to_string()))
            .bind(("doctor_id", draft.doctor_id.to_string()))
            .bind(("date", draft.date))
            .bind(("time", draft.time))
            .bind(("status", draft.status.as_str()))
            .bind(("visit_type", draft.visit_type))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<AppointmentRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: TABLE.into(),
            id: id_str,
        })?;

        Ok(row.try_into_appointment()?)
    }

    async fn get_by_id(&self, id: Uuid) -> MedsyncResult<Appointment> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppointmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: TABLE.into(),
            id: id_str,
        })?;

        Ok(row.try_into_appointment()?)
    }

    async fn update(&self, id: Uuid, patch: UpdateAppointment) -> MedsyncResult<Appointment> {
        let id_str = id.to_string();
        self.exists(TABLE, &id_str).await?;

        let mut sets = Vec::new();
        if patch.date.is_some() {
            sets.push("date = $date");
        }
        if patch.time.is_some() {
            sets.push("time = $time");
        }
        if patch.status.is_some() {
            sets.push("status = $status");
        }
        if patch.visit_type.is_some() {
            sets.push("visit_type = $visit_type");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('appointment', $id) SET {}; {SELECT_ONE};",
            sets.join(", ")
        );

        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(date) = patch.date {
            builder = builder.bind(("date", date));
        }
        if let Some(time) = patch.time {
            builder = builder.bind(("time", time));
        }
        if let Some(status) = patch.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(visit_type) = patch.visit_type {
            builder = builder.bind(("visit_type", visit_type));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<AppointmentRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: TABLE.into(),
            id: id_str,
        })?;

        Ok(row.try_into_appointment()?)
    }

    async fn delete(&self, id: Uuid) -> MedsyncResult<()> {
        Ok(self.delete_row(TABLE, id.to_string()).await?)
    }

    async fn list(
        &self,
        filter: RecordFilter,
        pagination: Pagination,
    ) -> MedsyncResult<PaginatedResult<Appointment>> {
        let total = self.count(TABLE, &filter).await?;

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM appointment {} \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
                where_clause(&filter)
            ))
            .bind(("tenant_id", filter.tenant_id.map(|v| v.to_string())))
            .bind(("patient_id", filter.patient_id.map(|v| v.to_string())))
            .bind(("doctor_id", filter.doctor_id.map(|v| v.to_string())))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppointmentRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_appointment())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
