//! Prescription storage.

use chrono::{DateTime, Utc};
use medsync_core::error::MedsyncResult;
use medsync_core::models::record::{
    CreatePrescription, Prescription, PrescriptionStatus, RecordFilter, UpdatePrescription,
};
use medsync_core::repository::{PaginatedResult, Pagination, RecordRepository};
use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::record::{SurrealRecordRepository, where_clause};
use crate::error::{DbError, parse_uuid};

const TABLE: &str = "prescription";
const SELECT_ONE: &str =
    "SELECT meta::id(id) AS record_id, * FROM type::record('prescription', $id)";

#[derive(Debug, SurrealValue)]
struct PrescriptionRow {
    record_id: String,
    tenant_id: String,
    patient_id: String,
    doctor_id: String,
    medication: String,
    quantity: u32,
    status: String,
    date: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PrescriptionRow {
    fn try_into_prescription(self) -> Result<Prescription, DbError> {
        let status: PrescriptionStatus = self.status.parse().map_err(|_| {
            DbError::Corrupt(format!("unknown prescription status: {}", self.status))
        })?;
        Ok(Prescription {
            id: parse_uuid(TABLE, &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            patient_id: parse_uuid("patient", &self.patient_id)?,
            doctor_id: parse_uuid("doctor", &self.doctor_id)?,
            medication: self.medication,
            quantity: self.quantity,
            status,
            date: self.date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl<C: Connection> RecordRepository<Prescription> for SurrealRecordRepository<C> {
    async fn create(
        &self,
        tenant_id: Uuid,
        draft: CreatePrescription,
    ) -> MedsyncResult<Prescription> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(format!(
                "CREATE type::record('prescription', $id) SET \
                 tenant_id = $tenant_id, patient_id = $patient_id, \
                 doctor_id = $doctor_id, medication = $medication, \
                 quantity = $quantity, status = $status, date = $date; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("patient_id", draft.patient_id.to_string()))
            .bind(("doctor_id", draft.doctor_id.to_string()))
            .bind(("medication", draft.medication))
            .bind(("quantity", draft.quantity))
            .bind(("status", draft.status.as_str()))
            .bind(("date", draft.date))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<PrescriptionRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: TABLE.into(),
            id: id_str,
        })?;

        Ok(row.try_into_prescription()?)
    }

    async fn get_by_id(&self, id: Uuid) -> MedsyncResult<Prescription> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrescriptionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: TABLE.into(),
            id: id_str,
        })?;

        Ok(row.try_into_prescription()?)
    }

    async fn update(&self, id: Uuid, patch: UpdatePrescription) -> MedsyncResult<Prescription> {
        let id_str = id.to_string();
        self.exists(TABLE, &id_str).await?;

        let mut sets = Vec::new();
        if patch.medication.is_some() {
            sets.push("medication = $medication");
        }
        if patch.quantity.is_some() {
            sets.push("quantity = $quantity");
        }
        if patch.status.is_some() {
            sets.push("status = $status");
        }
        if patch.date.is_some() {
            sets.push("date = $date");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('prescription', $id) SET {}; {SELECT_ONE};",
            sets.join(", ")
        );

        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(medication) = patch.medication {
            builder = builder.bind(("medication", medication));
        }
        if let Some(quantity) = patch.quantity {
            builder = builder.bind(("quantity", quantity));
        }
        if let Some(status) = patch.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(date) = patch.date {
            builder = builder.bind(("date", date));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<PrescriptionRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: TABLE.into(),
            id: id_str,
        })?;

        Ok(row.try_into_prescription()?)
    }

    async fn delete(&self, id: Uuid) -> MedsyncResult<()> {
        Ok(self.delete_row(TABLE, id.to_string()).await?)
    }

    async fn list(
        &self,
        filter: RecordFilter,
        pagination: Pagination,
    ) -> MedsyncResult<PaginatedResult<Prescription>> {
        let total = self.count(TABLE, &filter).await?;

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM prescription {} \
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

        let rows: Vec<PrescriptionRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_prescription())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
