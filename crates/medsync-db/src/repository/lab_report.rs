//! Lab report storage.

use chrono::{DateTime, Utc};
use medsync_core::error::MedsyncResult;
use medsync_core::models::record::{
    CreateLabReport, LabReport, LabReportStatus, RecordFilter, UpdateLabReport,
};
use medsync_core::repository::{PaginatedResult, Pagination, RecordRepository};
use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::record::{SurrealRecordRepository, where_clause};
use crate::error::{DbError, parse_opt_uuid, parse_uuid};

const TABLE: &str = "lab_report";
const SELECT_ONE: &str =
    "SELECT meta::id(id) AS record_id, * FROM type::record('lab_report', $id)";

#[derive(Debug, SurrealValue)]
struct LabReportRow {
    record_id: String,
    tenant_id: String,
    patient_id: String,
    doctor_id: Option<String>,
    test: String,
    date: String,
    status: String,
    result: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LabReportRow {
    fn try_into_lab_report(self) -> Result<LabReport, DbError> {
        let status: LabReportStatus = self
            .status
            .parse()
            .map_err(|_| DbError::Corrupt(format!("unknown lab report status: {}", self.status)))?;
        Ok(LabReport {
            id: parse_uuid(TABLE, &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            patient_id: parse_uuid("patient", &self.patient_id)?,
            doctor_id: parse_opt_uuid("doctor", self.doctor_id.as_deref())?,
            test: self.test,
            date: self.date,
            status,
            result: self.result,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl<C: Connection> RecordRepository<LabReport> for SurrealRecordRepository<C> {
    async fn create(&self, tenant_id: Uuid, draft: CreateLabReport) -> MedsyncResult<LabReport> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(format!(
                "CREATE type::record('lab_report', $id) SET \
                 tenant_id = $tenant_id, patient_id = $patient_id, \
                 doctor_id = $doctor_id, test = $test, date = $date, \
                 status = $status, result = $result; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("patient_id", draft.patient_id.to_string()))
            .bind(("doctor_id", draft.doctor_id.map(|d| d.to_string())))
            .bind(("test", draft.test))
            .bind(("date", draft.date))
            .bind(("status", draft.status.as_str()))
            .bind(("result", draft.result))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<LabReportRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: TABLE.into(),
            id: id_str,
        })?;

        Ok(row.try_into_lab_report()?)
    }

    async fn get_by_id(&self, id: Uuid) -> MedsyncResult<LabReport> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LabReportRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: TABLE.into(),
            id: id_str,
        })?;

        Ok(row.try_into_lab_report()?)
    }

    async fn update(&self, id: Uuid, patch: UpdateLabReport) -> MedsyncResult<LabReport> {
        let id_str = id.to_string();
        self.exists(TABLE, &id_str).await?;

        let mut sets = Vec::new();
        if patch.test.is_some() {
            sets.push("test = $test");
        }
        if patch.date.is_some() {
            sets.push("date = $date");
        }
        if patch.status.is_some() {
            sets.push("status = $status");
        }
        if patch.result.is_some() {
            sets.push("result = $result");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('lab_report', $id) SET {}; {SELECT_ONE};",
            sets.join(", ")
        );

        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(test) = patch.test {
            builder = builder.bind(("test", test));
        }
        if let Some(date) = patch.date {
            builder = builder.bind(("date", date));
        }
        if let Some(status) = patch.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(result) = patch.result {
            builder = builder.bind(("result", result));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<LabReportRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: TABLE.into(),
            id: id_str,
        })?;

        Ok(row.try_into_lab_report()?)
    }

    async fn delete(&self, id: Uuid) -> MedsyncResult<()> {
        Ok(self.delete_row(TABLE, id.to_string()).await?)
    }

    async fn list(
        &self,
        filter: RecordFilter,
        pagination: Pagination,
    ) -> MedsyncResult<PaginatedResult<LabReport>> {
        let total = self.count(TABLE, &filter).await?;

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM lab_report {} \
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

        let rows: Vec<LabReportRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_lab_report())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
