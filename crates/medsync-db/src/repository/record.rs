//! SurrealDB storage for clinical records.
//!
//! One repository value serves every record kind; the per-kind
//! [`RecordRepository`](medsync_core::repository::RecordRepository)
//! implementations live next to this module.

use medsync_core::models::record::RecordFilter;
use surrealdb::{Connection, Surreal};

use super::CountRow;
use crate::error::DbError;

#[derive(Clone)]
pub struct SurrealRecordRepository<C: Connection> {
    pub(super) db: Surreal<C>,
}

impl<C: Connection> SurrealRecordRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    pub(super) async fn exists(&self, table: &'static str, id_str: &str) -> Result<(), DbError> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM type::record($table, $id) GROUP ALL")
            .bind(("table", table))
            .bind(("id", id_str.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        if rows.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::NotFound {
                entity: table.into(),
                id: id_str.to_string(),
            });
        }
        Ok(())
    }

    pub(super) async fn delete_row(&self, table: &'static str, id_str: String) -> Result<(), DbError> {
        self.exists(table, &id_str).await?;
        self.db
            .query("DELETE type::record($table, $id)")
            .bind(("table", table))
            .bind(("id", id_str))
            .await?
            .check()
            .map_err(DbError::from_statement)?;
        Ok(())
    }

    pub(super) async fn count(
        &self,
        table: &'static str,
        filter: &RecordFilter,
    ) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM {table} {} GROUP ALL",
                where_clause(filter)
            ))
            .bind(("tenant_id", filter.tenant_id.map(|v| v.to_string())))
            .bind(("patient_id", filter.patient_id.map(|v| v.to_string())))
            .bind(("doctor_id", filter.doctor_id.map(|v| v.to_string())))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

/// `WHERE` clause for the populated filter fields, or an empty string.
pub(super) fn where_clause(filter: &RecordFilter) -> String {
    let mut conditions = Vec::new();
    if filter.tenant_id.is_some() {
        conditions.push("tenant_id = $tenant_id");
    }
    if filter.patient_id.is_some() {
        conditions.push("patient_id = $patient_id");
    }
    if filter.doctor_id.is_some() {
        conditions.push("doctor_id = $doctor_id");
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}
