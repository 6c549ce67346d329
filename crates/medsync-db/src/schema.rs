//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings and record ids are the UUID itself. Status enums are stored as
//! strings with ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Hospitals (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD address ON TABLE tenant TYPE option<string>;
DEFINE FIELD contact ON TABLE tenant TYPE option<string>;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Principals (login accounts; hospital reference depends on role)
-- =======================================================================
-- Role is not constrained here: rows written by earlier releases may hold
-- retired role strings, which the repository reports as typed errors.
DEFINE TABLE principal SCHEMAFULL;
DEFINE FIELD name ON TABLE principal TYPE string;
DEFINE FIELD email ON TABLE principal TYPE string \
    ASSERT $value = string::lowercase($value);
DEFINE FIELD password_hash ON TABLE principal TYPE string;
DEFINE FIELD role ON TABLE principal TYPE string;
DEFINE FIELD tenant_id ON TABLE principal TYPE option<string>;
DEFINE FIELD contact ON TABLE principal TYPE option<string>;
DEFINE FIELD active ON TABLE principal TYPE bool DEFAULT true;
DEFINE FIELD must_rotate_password ON TABLE principal TYPE bool \
    DEFAULT false;
DEFINE FIELD created_at ON TABLE principal TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE principal TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_principal_email ON TABLE principal \
    COLUMNS email UNIQUE;
DEFINE INDEX idx_principal_tenant_role ON TABLE principal \
    COLUMNS tenant_id, role;

-- =======================================================================
-- Doctor profiles (hospital scope, 1:1 with principal)
-- =======================================================================
DEFINE TABLE doctor_profile SCHEMAFULL;
DEFINE FIELD principal_id ON TABLE doctor_profile TYPE string;
DEFINE FIELD tenant_id ON TABLE doctor_profile TYPE string;
DEFINE FIELD specialty ON TABLE doctor_profile TYPE option<string>;
DEFINE FIELD department ON TABLE doctor_profile TYPE option<string>;
DEFINE FIELD created_at ON TABLE doctor_profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE doctor_profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_doctor_profile_principal ON TABLE doctor_profile \
    COLUMNS principal_id UNIQUE;
DEFINE INDEX idx_doctor_profile_tenant ON TABLE doctor_profile \
    COLUMNS tenant_id;

-- =======================================================================
-- Patient profiles (1:1 with principal, optional affiliation)
-- =======================================================================
DEFINE TABLE patient_profile SCHEMAFULL;
DEFINE FIELD principal_id ON TABLE patient_profile TYPE string;
DEFINE FIELD tenant_id ON TABLE patient_profile TYPE option<string>;
DEFINE FIELD blood_pressure ON TABLE patient_profile \
    TYPE option<string>;
DEFINE FIELD weight ON TABLE patient_profile TYPE option<string>;
DEFINE FIELD glucose ON TABLE patient_profile TYPE option<string>;
DEFINE FIELD heart_rate ON TABLE patient_profile TYPE option<string>;
DEFINE FIELD created_at ON TABLE patient_profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE patient_profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_patient_profile_principal ON TABLE patient_profile \
    COLUMNS principal_id UNIQUE;

-- =======================================================================
-- Appointments (hospital scope)
-- =======================================================================
DEFINE TABLE appointment SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE appointment TYPE string;
DEFINE FIELD patient_id ON TABLE appointment TYPE string;
DEFINE FIELD doctor_id ON TABLE appointment TYPE string;
DEFINE FIELD date ON TABLE appointment TYPE string;
DEFINE FIELD time ON TABLE appointment TYPE string;
DEFINE FIELD status ON TABLE appointment TYPE string \
    ASSERT $value IN ['confirmed', 'pending', 'checked-in', 'waiting', \
    'scheduled', 'urgent', 'completed'];
DEFINE FIELD visit_type ON TABLE appointment TYPE option<string>;
DEFINE FIELD created_at ON TABLE appointment TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE appointment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_appointment_tenant ON TABLE appointment \
    COLUMNS tenant_id;

-- =======================================================================
-- Prescriptions (hospital scope)
-- =======================================================================
DEFINE TABLE prescription SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE prescription TYPE string;
DEFINE FIELD patient_id ON TABLE prescription TYPE string;
DEFINE FIELD doctor_id ON TABLE prescription TYPE string;
DEFINE FIELD medication ON TABLE prescription TYPE string;
DEFINE FIELD quantity ON TABLE prescription TYPE int \
    ASSERT $value > 0;
DEFINE FIELD status ON TABLE prescription TYPE string \
    ASSERT $value IN ['pending', 'ready', 'dispensing', 'active', \
    'completed'];
DEFINE FIELD date ON TABLE prescription TYPE string;
DEFINE FIELD created_at ON TABLE prescription TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE prescription TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_prescription_tenant ON TABLE prescription \
    COLUMNS tenant_id;

-- =======================================================================
-- Lab reports (hospital scope)
-- =======================================================================
DEFINE TABLE lab_report SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE lab_report TYPE string;
DEFINE FIELD patient_id ON TABLE lab_report TYPE string;
DEFINE FIELD doctor_id ON TABLE lab_report TYPE option<string>;
DEFINE FIELD test ON TABLE lab_report TYPE string;
DEFINE FIELD date ON TABLE lab_report TYPE string;
DEFINE FIELD status ON TABLE lab_report TYPE string \
    ASSERT $value IN ['ready', 'pending'];
DEFINE FIELD result ON TABLE lab_report TYPE option<string>;
DEFINE FIELD created_at ON TABLE lab_report TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE lab_report TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_lab_report_tenant ON TABLE lab_report \
    COLUMNS tenant_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_every_table() {
        for table in [
            "tenant",
            "principal",
            "doctor_profile",
            "patient_profile",
            "appointment",
            "prescription",
            "lab_report",
        ] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn email_index_name_matches_error_mapping() {
        assert!(SCHEMA_V1.contains(crate::error::EMAIL_INDEX));
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
