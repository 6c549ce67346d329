//! Role profiles: the 1:1 doctor and patient extensions of a principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MedsyncError, MedsyncResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub principal_id: Uuid,
    /// Copied from the owning principal at creation.
    pub tenant_id: Uuid,
    pub specialty: Option<String>,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateDoctorProfile {
    pub principal_id: Uuid,
    pub tenant_id: Uuid,
    pub specialty: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateDoctorProfile {
    pub specialty: Option<String>,
    pub department: Option<String>,
    /// Stored on the owning principal.
    pub contact: Option<String>,
}

impl UpdateDoctorProfile {
    /// A specialty or department, when given, must not be blank.
    pub fn validate(&self) -> MedsyncResult<()> {
        for (field, value) in [("specialty", &self.specialty), ("department", &self.department)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(MedsyncError::validation(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub blood_pressure: Option<String>,
    pub weight: Option<String>,
    pub glucose: Option<String>,
    pub heart_rate: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub principal_id: Uuid,
    /// Hospital affiliation, present only when the account was provisioned
    /// by a hospital. Clinical records carry their own reference.
    pub tenant_id: Option<Uuid>,
    pub health_summary: HealthSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePatientProfile {
    pub principal_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub health_summary: HealthSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePatientProfile {
    pub health_summary: Option<HealthSummary>,
}

/// Role-specific attributes supplied when an account is created.
#[derive(Debug, Clone, Default)]
pub enum ProfileExtras {
    Doctor {
        specialty: Option<String>,
        department: Option<String>,
    },
    Patient {
        health_summary: HealthSummary,
    },
    #[default]
    None,
}

/// The profile created alongside an account, if its role has one.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleProfile {
    Doctor(DoctorProfile),
    Patient(PatientProfile),
}
