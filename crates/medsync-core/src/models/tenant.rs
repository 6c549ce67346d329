//! Tenant (hospital) domain model.
//!
//! Hospitals are the unit of data isolation. Staff accounts, doctor
//! profiles and clinical records all carry a hospital reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A hospital sharing the deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Display name.
    pub name: String,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new hospital.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub address: Option<String>,
    pub contact: Option<String>,
}

/// Fields that can be updated on an existing hospital.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
}

impl UpdateTenant {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.contact.is_none()
    }
}
