//! Clinical records: appointments, prescriptions and lab reports.
//!
//! Every record carries the hospital it belongs to plus references to the
//! patient profile and, where applicable, the doctor profile involved. The
//! hospital is never part of a [`RecordDraft`]: it is stamped by the
//! tenant-scoped facade from the caller's session.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::access::ResourceKind;
use crate::error::{MedsyncError, MedsyncResult};

/// Common shape of a stored clinical record.
pub trait ClinicalRecord: Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    type Draft: RecordDraft;
    type Patch: RecordPatch;

    fn id(&self) -> Uuid;
    fn tenant_id(&self) -> Uuid;
    /// Patient profile the record is about.
    fn patient_id(&self) -> Uuid;
    /// Doctor profile responsible for the record, if any.
    fn doctor_id(&self) -> Option<Uuid>;
}

/// Caller-supplied payload for a new record.
pub trait RecordDraft: Clone + Send + Sync + 'static {
    fn patient_id(&self) -> Uuid;
    fn set_patient_id(&mut self, patient_id: Uuid);
    fn doctor_id(&self) -> Option<Uuid>;
    fn validate(&self) -> MedsyncResult<()>;
}

/// Explicit set of mutable fields for a record kind.
pub trait RecordPatch: Clone + Send + Sync + 'static {
    /// Names of the fields this patch sets.
    fn fields(&self) -> Vec<&'static str>;

    fn validate(&self) -> MedsyncResult<()> {
        Ok(())
    }
}

/// Caller-controlled filters for record listings.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

/// Filters handed to the store. Built by the facade, never by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub tenant_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

fn require_non_empty(field: &str, value: &str) -> MedsyncResult<()> {
    if value.trim().is_empty() {
        return Err(MedsyncError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn parse_error(kind: &str, value: &str) -> MedsyncError {
    MedsyncError::validation(format!("unknown {kind} status: {value}"))
}

// ---------------------------------------------------------------------------
// Appointment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Confirmed,
    #[default]
    Pending,
    CheckedIn,
    Waiting,
    Scheduled,
    Urgent,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::CheckedIn => "checked-in",
            AppointmentStatus::Waiting => "waiting",
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Urgent => "urgent",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = MedsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "pending" => Ok(AppointmentStatus::Pending),
            "checked-in" => Ok(AppointmentStatus::CheckedIn),
            "waiting" => Ok(AppointmentStatus::Waiting),
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "urgent" => Ok(AppointmentStatus::Urgent),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(parse_error("appointment", other)),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub visit_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub visit_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAppointment {
    pub date: Option<String>,
    pub time: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub visit_type: Option<String>,
}

impl ClinicalRecord for Appointment {
    const KIND: ResourceKind = ResourceKind::Appointment;

    type Draft = CreateAppointment;
    type Patch = UpdateAppointment;

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    fn doctor_id(&self) -> Option<Uuid> {
        Some(self.doctor_id)
    }
}

impl RecordDraft for CreateAppointment {
    fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    fn set_patient_id(&mut self, patient_id: Uuid) {
        self.patient_id = patient_id;
    }

    fn doctor_id(&self) -> Option<Uuid> {
        Some(self.doctor_id)
    }

    fn validate(&self) -> MedsyncResult<()> {
        require_non_empty("date", &self.date)?;
        require_non_empty("time", &self.time)
    }
}

impl RecordPatch for UpdateAppointment {
    fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.date.is_some() {
            fields.push("date");
        }
        if self.time.is_some() {
            fields.push("time");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.visit_type.is_some() {
            fields.push("visit_type");
        }
        fields
    }

    fn validate(&self) -> MedsyncResult<()> {
        if let Some(date) = &self.date {
            require_non_empty("date", date)?;
        }
        if let Some(time) = &self.time {
            require_non_empty("time", time)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prescription
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrescriptionStatus {
    #[default]
    Pending,
    Ready,
    Dispensing,
    Active,
    Completed,
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Pending => "pending",
            PrescriptionStatus::Ready => "ready",
            PrescriptionStatus::Dispensing => "dispensing",
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Completed => "completed",
        }
    }
}

impl FromStr for PrescriptionStatus {
    type Err = MedsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PrescriptionStatus::Pending),
            "ready" => Ok(PrescriptionStatus::Ready),
            "dispensing" => Ok(PrescriptionStatus::Dispensing),
            "active" => Ok(PrescriptionStatus::Active),
            "completed" => Ok(PrescriptionStatus::Completed),
            other => Err(parse_error("prescription", other)),
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub medication: String,
    pub quantity: u32,
    pub status: PrescriptionStatus,
    pub date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescription {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub medication: String,
    pub quantity: u32,
    #[serde(default)]
    pub status: PrescriptionStatus,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePrescription {
    pub medication: Option<String>,
    pub quantity: Option<u32>,
    pub status: Option<PrescriptionStatus>,
    pub date: Option<String>,
}

impl ClinicalRecord for Prescription {
    const KIND: ResourceKind = ResourceKind::Prescription;

    type Draft = CreatePrescription;
    type Patch = UpdatePrescription;

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    fn doctor_id(&self) -> Option<Uuid> {
        Some(self.doctor_id)
    }
}

impl RecordDraft for CreatePrescription {
    fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    fn set_patient_id(&mut self, patient_id: Uuid) {
        self.patient_id = patient_id;
    }

    fn doctor_id(&self) -> Option<Uuid> {
        Some(self.doctor_id)
    }

    fn validate(&self) -> MedsyncResult<()> {
        require_non_empty("medication", &self.medication)?;
        require_non_empty("date", &self.date)?;
        if self.quantity == 0 {
            return Err(MedsyncError::validation("quantity must be positive"));
        }
        Ok(())
    }
}

impl RecordPatch for UpdatePrescription {
    fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.medication.is_some() {
            fields.push("medication");
        }
        if self.quantity.is_some() {
            fields.push("quantity");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.date.is_some() {
            fields.push("date");
        }
        fields
    }

    fn validate(&self) -> MedsyncResult<()> {
        if self.quantity == Some(0) {
            return Err(MedsyncError::validation("quantity must be positive"));
        }
        if let Some(medication) = &self.medication {
            require_non_empty("medication", medication)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lab report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabReportStatus {
    Ready,
    #[default]
    Pending,
}

impl LabReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabReportStatus::Ready => "ready",
            LabReportStatus::Pending => "pending",
        }
    }
}

impl FromStr for LabReportStatus {
    type Err = MedsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(LabReportStatus::Ready),
            "pending" => Ok(LabReportStatus::Pending),
            other => Err(parse_error("lab report", other)),
        }
    }
}

impl fmt::Display for LabReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabReport {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub patient_id: Uuid,
    /// Ordering doctor profile, when known.
    pub doctor_id: Option<Uuid>,
    pub test: String,
    pub date: String,
    pub status: LabReportStatus,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLabReport {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub test: String,
    pub date: String,
    #[serde(default)]
    pub status: LabReportStatus,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateLabReport {
    pub test: Option<String>,
    pub date: Option<String>,
    pub status: Option<LabReportStatus>,
    pub result: Option<String>,
}

impl ClinicalRecord for LabReport {
    const KIND: ResourceKind = ResourceKind::LabReport;

    type Draft = CreateLabReport;
    type Patch = UpdateLabReport;

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    fn doctor_id(&self) -> Option<Uuid> {
        self.doctor_id
    }
}

impl RecordDraft for CreateLabReport {
    fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    fn set_patient_id(&mut self, patient_id: Uuid) {
        self.patient_id = patient_id;
    }

    fn doctor_id(&self) -> Option<Uuid> {
        self.doctor_id
    }

    fn validate(&self) -> MedsyncResult<()> {
        require_non_empty("test", &self.test)?;
        require_non_empty("date", &self.date)
    }
}

impl RecordPatch for UpdateLabReport {
    fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.test.is_some() {
            fields.push("test");
        }
        if self.date.is_some() {
            fields.push("date");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.result.is_some() {
            fields.push("result");
        }
        fields
    }

    fn validate(&self) -> MedsyncResult<()> {
        if let Some(test) = &self.test {
            require_non_empty("test", test)?;
        }
        if let Some(date) = &self.date {
            require_non_empty("date", date)?;
        }
        Ok(())
    }
}
