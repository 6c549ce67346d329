//! Integration tests for the tenant-scoped facade over in-memory SurrealDB.

use std::sync::Arc;

use chrono::{Duration, Utc};
use medsync_auth::{
    AuthConfig, CredentialIssuer, OutboxNotifier, ProvisionRequest, Registration, SessionIssuer,
};
use medsync_authz::{Gateway, NewAdmin};
use medsync_core::error::MedsyncError;
use medsync_core::models::principal::Principal;
use medsync_core::models::profile::{
    DoctorProfile, HealthSummary, PatientProfile, ProfileExtras, RoleProfile, UpdateDoctorProfile,
    UpdatePatientProfile,
};
use medsync_core::models::record::{
    Appointment, AppointmentStatus, CreateAppointment, CreateLabReport, CreatePrescription,
    LabReport, LabReportStatus, Prescription, PrescriptionStatus, RecordQuery, UpdateAppointment,
    UpdateLabReport, UpdatePrescription,
};
use medsync_core::models::role::Role;
use medsync_core::models::session::SessionClaims;
use medsync_core::models::tenant::{CreateTenant, Tenant, UpdateTenant};
use medsync_core::repository::{Pagination, PrincipalRepository, Repositories};
use medsync_db::SurrealRepositories;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Repos = SurrealRepositories<Db>;

fn test_config() -> AuthConfig {
    AuthConfig {
        signing_secret: "scope-test-secret-with-enough-entropy".into(),
        jwt_issuer: "medsync-test".into(),
        ..Default::default()
    }
}

struct Harness {
    repos: Arc<Repos>,
    outbox: Arc<OutboxNotifier>,
    gateway: Gateway<Repos, Arc<OutboxNotifier>>,
    sessions: SessionIssuer<<Repos as Repositories>::Principals>,
    root: SessionClaims,
}

/// Claims as they look after the account has rotated its password.
fn claims_for(principal: &Principal) -> SessionClaims {
    let mut claims = SessionClaims::for_principal(principal, Utc::now(), Duration::hours(1));
    claims.must_rotate = false;
    claims
}

async fn setup() -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    medsync_db::run_migrations(&db).await.unwrap();

    let repos = Arc::new(SurrealRepositories::new(db));
    let outbox = Arc::new(OutboxNotifier::new());
    let credentials = CredentialIssuer::new(repos.clone(), outbox.clone(), test_config());
    let sessions = SessionIssuer::new(repos.principals().clone(), test_config());
    let gateway = Gateway::new(repos.clone(), credentials);

    let root = gateway
        .credentials()
        .bootstrap_super_admin("Root", "root@medsync.test")
        .await
        .unwrap()
        .expect("super-admin created");

    Harness {
        repos,
        outbox,
        gateway,
        sessions,
        root: claims_for(&root.principal),
    }
}

async fn hospital(h: &Harness, name: &str) -> (Tenant, SessionClaims) {
    let slug = name.to_lowercase().replace(' ', "-");
    let (tenant, provisioned) = h
        .gateway
        .scope(&h.root)
        .create_tenant_with_admin(
            CreateTenant {
                name: name.into(),
                address: None,
                contact: None,
            },
            NewAdmin {
                name: format!("{name} Admin"),
                email: format!("admin@{slug}.test"),
                contact: None,
            },
        )
        .await
        .unwrap();
    (tenant, claims_for(&provisioned.principal))
}

async fn doctor(h: &Harness, admin: &SessionClaims, email: &str) -> (DoctorProfile, SessionClaims) {
    let provisioned = h
        .gateway
        .scope(admin)
        .provision(ProvisionRequest {
            name: "Dr. House".into(),
            email: email.into(),
            role: Role::Doctor,
            tenant_id: None,
            contact: None,
            extras: ProfileExtras::Doctor {
                specialty: Some("Diagnostics".into()),
                department: None,
            },
        })
        .await
        .unwrap();
    let Some(RoleProfile::Doctor(profile)) = provisioned.profile else {
        panic!("expected a doctor profile");
    };
    (profile, claims_for(&provisioned.principal))
}

async fn patient(h: &Harness, admin: &SessionClaims, email: &str) -> (PatientProfile, SessionClaims) {
    let provisioned = h
        .gateway
        .scope(admin)
        .provision(ProvisionRequest {
            name: "Pat Patient".into(),
            email: email.into(),
            role: Role::Patient,
            tenant_id: None,
            contact: None,
            extras: ProfileExtras::Patient {
                health_summary: HealthSummary::default(),
            },
        })
        .await
        .unwrap();
    let Some(RoleProfile::Patient(profile)) = provisioned.profile else {
        panic!("expected a patient profile");
    };
    (profile, claims_for(&provisioned.principal))
}

fn appointment(patient: &PatientProfile, doctor: &DoctorProfile) -> CreateAppointment {
    CreateAppointment {
        patient_id: patient.id,
        doctor_id: doctor.id,
        date: "2024-06-01".into(),
        time: "09:30".into(),
        status: AppointmentStatus::Scheduled,
        visit_type: Some("Consultation".into()),
    }
}

fn prescription(patient: &PatientProfile, doctor: &DoctorProfile) -> CreatePrescription {
    CreatePrescription {
        patient_id: patient.id,
        doctor_id: doctor.id,
        medication: "Amoxicillin 500mg".into(),
        quantity: 21,
        status: PrescriptionStatus::Pending,
        date: "2024-06-01".into(),
    }
}

fn temporary_password(outbox: &OutboxNotifier, to: &str) -> String {
    outbox
        .last_to(to)
        .expect("no message sent")
        .body
        .lines()
        .find_map(|line| line.strip_prefix("Temporary password: "))
        .expect("no password in message")
        .to_string()
}

#[tokio::test]
async fn new_hospital_admin_rotates_then_lists_doctors() {
    let h = setup().await;
    let (tenant, _) = hospital(&h, "St Mary").await;

    let password = temporary_password(&h.outbox, "admin@st-mary.test");
    let first = h
        .sessions
        .authenticate("admin@st-mary.test", &password)
        .await
        .unwrap();
    assert!(first.claims.must_rotate);
    assert_eq!(first.claims.tenant, Some(tenant.id));

    let scope = h.gateway.scope(&first.claims);
    let err = scope
        .list_doctors(None, Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::PasswordRotationRequired));

    scope.rotate_password("a-much-better-password").await.unwrap();

    let second = h
        .sessions
        .authenticate("admin@st-mary.test", "a-much-better-password")
        .await
        .unwrap();
    assert!(!second.claims.must_rotate);

    doctor(&h, &second.claims, "house@st-mary.test").await;
    let doctors = h
        .gateway
        .scope(&second.claims)
        .list_doctors(None, Pagination::default())
        .await
        .unwrap();
    assert_eq!(doctors.total, 1);
    assert_eq!(doctors.items[0].tenant_id, tenant.id);
}

#[tokio::test]
async fn super_admin_manages_admins_but_not_records() {
    let h = setup().await;
    let (a, admin_a) = hospital(&h, "Alpha").await;
    hospital(&h, "Beta").await;
    let root = h.gateway.scope(&h.root);

    assert_eq!(root.list_admins(None, Pagination::default()).await.unwrap().total, 2);
    let only_a = root
        .list_admins(Some(a.id), Pagination::default())
        .await
        .unwrap();
    assert_eq!(only_a.total, 1);
    assert_eq!(only_a.items[0].email, "admin@alpha.test");

    let err = root
        .list::<Appointment>(RecordQuery::default(), Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Forbidden { .. }));
    let err = root
        .list_doctors(Some(a.id), Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Forbidden { .. }));

    let err = h
        .gateway
        .scope(&admin_a)
        .list_admins(None, Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Forbidden { .. }));

    let err = h
        .gateway
        .scope(&admin_a)
        .create_tenant(CreateTenant {
            name: "Rogue".into(),
            address: None,
            contact: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Forbidden { .. }));
}

#[tokio::test]
async fn records_never_cross_hospitals() {
    let h = setup().await;
    let (_, admin_a) = hospital(&h, "Alpha").await;
    let (_, admin_b) = hospital(&h, "Beta").await;
    let (doc, _) = doctor(&h, &admin_a, "doc@alpha.test").await;
    let (pat, _) = patient(&h, &admin_a, "pat@alpha.test").await;

    let created: Appointment = h
        .gateway
        .scope(&admin_a)
        .create(appointment(&pat, &doc))
        .await
        .unwrap();

    let other = h.gateway.scope(&admin_b);
    let err = other.get::<Appointment>(created.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    let listed = other
        .list::<Appointment>(RecordQuery::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
    assert!(listed.items.is_empty());

    let patch = UpdateAppointment {
        status: Some(AppointmentStatus::Completed),
        ..Default::default()
    };
    let err = other
        .update::<Appointment>(created.id, patch)
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    let err = other.delete::<Appointment>(created.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    let still_there: Appointment = h.gateway.scope(&admin_a).get(created.id).await.unwrap();
    assert_eq!(still_there.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn clinical_records_of_another_hospital_stay_hidden_from_doctors() {
    let h = setup().await;
    let (_, admin_a) = hospital(&h, "Alpha").await;
    let (_, admin_b) = hospital(&h, "Beta").await;
    let (_, doc_a_claims) = doctor(&h, &admin_a, "doc@alpha.test").await;
    let (doc_b, doc_b_claims) = doctor(&h, &admin_b, "doc@beta.test").await;
    let (pat_b, _) = patient(&h, &admin_b, "pat@beta.test").await;

    let home = h.gateway.scope(&doc_b_claims);
    let report: LabReport = home
        .create(CreateLabReport {
            patient_id: pat_b.id,
            doctor_id: Some(doc_b.id),
            test: "Lipid panel".into(),
            date: "2024-06-03".into(),
            status: LabReportStatus::Pending,
            result: None,
        })
        .await
        .unwrap();
    let rx: Prescription = home.create(prescription(&pat_b, &doc_b)).await.unwrap();

    let other = h.gateway.scope(&doc_a_claims);

    let err = other.get::<LabReport>(report.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    let listed = other
        .list::<LabReport>(
            RecordQuery {
                patient_id: Some(pat_b.id),
                doctor_id: None,
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
    let err = other
        .update::<LabReport>(
            report.id,
            UpdateLabReport {
                result: Some("Normal".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    let err = other.delete::<LabReport>(report.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    // The hospital check runs before the prescriber check.
    let err = other.get::<Prescription>(rx.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    let listed = other
        .list::<Prescription>(RecordQuery::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
    let err = other
        .update::<Prescription>(
            rx.id,
            UpdatePrescription {
                status: Some(PrescriptionStatus::Ready),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    let err = other.delete::<Prescription>(rx.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    let untouched: LabReport = home.get(report.id).await.unwrap();
    assert_eq!(untouched.result, None);
    let untouched: Prescription = home.get(rx.id).await.unwrap();
    assert_eq!(untouched.status, PrescriptionStatus::Pending);
}

#[tokio::test]
async fn hospital_staff_cannot_reach_patients_of_another_hospital() {
    let h = setup().await;
    let (_, admin_a) = hospital(&h, "Alpha").await;
    let (tenant_b, admin_b) = hospital(&h, "Beta").await;
    let (_, doc_a_claims) = doctor(&h, &admin_a, "doc@alpha.test").await;
    let (pat_b, _) = patient(&h, &admin_b, "pat@beta.test").await;
    assert_eq!(pat_b.tenant_id, Some(tenant_b.id));

    let chart = UpdatePatientProfile {
        health_summary: Some(HealthSummary {
            weight: Some("70kg".into()),
            ..Default::default()
        }),
    };

    for claims in [&admin_a, &doc_a_claims] {
        let other = h.gateway.scope(claims);
        let err = other.get_patient(pat_b.id).await.unwrap_err();
        assert!(matches!(err, MedsyncError::NotFound { .. }));
        let err = other
            .update_patient(pat_b.id, chart.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, MedsyncError::NotFound { .. }));
    }
    let err = h
        .gateway
        .scope(&admin_a)
        .delete_patient(pat_b.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    let view = h.gateway.scope(&admin_b).get_patient(pat_b.id).await.unwrap();
    assert_eq!(view.profile.health_summary, HealthSummary::default());
}

#[tokio::test]
async fn unaffiliated_patients_belong_to_the_hospitals_that_treat_them() {
    let h = setup().await;
    let (_, admin_a) = hospital(&h, "Alpha").await;
    let (_, admin_b) = hospital(&h, "Beta").await;
    let (doc_a, doc_a_claims) = doctor(&h, &admin_a, "doc@alpha.test").await;
    let (_, doc_b_claims) = doctor(&h, &admin_b, "doc@beta.test").await;

    let registered = h
        .gateway
        .credentials()
        .register(Registration {
            name: "Walk In".into(),
            email: "walkin@example.com".into(),
            password: "walk-in-password-123".into(),
            role: Role::Patient,
            tenant_id: None,
            contact: None,
            extras: ProfileExtras::Patient {
                health_summary: HealthSummary::default(),
            },
        })
        .await
        .unwrap();
    let Some(RoleProfile::Patient(own)) = registered.profile else {
        panic!("expected a patient profile");
    };
    assert_eq!(own.tenant_id, None);
    let walk_in = claims_for(&registered.principal);

    // No hospital has treated them yet.
    let err = h
        .gateway
        .scope(&doc_a_claims)
        .get_patient(own.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    let _: Appointment = h
        .gateway
        .scope(&walk_in)
        .create(appointment(&own, &doc_a))
        .await
        .unwrap();

    let chart = UpdatePatientProfile {
        health_summary: Some(HealthSummary {
            heart_rate: Some("64".into()),
            ..Default::default()
        }),
    };

    let other = h.gateway.scope(&doc_b_claims);
    let err = other.get_patient(own.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    let err = other
        .update_patient(own.id, chart.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    let err = h
        .gateway
        .scope(&admin_b)
        .delete_patient(own.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    h.repos
        .principals()
        .get_by_id(registered.principal.id)
        .await
        .unwrap();

    let treating = h.gateway.scope(&doc_a_claims);
    assert_eq!(treating.get_patient(own.id).await.unwrap().profile.id, own.id);
    let updated = treating.update_patient(own.id, chart).await.unwrap();
    assert_eq!(updated.health_summary.heart_rate.as_deref(), Some("64"));

    let mine = h.gateway.scope(&walk_in).get_patient(own.id).await.unwrap();
    assert_eq!(mine.profile.health_summary.heart_rate.as_deref(), Some("64"));
}

#[tokio::test]
async fn patients_only_see_their_own_records() {
    let h = setup().await;
    let (_, admin) = hospital(&h, "Alpha").await;
    let (doc, _) = doctor(&h, &admin, "doc@alpha.test").await;
    let (p1, p1_claims) = patient(&h, &admin, "one@alpha.test").await;
    let (p2, _) = patient(&h, &admin, "two@alpha.test").await;

    let staff = h.gateway.scope(&admin);
    let mine: Appointment = staff.create(appointment(&p1, &doc)).await.unwrap();
    let theirs: Appointment = staff.create(appointment(&p2, &doc)).await.unwrap();

    let me = h.gateway.scope(&p1_claims);
    let listed = me
        .list::<Appointment>(RecordQuery::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].id, mine.id);

    let snooping = me
        .list::<Appointment>(
            RecordQuery {
                patient_id: Some(p2.id),
                doctor_id: None,
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(snooping.total, 0);

    let err = me.get::<Appointment>(theirs.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    assert_eq!(me.get::<Appointment>(mine.id).await.unwrap().id, mine.id);

    let err = me.get_patient(p2.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    assert_eq!(me.get_patient(p1.id).await.unwrap().profile.id, p1.id);
}

#[tokio::test]
async fn doctor_references_must_share_the_hospital() {
    let h = setup().await;
    let (a, admin_a) = hospital(&h, "Alpha").await;
    let (b, admin_b) = hospital(&h, "Beta").await;
    let (pat, _) = patient(&h, &admin_a, "pat@alpha.test").await;
    let (foreign_doc, _) = doctor(&h, &admin_b, "doc@beta.test").await;

    let err = h
        .gateway
        .scope(&admin_a)
        .create::<Appointment>(appointment(&pat, &foreign_doc))
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::CrossTenantReference { .. }));

    // Unaffiliated patients book into the doctor's hospital.
    let registered = h
        .gateway
        .credentials()
        .register(Registration {
            name: "Walk In".into(),
            email: "walkin@example.com".into(),
            password: "walk-in-password-123".into(),
            role: Role::Patient,
            tenant_id: None,
            contact: None,
            extras: ProfileExtras::Patient {
                health_summary: HealthSummary::default(),
            },
        })
        .await
        .unwrap();
    let Some(RoleProfile::Patient(own)) = registered.profile else {
        panic!("expected a patient profile");
    };
    let walk_in = claims_for(&registered.principal);
    assert_eq!(walk_in.tenant, None);

    // The draft names someone else; the facade books for the caller.
    let booked: Appointment = h
        .gateway
        .scope(&walk_in)
        .create(appointment(&pat, &foreign_doc))
        .await
        .unwrap();
    assert_eq!(booked.tenant_id, b.id);
    assert_eq!(booked.patient_id, own.id);
    assert_ne!(booked.tenant_id, a.id);

    let missing = DoctorProfile {
        id: Uuid::new_v4(),
        ..foreign_doc.clone()
    };
    let err = h
        .gateway
        .scope(&admin_a)
        .create::<Appointment>(appointment(&pat, &missing))
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Validation { .. }));
}

#[tokio::test]
async fn prescriptions_belong_to_the_prescribing_doctor() {
    let h = setup().await;
    let (_, admin) = hospital(&h, "Alpha").await;
    let (doc1, doc1_claims) = doctor(&h, &admin, "one@alpha.test").await;
    let (doc2, doc2_claims) = doctor(&h, &admin, "two@alpha.test").await;
    let (pat, pat_claims) = patient(&h, &admin, "pat@alpha.test").await;

    let err = h
        .gateway
        .scope(&doc1_claims)
        .create::<Prescription>(prescription(&pat, &doc2))
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Forbidden { .. }));

    let rx: Prescription = h
        .gateway
        .scope(&doc1_claims)
        .create(prescription(&pat, &doc1))
        .await
        .unwrap();

    let other = h.gateway.scope(&doc2_claims);
    let err = other.get::<Prescription>(rx.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    let patch = UpdatePrescription {
        status: Some(PrescriptionStatus::Ready),
        ..Default::default()
    };
    let err = other
        .update::<Prescription>(rx.id, patch.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Forbidden { .. }));

    let err = h
        .gateway
        .scope(&admin)
        .get::<Prescription>(rx.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Forbidden { .. }));

    let updated: Prescription = h
        .gateway
        .scope(&doc1_claims)
        .update(rx.id, patch)
        .await
        .unwrap();
    assert_eq!(updated.status, PrescriptionStatus::Ready);

    let seen: Prescription = h.gateway.scope(&pat_claims).get(rx.id).await.unwrap();
    assert_eq!(seen.medication, "Amoxicillin 500mg");
}

#[tokio::test]
async fn patch_rules_limit_updates() {
    let h = setup().await;
    let (tenant, admin) = hospital(&h, "Alpha").await;
    let (doc, doc_claims) = doctor(&h, &admin, "doc@alpha.test").await;
    let (pat, _) = patient(&h, &admin, "pat@alpha.test").await;

    let appt: Appointment = h
        .gateway
        .scope(&admin)
        .create(appointment(&pat, &doc))
        .await
        .unwrap();

    let err = h
        .gateway
        .scope(&doc_claims)
        .update::<Appointment>(
            appt.id,
            UpdateAppointment {
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Forbidden { .. }));

    let err = h
        .gateway
        .scope(&admin)
        .update::<Appointment>(appt.id, UpdateAppointment::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Validation { .. }));

    let report: LabReport = h
        .gateway
        .scope(&doc_claims)
        .create(CreateLabReport {
            patient_id: pat.id,
            doctor_id: Some(doc.id),
            test: "Full blood count".into(),
            date: "2024-06-02".into(),
            status: LabReportStatus::Pending,
            result: None,
        })
        .await
        .unwrap();
    assert_eq!(report.tenant_id, tenant.id);

    let updated = h
        .gateway
        .scope(&doc_claims)
        .update_patient(
            pat.id,
            UpdatePatientProfile {
                health_summary: Some(HealthSummary {
                    blood_pressure: Some("120/80".into()),
                    ..Default::default()
                }),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.health_summary.blood_pressure.as_deref(), Some("120/80"));

    let renamed = h
        .gateway
        .scope(&h.root)
        .update_tenant(
            tenant.id,
            UpdateTenant {
                name: Some("Alpha General".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Alpha General");
}

#[tokio::test]
async fn doctors_edit_only_their_own_profile() {
    let h = setup().await;
    let (tenant, admin) = hospital(&h, "Alpha").await;
    let (doc1, doc1_claims) = doctor(&h, &admin, "one@alpha.test").await;
    let (doc2, doc2_claims) = doctor(&h, &admin, "two@alpha.test").await;

    let view = h
        .gateway
        .scope(&doc1_claims)
        .update_doctor(
            doc1.id,
            UpdateDoctorProfile {
                department: Some("Cardiology".into()),
                contact: Some("+44 20 7946 0000".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(view.profile.department.as_deref(), Some("Cardiology"));
    assert_eq!(view.principal.contact.as_deref(), Some("+44 20 7946 0000"));

    let err = h
        .gateway
        .scope(&doc1_claims)
        .update_doctor(
            doc2.id,
            UpdateDoctorProfile {
                specialty: Some("Nothing".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Forbidden { .. }));

    let err = h
        .gateway
        .scope(&doc2_claims)
        .get_doctor(doc1.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    // A rejected profile patch must not leave the contact change behind.
    let err = h
        .gateway
        .scope(&doc2_claims)
        .update_doctor(
            doc2.id,
            UpdateDoctorProfile {
                specialty: Some("   ".into()),
                contact: Some("+44 20 7946 1111".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Validation { .. }));
    let unchanged = h.gateway.scope(&doc2_claims).get_doctor(doc2.id).await.unwrap();
    assert_eq!(unchanged.principal.contact, None);
    assert_eq!(unchanged.profile.specialty.as_deref(), Some("Diagnostics"));

    let view = h
        .gateway
        .scope(&doc2_claims)
        .update_doctor(
            doc2.id,
            UpdateDoctorProfile {
                contact: Some("+44 20 7946 1111".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(view.principal.contact.as_deref(), Some("+44 20 7946 1111"));
    assert_eq!(view.profile.specialty.as_deref(), Some("Diagnostics"));

    // Doctors are still listable by colleagues.
    let listed = h
        .gateway
        .scope(&doc2_claims)
        .list_doctors(Some(tenant.id), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 2);
}

#[tokio::test]
async fn doctor_listing_needs_a_hospital() {
    let h = setup().await;
    let (a, admin_a) = hospital(&h, "Alpha").await;
    let (b, _) = hospital(&h, "Beta").await;
    doctor(&h, &admin_a, "doc@alpha.test").await;

    let err = h
        .gateway
        .scope(&admin_a)
        .list_doctors(Some(b.id), Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Forbidden { .. }));

    let registered = h
        .gateway
        .credentials()
        .register(Registration {
            name: "Browsing".into(),
            email: "browse@example.com".into(),
            password: "browsing-password-123".into(),
            role: Role::Patient,
            tenant_id: None,
            contact: None,
            extras: ProfileExtras::Patient {
                health_summary: HealthSummary::default(),
            },
        })
        .await
        .unwrap();
    let browsing_claims = claims_for(&registered.principal);
    let browsing = h.gateway.scope(&browsing_claims);

    let err = browsing
        .list_doctors(None, Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::Validation { .. }));

    let listed = browsing
        .list_doctors(Some(a.id), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
}

#[tokio::test]
async fn deleting_a_hospital_removes_admins_and_keeps_doctors() {
    let h = setup().await;
    let (tenant, admin) = hospital(&h, "Alpha").await;
    let (doc, _) = doctor(&h, &admin, "doc@alpha.test").await;

    let root = h.gateway.scope(&h.root);
    root.delete_tenant(tenant.id).await.unwrap();

    let err = root.get_tenant(tenant.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    assert_eq!(
        root.list_admins(Some(tenant.id), Pagination::default())
            .await
            .unwrap()
            .total,
        0
    );

    let err = h.repos.principals().get_by_id(admin.sub).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
    let kept = h.repos.principals().get_by_id(doc.principal_id).await.unwrap();
    assert_eq!(kept.tenant_id, Some(tenant.id));

    let err = root.delete_tenant(tenant.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));
}

#[tokio::test]
async fn missing_or_stale_sessions_are_rejected() {
    let h = setup().await;

    let err = h
        .gateway
        .anonymous()
        .list_tenants(Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::AuthenticationFailed { .. }));

    let mut expired = h.root.clone();
    expired.exp = Utc::now().timestamp() - 1;
    let err = h
        .gateway
        .scope(&expired)
        .list_tenants(Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::AuthenticationFailed { .. }));

    let mut rotating = h.root.clone();
    rotating.must_rotate = true;
    let err = h
        .gateway
        .scope(&rotating)
        .list_tenants(Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedsyncError::PasswordRotationRequired));
}

#[tokio::test]
async fn account_lifecycle_through_the_facade() {
    let h = setup().await;
    let (tenant, admin) = hospital(&h, "Alpha").await;
    let (doc, _) = doctor(&h, &admin, "doc@alpha.test").await;
    let (pat, _) = patient(&h, &admin, "pat@alpha.test").await;
    let root = h.gateway.scope(&h.root);

    let renamed = root
        .update_admin(
            admin.sub,
            medsync_core::models::principal::UpdatePrincipal {
                name: Some("Head of Admin".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Head of Admin");
    assert_eq!(renamed.tenant_id, Some(tenant.id));

    // Doctor accounts are not administrators.
    let err = root.get_admin(doc.principal_id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    let staff = h.gateway.scope(&admin);
    staff.delete_patient(pat.id).await.unwrap();
    let err = staff.get_patient(pat.id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    staff.delete_doctor(doc.id).await.unwrap();
    let err = h.repos.principals().get_by_id(doc.principal_id).await.unwrap_err();
    assert!(matches!(err, MedsyncError::NotFound { .. }));

    root.delete_admin(admin.sub).await.unwrap();
    assert_eq!(
        root.list_admins(Some(tenant.id), Pagination::default())
            .await
            .unwrap()
            .total,
        0
    );
}
