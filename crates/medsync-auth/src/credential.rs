//! Credential issuer: account provisioning with system-generated passwords,
//! self-service registration and password rotation.

use std::sync::Arc;

use medsync_core::error::{MedsyncError, MedsyncResult};
use medsync_core::models::principal::{
    CreatePrincipal, Principal, PrincipalFilter, normalize_email, validate_email,
};
use medsync_core::models::profile::{
    CreateDoctorProfile, CreatePatientProfile, ProfileExtras, RoleProfile,
};
use medsync_core::models::role::Role;
use medsync_core::repository::{
    DoctorProfileRepository, Pagination, PatientProfileRepository, PrincipalRepository,
    Repositories, TenantRepository,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::notifier::Notifier;
use crate::password;

/// Input for provisioning an account on someone's behalf.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
    pub contact: Option<String>,
    pub extras: ProfileExtras,
}

/// Input for self-service registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
    pub contact: Option<String>,
    pub extras: ProfileExtras,
}

/// Outcome of handing the one-time password to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    /// The account exists and is usable; only the notification was lost.
    Failed { reason: String },
}

/// A freshly created account. Never carries the plaintext password.
#[derive(Debug, Clone, Serialize)]
pub struct Provisioned {
    pub principal: Principal,
    pub profile: Option<RoleProfile>,
    pub delivery: DeliveryStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    pub principal: Principal,
    pub profile: Option<RoleProfile>,
}

/// Credential issuer.
///
/// Generic over the repository bundle and the notifier so that the auth
/// layer has no dependency on the database crate or a mail transport.
pub struct CredentialIssuer<S: Repositories, N: Notifier> {
    repos: Arc<S>,
    notifier: N,
    config: AuthConfig,
}

impl<S: Repositories, N: Notifier> CredentialIssuer<S, N> {
    pub fn new(repos: Arc<S>, notifier: N, config: AuthConfig) -> Self {
        Self {
            repos,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Create an account with a generated password that must be rotated on
    /// first use, then hand the password to the notifier.
    pub async fn provision_account(&self, request: ProvisionRequest) -> MedsyncResult<Provisioned> {
        if request.role == Role::SuperAdmin {
            return Err(MedsyncError::InvalidRole {
                role: request.role.to_string(),
            });
        }
        self.provision(request).await
    }

    /// Create the first super-admin if no super-admin account exists yet.
    ///
    /// Returns `None` when one is already present.
    pub async fn bootstrap_super_admin(
        &self,
        name: &str,
        email: &str,
    ) -> MedsyncResult<Option<Provisioned>> {
        let existing = self
            .repos
            .principals()
            .list(
                PrincipalFilter {
                    tenant_id: None,
                    role: Some(Role::SuperAdmin),
                },
                Pagination {
                    offset: 0,
                    limit: 1,
                },
            )
            .await?;
        if existing.total > 0 {
            return Ok(None);
        }

        let provisioned = self
            .provision(ProvisionRequest {
                name: name.to_string(),
                email: email.to_string(),
                role: Role::SuperAdmin,
                tenant_id: None,
                contact: None,
                extras: ProfileExtras::None,
            })
            .await?;
        Ok(Some(provisioned))
    }

    /// Self-service sign-up with a caller-chosen password.
    ///
    /// Only patients (optionally affiliated) and doctors (with a hospital)
    /// may register themselves.
    pub async fn register(&self, input: Registration) -> MedsyncResult<Registered> {
        if !matches!(input.role, Role::Patient | Role::Doctor) {
            return Err(MedsyncError::InvalidRole {
                role: input.role.to_string(),
            });
        }
        password::check_policy(&input.password, self.config.min_password_length)?;
        let email = self.check_new_account(&input.email, input.role, input.tenant_id).await?;

        let (principal, profile) = self
            .create_with_profile(
                CreatePrincipal {
                    name: input.name,
                    email,
                    password: input.password,
                    role: input.role,
                    tenant_id: input.tenant_id,
                    contact: input.contact,
                    must_rotate_password: false,
                },
                input.extras,
            )
            .await?;

        info!(principal_id = %principal.id, role = %principal.role, "Account registered");
        Ok(Registered { principal, profile })
    }

    /// Replace a password and clear the must-rotate flag.
    pub async fn rotate_password(&self, principal_id: Uuid, new_password: &str) -> MedsyncResult<()> {
        password::check_policy(new_password, self.config.min_password_length)?;
        self.repos
            .principals()
            .update_password(principal_id, new_password)
            .await?;
        info!(principal_id = %principal_id, "Password rotated");
        Ok(())
    }

    async fn provision(&self, request: ProvisionRequest) -> MedsyncResult<Provisioned> {
        let email = self
            .check_new_account(&request.email, request.role, request.tenant_id)
            .await?;

        let one_time_password = password::generate_password(self.config.generated_password_bytes);

        let (principal, profile) = self
            .create_with_profile(
                CreatePrincipal {
                    name: request.name,
                    email,
                    password: one_time_password.clone(),
                    role: request.role,
                    tenant_id: request.tenant_id,
                    contact: request.contact,
                    must_rotate_password: true,
                },
                request.extras,
            )
            .await?;

        info!(
            principal_id = %principal.id,
            role = %principal.role,
            tenant_id = ?principal.tenant_id,
            "Account provisioned"
        );

        // The account is committed at this point. Delivery problems are
        // reported, never rolled back or retried here.
        let body = format!(
            "Hello {name},\n\n\
             An account with role {role} has been created for you.\n\n\
             Login email: {email}\n\
             Temporary password: {one_time_password}\n\n\
             You will be asked to choose a new password when you first sign in.\n\n\
             MedSync Team",
            name = principal.name,
            role = principal.role,
            email = principal.email,
        );
        let delivery = match self
            .notifier
            .send(&principal.email, "Your MedSync account", &body)
            .await
        {
            Ok(()) => DeliveryStatus::Sent,
            Err(e) => {
                warn!(
                    principal_id = %principal.id,
                    error = %e,
                    "Credential notification failed; account remains provisioned"
                );
                DeliveryStatus::Failed {
                    reason: e.reason,
                }
            }
        };

        Ok(Provisioned {
            principal,
            profile,
            delivery,
        })
    }

    /// Shared pre-creation checks. Returns the normalized email.
    async fn check_new_account(
        &self,
        email: &str,
        role: Role,
        tenant_id: Option<Uuid>,
    ) -> MedsyncResult<String> {
        validate_email(email)?;
        let email = normalize_email(email);

        match (role, tenant_id) {
            (Role::SuperAdmin, Some(_)) => {
                return Err(MedsyncError::validation(
                    "super-admin accounts are not bound to a hospital",
                ));
            }
            (role, None) if role.requires_tenant() => {
                return Err(MedsyncError::MissingTenant {
                    role: role.to_string(),
                });
            }
            _ => {}
        }
        if let Some(tenant_id) = tenant_id {
            self.repos.tenants().get_by_id(tenant_id).await?;
        }

        // Early, friendly rejection. The unique index on email remains the
        // authority when two requests race.
        match self.repos.principals().get_by_email(&email).await {
            Ok(_) => return Err(MedsyncError::DuplicateEmail),
            Err(MedsyncError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        Ok(email)
    }

    /// Create the principal and, for roles that have one, its profile. A
    /// profile failure deletes the principal again.
    async fn create_with_profile(
        &self,
        input: CreatePrincipal,
        extras: ProfileExtras,
    ) -> MedsyncResult<(Principal, Option<RoleProfile>)> {
        let principal = self.repos.principals().create(input).await?;

        let profile = match self.create_profile(&principal, extras).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(
                    principal_id = %principal.id,
                    error = %e,
                    "Profile creation failed; removing account"
                );
                if let Err(cleanup) = self.repos.principals().delete(principal.id).await {
                    warn!(principal_id = %principal.id, error = %cleanup, "Rollback failed");
                }
                return Err(e);
            }
        };
        Ok((principal, profile))
    }

    async fn create_profile(
        &self,
        principal: &Principal,
        extras: ProfileExtras,
    ) -> MedsyncResult<Option<RoleProfile>> {
        match principal.role {
            Role::Doctor => {
                let tenant_id = principal.tenant_id.ok_or_else(|| MedsyncError::MissingTenant {
                    role: principal.role.to_string(),
                })?;
                let (specialty, department) = match extras {
                    ProfileExtras::Doctor {
                        specialty,
                        department,
                    } => (specialty, department),
                    _ => (None, None),
                };
                let doctor = self
                    .repos
                    .doctors()
                    .create(CreateDoctorProfile {
                        principal_id: principal.id,
                        tenant_id,
                        specialty,
                        department,
                    })
                    .await?;
                Ok(Some(RoleProfile::Doctor(doctor)))
            }
            Role::Patient => {
                let health_summary = match extras {
                    ProfileExtras::Patient { health_summary } => health_summary,
                    _ => Default::default(),
                };
                let patient = self
                    .repos
                    .patients()
                    .create(CreatePatientProfile {
                        principal_id: principal.id,
                        tenant_id: principal.tenant_id,
                        health_summary,
                    })
                    .await?;
                Ok(Some(RoleProfile::Patient(patient)))
            }
            Role::SuperAdmin | Role::Admin => Ok(None),
        }
    }
}
