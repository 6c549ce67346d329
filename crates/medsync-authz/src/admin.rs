//! Hospital and account administration through a [`Scope`].

use medsync_auth::credential::{ProvisionRequest, Provisioned};
use medsync_auth::notifier::Notifier;
use medsync_core::error::{MedsyncError, MedsyncResult};
use medsync_core::models::access::{Action, Operation, ResourceKind};
use medsync_core::models::principal::{Principal, PrincipalFilter, UpdatePrincipal};
use medsync_core::models::role::Role;
use medsync_core::models::tenant::{CreateTenant, Tenant, UpdateTenant};
use medsync_core::repository::{
    PaginatedResult, Pagination, PrincipalRepository, Repositories, TenantRepository,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::evaluator::Target;
use crate::policy;
use crate::scope::Scope;

/// First administrator of a new hospital.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAdmin {
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
}

fn tenant_fields(input: &UpdateTenant) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if input.name.is_some() {
        fields.push("name");
    }
    if input.address.is_some() {
        fields.push("address");
    }
    if input.contact.is_some() {
        fields.push("contact");
    }
    fields
}

pub(crate) fn principal_fields(input: &UpdatePrincipal) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if input.name.is_some() {
        fields.push("name");
    }
    if input.email.is_some() {
        fields.push("email");
    }
    if input.contact.is_some() {
        fields.push("contact");
    }
    fields
}

impl<S: Repositories, N: Notifier> Scope<'_, S, N> {
    // -----------------------------------------------------------------------
    // Hospitals
    // -----------------------------------------------------------------------

    pub async fn create_tenant(&self, input: CreateTenant) -> MedsyncResult<Tenant> {
        let claims = self.preflight(Action::new(ResourceKind::Tenant, Operation::Create))?;
        if input.name.trim().is_empty() {
            return Err(MedsyncError::validation("hospital name must not be empty"));
        }
        let tenant = self.repos().tenants().create(input).await?;
        info!(tenant_id = %tenant.id, principal_id = %claims.sub, "Hospital created");
        Ok(tenant)
    }

    /// Create a hospital and provision its first administrator. The
    /// hospital is removed again if the administrator cannot be created.
    pub async fn create_tenant_with_admin(
        &self,
        input: CreateTenant,
        admin: NewAdmin,
    ) -> MedsyncResult<(Tenant, Provisioned)> {
        self.preflight(Action::new(ResourceKind::AdminAccount, Operation::Create))?;
        let tenant = self.create_tenant(input).await?;

        let request = ProvisionRequest {
            name: admin.name,
            email: admin.email,
            role: Role::Admin,
            tenant_id: Some(tenant.id),
            contact: admin.contact,
            extras: Default::default(),
        };
        match self.credentials().provision_account(request).await {
            Ok(provisioned) => Ok((tenant, provisioned)),
            Err(e) => {
                warn!(tenant_id = %tenant.id, error = %e, "Administrator provisioning failed, removing hospital");
                if let Err(cleanup) = self.repos().tenants().delete(tenant.id).await {
                    warn!(tenant_id = %tenant.id, error = %cleanup, "Hospital cleanup failed");
                }
                Err(e)
            }
        }
    }

    pub async fn get_tenant(&self, id: Uuid) -> MedsyncResult<Tenant> {
        self.preflight(Action::new(ResourceKind::Tenant, Operation::Read))?;
        self.repos().tenants().get_by_id(id).await
    }

    pub async fn list_tenants(&self, pagination: Pagination) -> MedsyncResult<PaginatedResult<Tenant>> {
        self.preflight(Action::new(ResourceKind::Tenant, Operation::List))?;
        self.repos().tenants().list(pagination).await
    }

    pub async fn update_tenant(&self, id: Uuid, input: UpdateTenant) -> MedsyncResult<Tenant> {
        let claims = self.preflight(Action::new(ResourceKind::Tenant, Operation::Update))?;
        policy::check_patch(ResourceKind::Tenant, claims.role, &tenant_fields(&input))?;
        if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(MedsyncError::validation("hospital name must not be empty"));
        }
        let tenant = self.repos().tenants().update(id, input).await?;
        info!(tenant_id = %id, principal_id = %claims.sub, "Hospital updated");
        Ok(tenant)
    }

    /// Delete a hospital together with its administrator accounts.
    ///
    /// Doctor accounts and clinical records keep their dangling hospital
    /// reference and stay unreachable through any hospital-bound scope.
    pub async fn delete_tenant(&self, id: Uuid) -> MedsyncResult<()> {
        let claims = self.preflight(Action::new(ResourceKind::Tenant, Operation::Delete))?;
        self.repos().tenants().get_by_id(id).await?;

        let admins = self
            .repos()
            .principals()
            .delete_by_tenant(id, Role::Admin)
            .await?;
        self.repos().tenants().delete(id).await?;
        info!(
            tenant_id = %id,
            admins_removed = admins,
            principal_id = %claims.sub,
            "Hospital deleted"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    /// Create an account with a system-issued password.
    ///
    /// Super-admins provision administrators; administrators provision
    /// doctors and patients into their own hospital.
    pub async fn provision(&self, mut request: ProvisionRequest) -> MedsyncResult<Provisioned> {
        let kind = match request.role {
            Role::Admin => ResourceKind::AdminAccount,
            Role::Doctor => ResourceKind::Doctor,
            Role::Patient => ResourceKind::Patient,
            Role::SuperAdmin => {
                return Err(MedsyncError::InvalidRole {
                    role: Role::SuperAdmin.to_string(),
                });
            }
        };
        let claims = self.preflight(Action::new(kind, Operation::Create))?;

        if let Some(own) = claims.tenant {
            match request.tenant_id {
                Some(requested) if requested != own => {
                    return Err(MedsyncError::CrossTenantReference {
                        entity: "tenant".into(),
                    });
                }
                _ => request.tenant_id = Some(own),
            }
        }

        let provisioned = self.credentials().provision_account(request).await?;
        info!(
            account_id = %provisioned.principal.id,
            role = %provisioned.principal.role,
            principal_id = %claims.sub,
            "Account provisioned"
        );
        Ok(provisioned)
    }

    /// Administrator accounts, optionally limited to one hospital.
    pub async fn list_admins(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> MedsyncResult<PaginatedResult<Principal>> {
        self.preflight(Action::new(ResourceKind::AdminAccount, Operation::List))?;
        let filter = PrincipalFilter {
            tenant_id,
            role: Some(Role::Admin),
        };
        self.repos().principals().list(filter, pagination).await
    }

    async fn load_admin(&self, action: Action, id: Uuid) -> MedsyncResult<Principal> {
        self.preflight(action)?;
        let principal = self.repos().principals().get_by_id(id).await?;
        if principal.role != Role::Admin {
            return Err(MedsyncError::not_found(ResourceKind::AdminAccount.as_str(), id));
        }
        let target = Target {
            tenant: principal.tenant_id,
            subject: Some(principal.id),
            ..Default::default()
        };
        self.authorize(action, &target, id)?;
        Ok(principal)
    }

    pub async fn get_admin(&self, id: Uuid) -> MedsyncResult<Principal> {
        self.load_admin(Action::new(ResourceKind::AdminAccount, Operation::Read), id)
            .await
    }

    pub async fn update_admin(&self, id: Uuid, input: UpdatePrincipal) -> MedsyncResult<Principal> {
        let action = Action::new(ResourceKind::AdminAccount, Operation::Update);
        let claims = self.preflight(action)?;
        policy::check_patch(ResourceKind::AdminAccount, claims.role, &principal_fields(&input))?;
        self.load_admin(action, id).await?;

        let principal = self.repos().principals().update(id, input).await?;
        info!(account_id = %id, principal_id = %claims.sub, "Administrator updated");
        Ok(principal)
    }

    pub async fn delete_admin(&self, id: Uuid) -> MedsyncResult<()> {
        let action = Action::new(ResourceKind::AdminAccount, Operation::Delete);
        let claims = self.preflight(action)?;
        self.load_admin(action, id).await?;

        self.repos().principals().delete(id).await?;
        info!(account_id = %id, principal_id = %claims.sub, "Administrator deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Credentials
    // -----------------------------------------------------------------------

    /// Replace the caller's own password. Allowed while rotation is pending.
    pub async fn rotate_password(&self, new_password: &str) -> MedsyncResult<()> {
        let action = Action::new(ResourceKind::Credential, Operation::Update);
        let claims = self.preflight(action)?;
        let target = Target {
            subject: Some(claims.sub),
            ..Default::default()
        };
        self.authorize(action, &target, claims.sub)?;
        self.credentials()
            .rotate_password(claims.sub, new_password)
            .await
    }
}
