//! SurrealDB implementation of [`PrincipalRepository`].
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash. An optional pepper (server-side secret) can be
//! provided at construction time.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use medsync_core::error::MedsyncResult;
use medsync_core::models::principal::{
    CreatePrincipal, Principal, PrincipalFilter, UpdatePrincipal, normalize_email, validate_email,
};
use medsync_core::models::role::Role;
use medsync_core::repository::{PaginatedResult, Pagination, PrincipalRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{info, warn};
use uuid::Uuid;

use super::CountRow;
use crate::error::{DbError, parse_opt_uuid, parse_uuid};

#[derive(Debug, SurrealValue)]
struct PrincipalRow {
    record_id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    tenant_id: Option<String>,
    contact: Option<String>,
    active: bool,
    must_rotate_password: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PrincipalRow {
    fn try_into_principal(self) -> Result<Principal, DbError> {
        let role: Role = self.role.parse().map_err(|e| {
            warn!(principal_id = %self.record_id, error = %e, "Stored account has an unusable role");
            DbError::Role(self.role.clone())
        })?;
        Ok(Principal {
            id: parse_uuid("principal", &self.record_id)?,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role,
            tenant_id: parse_opt_uuid("tenant", self.tenant_id.as_deref())?,
            contact: self.contact,
            active: self.active,
            must_rotate_password: self.must_rotate_password,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_ONE: &str =
    "SELECT meta::id(id) AS record_id, * FROM type::record('principal', $id)";

/// Hash a password with Argon2id using OWASP-recommended parameters.
///
/// If a pepper is provided, it is prepended to the password before
/// hashing. The salt is randomly generated for each call.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Hash(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Hash(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the Principal repository.
#[derive(Clone)]
pub struct SurrealPrincipalRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealPrincipalRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    async fn fetch_one(&self, id_str: String) -> Result<Principal, DbError> {
        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await?;
        let rows: Vec<PrincipalRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;
        row.try_into_principal()
    }
}

impl<C: Connection> PrincipalRepository for SurrealPrincipalRepository<C> {
    async fn create(&self, input: CreatePrincipal) -> MedsyncResult<Principal> {
        validate_email(&input.email)?;
        let id_str = Uuid::new_v4().to_string();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        let result = self
            .db
            .query(format!(
                "CREATE type::record('principal', $id) SET \
                 name = $name, email = $email, \
                 password_hash = $password_hash, \
                 role = $role, tenant_id = $tenant_id, \
                 contact = $contact, active = true, \
                 must_rotate_password = $must_rotate; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("email", normalize_email(&input.email)))
            .bind(("password_hash", password_hash))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("tenant_id", input.tenant_id.map(|t| t.to_string())))
            .bind(("contact", input.contact))
            .bind(("must_rotate", input.must_rotate_password))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<PrincipalRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        Ok(row.try_into_principal()?)
    }

    async fn get_by_id(&self, id: Uuid) -> MedsyncResult<Principal> {
        Ok(self.fetch_one(id.to_string()).await?)
    }

    async fn get_by_email(&self, email: &str) -> MedsyncResult<Principal> {
        let email = normalize_email(email);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM principal \
                 WHERE email = $email",
            )
            .bind(("email", email.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: format!("email={email}"),
        })?;

        Ok(row.try_into_principal()?)
    }

    async fn update(&self, id: Uuid, input: UpdatePrincipal) -> MedsyncResult<Principal> {
        self.get_by_id(id).await?;

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if let Some(email) = &input.email {
            validate_email(email)?;
            sets.push("email = $email");
        }
        if input.contact.is_some() {
            sets.push("contact = $contact");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('principal', $id) SET {}; {SELECT_ONE};",
            sets.join(", ")
        );

        let id_str = id.to_string();
        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", normalize_email(&email)));
        }
        if let Some(contact) = input.contact {
            builder = builder.bind(("contact", contact));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<PrincipalRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        Ok(row.try_into_principal()?)
    }

    async fn update_password(&self, id: Uuid, password: &str) -> MedsyncResult<Principal> {
        self.get_by_id(id).await?;
        let password_hash = hash_password(password, self.pepper.as_deref())?;

        self.db
            .query(
                "UPDATE type::record('principal', $id) SET \
                 password_hash = $password_hash, \
                 must_rotate_password = false, \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("password_hash", password_hash))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;

        Ok(self.fetch_one(id.to_string()).await?)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> MedsyncResult<Principal> {
        self.get_by_id(id).await?;

        self.db
            .query(
                "UPDATE type::record('principal', $id) SET \
                 active = $active, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;

        info!(principal_id = %id, active, "Account activation changed");
        Ok(self.fetch_one(id.to_string()).await?)
    }

    async fn delete(&self, id: Uuid) -> MedsyncResult<()> {
        // Raw read: an account with a retired role must still be deletable.
        let id_str = id.to_string();
        let mut existing = self
            .db
            .query("SELECT count() AS total FROM type::record('principal', $id) GROUP ALL")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = existing.take(0).map_err(DbError::from)?;
        if count_rows.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::NotFound {
                entity: "principal".into(),
                id: id_str,
            }
            .into());
        }

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE doctor_profile WHERE principal_id = $id; \
                 DELETE patient_profile WHERE principal_id = $id; \
                 DELETE type::record('principal', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;

        Ok(())
    }

    async fn delete_by_tenant(&self, tenant_id: Uuid, role: Role) -> MedsyncResult<u64> {
        let tenant_id_str = tenant_id.to_string();
        let role_str = role.as_str().to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM principal \
                 WHERE tenant_id = $tenant_id AND role = $role GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .bind(("role", role_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 LET $ids = (SELECT VALUE meta::id(id) FROM principal \
                     WHERE tenant_id = $tenant_id AND role = $role); \
                 DELETE doctor_profile WHERE principal_id IN $ids; \
                 DELETE patient_profile WHERE principal_id IN $ids; \
                 DELETE principal WHERE tenant_id = $tenant_id AND role = $role; \
                 COMMIT TRANSACTION;",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("role", role_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;

        Ok(total)
    }

    async fn list(
        &self,
        filter: PrincipalFilter,
        pagination: Pagination,
    ) -> MedsyncResult<PaginatedResult<Principal>> {
        let mut conditions = Vec::new();
        if filter.tenant_id.is_some() {
            conditions.push("tenant_id = $tenant_id");
        }
        if filter.role.is_some() {
            conditions.push("role = $role");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let tenant_id = filter.tenant_id.map(|t| t.to_string());
        let role = filter.role.map(|r| r.as_str().to_string());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM principal {where_clause} GROUP ALL"
            ))
            .bind(("tenant_id", tenant_id.clone()))
            .bind(("role", role.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM principal {where_clause} \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("tenant_id", tenant_id))
            .bind(("role", role))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_principal())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
