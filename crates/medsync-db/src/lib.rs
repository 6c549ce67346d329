//! MedSync Database: SurrealDB connection management, migrations and the
//! raw stores behind the tenant-scoped facade.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations of the `medsync-core` traits
//!   ([`SurrealRepositories`] bundles them)
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{SurrealRepositories, hash_password};
pub use schema::{run_migrations, schema_v1};
