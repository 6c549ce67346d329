//! MedSync Core: domain models, error taxonomy and the repository traits
//! that form the storage seam.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{MedsyncError, MedsyncResult};
