//! Domain models for MedSync.
//!
//! These are the core types shared across all crates.

pub mod access;
pub mod principal;
pub mod profile;
pub mod record;
pub mod role;
pub mod session;
pub mod tenant;
