//! MedSync authorization: the declarative access policy, the evaluator
//! that applies it, and the tenant-scoped facade every request goes
//! through to reach the stores.

pub mod admin;
pub mod evaluator;
pub mod policy;
pub mod profiles;
pub mod scope;

pub use admin::NewAdmin;
pub use evaluator::{Denial, Target, Verdict, authorize};
pub use profiles::ProfileView;
pub use scope::{Gateway, Scope};
