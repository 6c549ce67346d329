//! MedSync Auth: account provisioning, password verification and signed
//! session tokens.

pub mod config;
pub mod credential;
pub mod error;
pub mod notifier;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use credential::{
    CredentialIssuer, DeliveryStatus, ProvisionRequest, Provisioned, Registered, Registration,
};
pub use error::AuthError;
pub use notifier::{DeliveryError, Notifier, OutboxMessage, OutboxNotifier, TracingNotifier};
pub use service::{AuthenticatedSession, SessionIssuer};
