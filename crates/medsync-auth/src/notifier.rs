//! Out-of-band delivery of one-time credentials.

use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Error)]
#[error("delivery to {to} failed: {reason}")]
pub struct DeliveryError {
    pub to: String,
    pub reason: String,
}

/// Sends a message to an account holder. Implementations own transport,
/// retries and templates; callers treat dispatch as fire-and-forget.
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Records the dispatch in the log without the message body, which holds a
/// plaintext password.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), DeliveryError> {
        info!(to = %to, subject = %subject, "Credential notification dispatched");
        Ok(())
    }
}

/// A message captured by [`OutboxNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message in memory. Useful for local development and tests.
#[derive(Debug, Default)]
pub struct OutboxNotifier {
    messages: Mutex<Vec<OutboxMessage>>,
    fail_with: Option<String>,
}

impl OutboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every dispatch fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail_with: Some(reason.into()),
        }
    }

    pub fn messages(&self) -> Vec<OutboxMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// The most recent message sent to `to`.
    pub fn last_to(&self, to: &str) -> Option<OutboxMessage> {
        self.messages().into_iter().rev().find(|m| m.to == to)
    }
}

impl Notifier for OutboxNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        if let Some(reason) = &self.fail_with {
            return Err(DeliveryError {
                to: to.to_string(),
                reason: reason.clone(),
            });
        }
        let mut messages = self.messages.lock().map_err(|_| DeliveryError {
            to: to.to_string(),
            reason: "outbox lock poisoned".into(),
        })?;
        messages.push(OutboxMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

impl<N: Notifier> Notifier for std::sync::Arc<N> {
    fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        (**self).send(to, subject, body)
    }
}
