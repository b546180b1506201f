//! Authorization for role and field operations.
//!
//! A request is let through either because its headers carry an override key,
//! or because it comes from an authenticated subject. Role operations further
//! require the subject to already hold every role it hands out or takes away.
//! Entity ACLs are not consulted here.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::GatehouseError;
use crate::traits::KeyChecker;
use crate::types::{Headers, Operation, Subject, eq_fold};

/// How a request got past the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The headers carried an override key; no further checks apply.
    Key,
    /// An authenticated subject; role operations still need [`AuthorizationGate::require_roles`].
    Subject,
}

#[derive(Clone)]
pub struct AuthorizationGate {
    keys: Arc<dyn KeyChecker>,
}

impl AuthorizationGate {
    pub fn new(keys: Arc<dyn KeyChecker>) -> Self {
        Self { keys }
    }

    /// Consult the key checker, falling back to requiring an authenticated subject.
    pub fn admit(
        &self,
        operation: Operation,
        subject: &Subject,
        headers: &Headers,
    ) -> Result<Admission, GatehouseError> {
        if self.keys.check_permissions(headers)? {
            info!(
                event = "Authorization",
                phase = "Admitted",
                operation = %operation,
                by = "key"
            );
            return Ok(Admission::Key);
        }

        if subject.is_anonymous() {
            debug!(
                event = "Authorization",
                phase = "Rejected",
                operation = %operation,
                reason = "anonymous"
            );
            return Err(GatehouseError::AuthenticationRequired(format!(
                "{} request requires an access token.",
                operation.label()
            )));
        }

        debug!(
            event = "Authorization",
            phase = "Admitted",
            operation = %operation,
            by = "subject",
            subject = subject.id().unwrap_or_default()
        );
        Ok(Admission::Subject)
    }

    /// Every requested role must be held by the subject, ignoring case.
    pub fn require_roles(
        operation: Operation,
        subject: &Subject,
        requested: &[String],
    ) -> Result<(), GatehouseError> {
        let Some(held) = subject.roles() else {
            return Err(GatehouseError::InsufficientPermission(
                "Request owner doesn't have any role info.".to_string(),
            ));
        };

        if let Some(missing) = requested
            .iter()
            .find(|role| !held.iter().any(|h| eq_fold(h, role)))
        {
            debug!(
                event = "Authorization",
                phase = "Rejected",
                operation = %operation,
                reason = "role not held",
                role = missing.as_str()
            );
            let verb = match operation {
                Operation::RecallRole => "recall",
                _ => "grant",
            };
            return Err(GatehouseError::InsufficientPermission(format!(
                "Request owner doesn't have enough permissions to {verb} the given roles."
            )));
        }

        Ok(())
    }
}
