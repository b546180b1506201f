use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::accounts::AccountFlow;
use crate::config::GatehouseConfig;
use crate::error::GatehouseError;
use crate::fields::{append_unique, remove_matching};
use crate::gate::{Admission, AuthorizationGate};
use crate::path::ResourcePath;
use crate::roles::{grant_roles, recall_roles, role_list};
use crate::routes::OperationRoutes;
use crate::traits::{KeyChecker, MailTransport, PasswordHasher, Storage, TokenIssuer};
use crate::types::{
    ITEMS_FIELD, MESSAGE_FIELD, Operation, ROLES_FIELD, Record, Request, Response, Subject,
};

/// The external services the engine delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub keys: Arc<dyn KeyChecker>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub passwords: Arc<dyn PasswordHasher>,
    pub mailer: Arc<dyn MailTransport>,
}

/// The main engine handle. Cloneable and thread-safe.
#[derive(Clone)]
pub struct Gatehouse {
    config: Arc<GatehouseConfig>,
    storage: Arc<dyn Storage>,
    gate: AuthorizationGate,
    accounts: AccountFlow,
    routes: Arc<OperationRoutes>,
}

impl Gatehouse {
    pub fn new(
        config: GatehouseConfig,
        collaborators: Collaborators,
    ) -> Result<Self, GatehouseError> {
        let routes = OperationRoutes::defaults()?;
        let config = Arc::new(config);
        let Collaborators {
            storage,
            keys,
            tokens,
            passwords,
            mailer,
        } = collaborators;

        info!(
            event = "Gatehouse",
            phase = "Initialized",
            users_collection = config.users_collection.as_str(),
            reset_password_configured = config.reset_password.is_some()
        );

        Ok(Self {
            accounts: AccountFlow::new(
                Arc::clone(&config),
                Arc::clone(&storage),
                tokens,
                passwords,
                mailer,
            ),
            gate: AuthorizationGate::new(keys),
            storage,
            routes: Arc::new(routes),
            config,
        })
    }

    pub fn config(&self) -> &GatehouseConfig {
        &self.config
    }

    pub fn routes(&self) -> &OperationRoutes {
        &self.routes
    }

    pub fn accounts(&self) -> &AccountFlow {
        &self.accounts
    }

    /// Resolve the request path to an operation and run it.
    pub fn dispatch(
        &self,
        subject: &Subject,
        request: &Request,
    ) -> Result<Response, GatehouseError> {
        let Some((operation, _)) = self.routes.resolve(&request.path) else {
            debug!(event = "Dispatch", phase = "Unresolved", path = request.path.as_str());
            return Err(GatehouseError::NotFound(format!(
                "No operation answers on '{}'.",
                request.path
            )));
        };

        debug!(
            event = "Dispatch",
            phase = "Resolved",
            path = request.path.as_str(),
            operation = %operation
        );

        match operation {
            Operation::GrantRole => self.grant_role(subject, request),
            Operation::RecallRole => self.recall_role(subject, request),
            Operation::Append => self.append(subject, request),
            Operation::Remove => self.remove(subject, request),
            Operation::Register => self.register(request),
            Operation::Login => self.login(request),
            Operation::ChangePassword => self.change_password(subject, request),
            Operation::ResetPassword => self.reset_password(request),
        }
    }

    /// Add roles to a user, provided the caller holds every one of them.
    pub fn grant_role(
        &self,
        subject: &Subject,
        request: &Request,
    ) -> Result<Response, GatehouseError> {
        let (target, requested) = self.admit_role_change(Operation::GrantRole, subject, request)?;

        let account = self.storage.get(&self.config.users_collection, target.id())?;
        let existing = match account.get(ROLES_FIELD) {
            Some(value) => role_list(value)?,
            None => Vec::new(),
        };
        let roles = grant_roles(&existing, &requested);

        self.store_roles(Operation::GrantRole, target.id(), roles)
    }

    /// Take roles away from a user, provided the caller holds every one of them.
    pub fn recall_role(
        &self,
        subject: &Subject,
        request: &Request,
    ) -> Result<Response, GatehouseError> {
        let (target, requested) = self.admit_role_change(Operation::RecallRole, subject, request)?;

        let account = self.storage.get(&self.config.users_collection, target.id())?;
        let Some(existing) = account.get(ROLES_FIELD) else {
            debug!(
                event = "RoleChange",
                phase = "Skipped",
                operation = %Operation::RecallRole,
                id = target.id()
            );
            let mut body = Record::new();
            body.insert(
                MESSAGE_FIELD.to_string(),
                Value::from("User doesn't have any role info. Not updating anything."),
            );
            return Ok(Response::ok(body));
        };
        let roles = recall_roles(&role_list(existing)?, &requested);

        self.store_roles(Operation::RecallRole, target.id(), roles)
    }

    /// Add every new item to an array field.
    pub fn append(&self, subject: &Subject, request: &Request) -> Result<Response, GatehouseError> {
        self.mutate_field(Operation::Append, subject, request, append_unique)
    }

    /// Drop every matching item from an array field.
    pub fn remove(&self, subject: &Subject, request: &Request) -> Result<Response, GatehouseError> {
        self.mutate_field(Operation::Remove, subject, request, remove_matching)
    }

    pub fn register(&self, request: &Request) -> Result<Response, GatehouseError> {
        self.accounts.register(request)
    }

    pub fn login(&self, request: &Request) -> Result<Response, GatehouseError> {
        self.accounts.login(request)
    }

    pub fn change_password(
        &self,
        subject: &Subject,
        request: &Request,
    ) -> Result<Response, GatehouseError> {
        self.accounts.change_password(subject, request)
    }

    pub fn reset_password(&self, request: &Request) -> Result<Response, GatehouseError> {
        self.accounts.reset_password(request)
    }

    fn admit_role_change(
        &self,
        operation: Operation,
        subject: &Subject,
        request: &Request,
    ) -> Result<(ResourcePath, Vec<String>), GatehouseError> {
        let admission = self.gate.admit(operation, subject, &request.headers)?;
        let target = ResourcePath::parse(&request.path, operation, &self.config.users_collection)?;
        let body = require_body(operation, request)?;

        let requested = body.get(ROLES_FIELD).ok_or_else(|| {
            GatehouseError::MalformedRequest(format!(
                "{} request must contain list of roles in '{ROLES_FIELD}' field in body.",
                operation.label()
            ))
        })?;
        let requested = role_list(requested)?;

        if admission == Admission::Subject {
            AuthorizationGate::require_roles(operation, subject, &requested)?;
        }

        Ok((target, requested))
    }

    fn store_roles(
        &self,
        operation: Operation,
        id: &str,
        roles: Vec<String>,
    ) -> Result<Response, GatehouseError> {
        debug!(
            event = "RoleChange",
            phase = "Computed",
            operation = %operation,
            id = id,
            roles = ?roles
        );

        let computed = Value::from(roles);
        let mut fields = Record::new();
        fields.insert(ROLES_FIELD.to_string(), computed.clone());

        let mutation = self
            .storage
            .update(&self.config.users_collection, id, fields)?;
        Ok(mirrored(mutation.record, ROLES_FIELD, computed)
            .with_side_channel(mutation.side_effects))
    }

    fn mutate_field(
        &self,
        operation: Operation,
        subject: &Subject,
        request: &Request,
        compute: impl FnOnce(&str, Option<&Value>, &[Value]) -> Result<Vec<Value>, GatehouseError>,
    ) -> Result<Response, GatehouseError> {
        self.gate.admit(operation, subject, &request.headers)?;
        let target = ResourcePath::parse(&request.path, operation, &self.config.users_collection)?;
        let body = require_body(operation, request)?;

        let items = body.get(ITEMS_FIELD).ok_or_else(|| {
            GatehouseError::MalformedRequest(format!(
                "{} request must contain list of items in '{ITEMS_FIELD}' field in body.",
                operation.label()
            ))
        })?;
        let items = items.as_array().ok_or_else(|| {
            GatehouseError::MalformedRequest(format!(
                "The field '{ITEMS_FIELD}' must be a list."
            ))
        })?;

        let field = target.field().unwrap_or_default();
        let entity = self.storage.get(target.class(), target.id())?;
        let computed = Value::Array(compute(field, entity.get(field), items)?);

        debug!(
            event = "FieldChange",
            phase = "Computed",
            operation = %operation,
            class = target.class(),
            id = target.id(),
            field = field,
            value = %computed
        );

        let mut fields = Record::new();
        fields.insert(field.to_string(), computed.clone());
        let mutation = self.storage.update(target.class(), target.id(), fields)?;
        Ok(mirrored(mutation.record, field, computed).with_side_channel(mutation.side_effects))
    }
}

fn require_body(operation: Operation, request: &Request) -> Result<&Record, GatehouseError> {
    request.body.as_ref().ok_or_else(|| {
        GatehouseError::MalformedRequest(format!(
            "{} request must contain body.",
            operation.label()
        ))
    })
}

/// The storage echo with `field` overwritten by the value this core computed.
fn mirrored(mut echo: Record, field: &str, computed: Value) -> Response {
    echo.insert(field.to_string(), computed);
    Response::ok(echo)
}

#[cfg(test)]
mod tests;
