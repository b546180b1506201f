//! Account registration, login and password management.

use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GatehouseConfig;
use crate::error::GatehouseError;
use crate::traits::{MailMessage, MailTransport, PasswordHasher, Storage, TokenIssuer};
use crate::types::{
    ACCESS_TOKEN_FIELD, ACL_FIELD, AccessControlEntry, CREATED_AT_FIELD, EMAIL_FIELD, ID_FIELD,
    NEW_PASSWORD_FIELD, PASSWORD_FIELD, QueryParams, Record, Request, Response, Subject,
    UPDATED_AT_FIELD, USERNAME_FIELD, WHERE_PARAM,
};

const FORBIDDEN_REGISTER_FIELDS: [&str; 4] =
    [ID_FIELD, ACL_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

const ACCOUNT_NOT_FOUND: &str = "Account not found.";
const CREDENTIALS_MISMATCH: &str = "Credentials don't match or account doesn't exist.";

/// Credential flows over the users collection.
#[derive(Clone)]
pub struct AccountFlow {
    config: Arc<GatehouseConfig>,
    storage: Arc<dyn Storage>,
    tokens: Arc<dyn TokenIssuer>,
    passwords: Arc<dyn PasswordHasher>,
    mailer: Arc<dyn MailTransport>,
}

impl AccountFlow {
    pub fn new(
        config: Arc<GatehouseConfig>,
        storage: Arc<dyn Storage>,
        tokens: Arc<dyn TokenIssuer>,
        passwords: Arc<dyn PasswordHasher>,
        mailer: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            config,
            storage,
            tokens,
            passwords,
            mailer,
        }
    }

    fn users(&self) -> &str {
        &self.config.users_collection
    }

    /// Look up the account named by the request body.
    ///
    /// The first identity present wins, in the order `username`, `email`,
    /// `facebook.id`, `google.id`.
    pub fn find_account(&self, request: &Request) -> Result<Record, GatehouseError> {
        let body = request.body.clone().unwrap_or_default();
        let Some((key, value)) = identity_of(&body) else {
            return Err(GatehouseError::NotFound(ACCOUNT_NOT_FOUND.to_string()));
        };

        let mut parameters: QueryParams = request.parameters.clone();
        parameters.insert(WHERE_PARAM.to_string(), vec![identity_filter(key, value)?]);

        let results = self.storage.query(self.users(), &parameters)?;
        debug!(
            event = "Account",
            phase = "Lookup",
            key = key,
            matches = results.list.len()
        );
        results
            .list
            .into_iter()
            .next()
            .ok_or_else(|| GatehouseError::NotFound(ACCOUNT_NOT_FOUND.to_string()))
    }

    pub fn register(&self, request: &Request) -> Result<Response, GatehouseError> {
        let mut body = request.body.clone().ok_or_else(|| {
            GatehouseError::MalformedRequest("Register request must contain body.".to_string())
        })?;
        validate_register_fields(&body)?;

        match self.find_account(request) {
            Ok(_) => {
                return Err(GatehouseError::Conflict(
                    "User with same email already exists.".to_string(),
                ));
            }
            Err(GatehouseError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let password = string_field(&body, PASSWORD_FIELD).unwrap_or_default();
        let digest = self.passwords.hash(password)?;
        let id = Uuid::new_v4().simple().to_string();

        body.insert(PASSWORD_FIELD.to_string(), Value::String(digest));
        body.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        body.insert(
            ACL_FIELD.to_string(),
            AccessControlEntry::default_for_owner(&id).to_value()?,
        );

        let created = self.storage.create(self.users(), body)?;
        let mut account = created.record;
        account.remove(PASSWORD_FIELD);

        let token = self.tokens.generate_token(&id, &account)?;
        account.insert(ACCESS_TOKEN_FIELD.to_string(), Value::String(token));

        info!(event = "Account", phase = "Registered", id = id);
        Ok(Response::created(account).with_side_channel(created.side_effects))
    }

    pub fn login(&self, request: &Request) -> Result<Response, GatehouseError> {
        let body = request.body.clone().unwrap_or_default();
        let password = match (body.get(EMAIL_FIELD), body.get(PASSWORD_FIELD)) {
            (Some(_), Some(Value::String(password))) => password.clone(),
            _ => {
                return Err(GatehouseError::MalformedRequest(
                    "Login request must contain email and password.".to_string(),
                ));
            }
        };

        let mut account = self.find_account(request).map_err(|e| match e {
            GatehouseError::NotFound(_) => {
                GatehouseError::AuthenticationRequired(CREDENTIALS_MISMATCH.to_string())
            }
            other => other,
        })?;

        let digest = string_field(&account, PASSWORD_FIELD).unwrap_or_default();
        if !self.passwords.verify(digest, &password) {
            debug!(event = "Account", phase = "LoginRejected");
            return Err(GatehouseError::AuthenticationRequired(
                CREDENTIALS_MISMATCH.to_string(),
            ));
        }

        account.remove(PASSWORD_FIELD);
        let id = string_field(&account, ID_FIELD).unwrap_or_default().to_string();
        let token = self.tokens.generate_token(&id, &account)?;
        account.insert(ACCESS_TOKEN_FIELD.to_string(), Value::String(token));

        info!(event = "Account", phase = "LoggedIn", id = id);
        Ok(Response::ok(account))
    }

    pub fn change_password(
        &self,
        subject: &Subject,
        request: &Request,
    ) -> Result<Response, GatehouseError> {
        if subject.is_anonymous() {
            return Err(GatehouseError::AuthenticationRequired(
                "Access token must be provided for change password request.".to_string(),
            ));
        }

        let body = request.body.clone().unwrap_or_default();
        let current = string_field(&body, PASSWORD_FIELD).ok_or_else(|| {
            GatehouseError::MalformedRequest(
                "Password must be provided in the body with field 'password'.".to_string(),
            )
        })?;
        let replacement = string_field(&body, NEW_PASSWORD_FIELD).ok_or_else(|| {
            GatehouseError::MalformedRequest(
                "New password must be provided in the body with field 'newPassword'.".to_string(),
            )
        })?;

        let digest = subject
            .get(PASSWORD_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !self.passwords.verify(digest, current) {
            return Err(GatehouseError::AuthenticationRequired(
                "Existing password is not correct.".to_string(),
            ));
        }

        let id = subject.id().unwrap_or_default();
        let updated = self.store_password(id, replacement)?;
        info!(event = "Account", phase = "PasswordChanged", id = id);
        Ok(Response::ok(updated))
    }

    /// Replace the account's password with a random one and mail it to the owner.
    pub fn reset_password(&self, request: &Request) -> Result<Response, GatehouseError> {
        let Some(mail) = self.config.reset_password.as_ref() else {
            return Err(GatehouseError::Internal(
                "Email reset configuration is not defined.".to_string(),
            ));
        };

        let body = request.body.clone().unwrap_or_default();
        let Some(recipient) = string_field(&body, EMAIL_FIELD) else {
            return Err(GatehouseError::MalformedRequest(
                "Email must be provided in the body.".to_string(),
            ));
        };

        let account = self.find_account(request)?;
        let id = string_field(&account, ID_FIELD).unwrap_or_default();

        let generated = temporary_password(self.config.reset_password_length);
        let updated = self.store_password(id, &generated)?;

        let message = MailMessage {
            server_host: mail.smtp_server.clone(),
            server_port: mail.smtp_port.clone(),
            from_address: mail.sender_email.clone(),
            from_password: mail.sender_email_password.clone(),
            subject: mail.mail_subject.clone(),
            body_template: mail.mail_content_template.clone(),
            to_address: recipient.to_string(),
            payload: generated,
        };
        self.mailer.send(&message).map_err(|e| {
            warn!(event = "Account", phase = "ResetMailFailed", id = id);
            GatehouseError::Internal(format!("Sending email failed. Reason: {e}"))
        })?;

        info!(event = "Account", phase = "PasswordReset", id = id);
        Ok(Response::ok(updated))
    }

    fn store_password(&self, id: &str, plaintext: &str) -> Result<Record, GatehouseError> {
        let digest = self.passwords.hash(plaintext)?;
        let mut fields = Record::new();
        fields.insert(PASSWORD_FIELD.to_string(), Value::String(digest));

        let mut updated = self.storage.update(self.users(), id, fields)?.record;
        updated.remove(PASSWORD_FIELD);
        Ok(updated)
    }
}

/// The identity used to find an account, as a (stored field path, value) pair.
pub fn identity_of(body: &Record) -> Option<(&'static str, &str)> {
    let non_empty = |field: &str| {
        body.get(field)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    };
    let provider_id = |provider: &str| {
        body.get(provider)
            .and_then(|data| data.get("id"))
            .and_then(Value::as_str)
    };

    non_empty(USERNAME_FIELD)
        .map(|v| (USERNAME_FIELD, v))
        .or_else(|| non_empty(EMAIL_FIELD).map(|v| (EMAIL_FIELD, v)))
        .or_else(|| provider_id("facebook").map(|v| ("facebook.id", v)))
        .or_else(|| provider_id("google").map(|v| ("google.id", v)))
}

/// `{"<key>": {"$eq": "<value>"}}` serialized for the `where` parameter.
pub fn identity_filter(key: &str, value: &str) -> Result<String, GatehouseError> {
    serde_json::to_string(&json!({ key: { "$eq": value } })).map_err(|_| {
        GatehouseError::Internal("Creating user request failed.".to_string())
    })
}

/// Alphanumeric password drawn from the thread-local CSPRNG.
pub fn temporary_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn validate_register_fields(body: &Record) -> Result<(), GatehouseError> {
    if let Some(field) = FORBIDDEN_REGISTER_FIELDS
        .iter()
        .find(|field| body.contains_key(**field))
    {
        return Err(GatehouseError::MalformedRequest(format!(
            "Field '{field}' can not be set in register request."
        )));
    }

    for field in [EMAIL_FIELD, PASSWORD_FIELD] {
        match body.get(field) {
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(GatehouseError::MalformedRequest(format!(
                    "Field '{field}' must be a string."
                )));
            }
            None => {
                return Err(GatehouseError::MalformedRequest(format!(
                    "Register request must contain '{field}' field."
                )));
            }
        }
    }

    Ok(())
}

fn string_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::into_record;
    use yare::parameterized;

    #[parameterized(
        username_first = { json!({"username": "al", "email": "a@x.io"}), Some(("username", "al")) },
        empty_username_skipped = { json!({"username": "", "email": "a@x.io"}), Some(("email", "a@x.io")) },
        email = { json!({"email": "a@x.io", "password": "pw"}), Some(("email", "a@x.io")) },
        facebook = { json!({"facebook": {"id": "fb1"}}), Some(("facebook.id", "fb1")) },
        google = { json!({"google": {"id": "g1"}}), Some(("google.id", "g1")) },
        facebook_before_google = { json!({"google": {"id": "g1"}, "facebook": {"id": "fb1"}}), Some(("facebook.id", "fb1")) },
        nothing = { json!({"password": "pw"}), None },
        non_string_email = { json!({"email": 7}), None },
    )]
    fn test_identity_of(body: Value, expected: Option<(&str, &str)>) {
        let body = into_record(body);
        assert_eq!(identity_of(&body), expected);
    }

    #[test]
    fn test_identity_filter_shape() {
        let filter = identity_filter("facebook.id", "fb1").unwrap();
        let parsed: Value = serde_json::from_str(&filter).unwrap();
        assert_eq!(parsed, json!({"facebook.id": {"$eq": "fb1"}}));
    }

    #[test]
    fn test_temporary_password() {
        let password = temporary_password(12);
        assert_eq!(password.len(), 12);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(temporary_password(32), temporary_password(32));
    }

    #[parameterized(
        id = { json!({"_id": "x", "email": "a@x.io", "password": "pw"}), "Field '_id' can not be set in register request." },
        acl = { json!({"_acl": {}, "email": "a@x.io", "password": "pw"}), "Field '_acl' can not be set in register request." },
        created_at = { json!({"createdAt": 1, "email": "a@x.io", "password": "pw"}), "Field 'createdAt' can not be set in register request." },
        missing_email = { json!({"password": "pw"}), "Register request must contain 'email' field." },
        missing_password = { json!({"email": "a@x.io"}), "Register request must contain 'password' field." },
        numeric_password = { json!({"email": "a@x.io", "password": 1234}), "Field 'password' must be a string." },
    )]
    fn test_register_validation(body: Value, message: &str) {
        let err = validate_register_fields(&into_record(body)).unwrap_err();
        assert_eq!(err, GatehouseError::MalformedRequest(message.into()));
    }
}
