//! Seams to the collaborators this core relies on but does not implement.
//!
//! All calls are synchronous; errors propagate to the caller unchanged.

use serde::{Deserialize, Serialize};

use crate::error::GatehouseError;
use crate::types::{Headers, QueryParams, Record};

/// Outcome of a write: the stored record plus whatever side effects the
/// adapter wants passed further down the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub record: Record,
    pub side_effects: Option<Record>,
}

impl Mutation {
    pub fn new(record: Record) -> Self {
        Self {
            record,
            side_effects: None,
        }
    }
}

/// Records matching a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    pub list: Vec<Record>,
}

/// The persistent storage engine.
pub trait Storage: Send + Sync {
    fn create(&self, collection: &str, fields: Record) -> Result<Mutation, GatehouseError>;

    fn get(&self, collection: &str, id: &str) -> Result<Record, GatehouseError>;

    /// Apply `fields` on top of the stored record.
    fn update(&self, collection: &str, id: &str, fields: Record)
    -> Result<Mutation, GatehouseError>;

    fn query(&self, collection: &str, parameters: &QueryParams)
    -> Result<QueryResults, GatehouseError>;
}

/// Decides whether request headers carry a key that bypasses identity checks.
pub trait KeyChecker: Send + Sync {
    fn check_permissions(&self, headers: &Headers) -> Result<bool, GatehouseError>;
}

/// Issues access tokens for authenticated accounts.
pub trait TokenIssuer: Send + Sync {
    fn generate_token(&self, subject_id: &str, claims: &Record) -> Result<String, GatehouseError>;
}

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, GatehouseError>;

    fn verify(&self, digest: &str, plaintext: &str) -> bool;
}

/// Outbound mail delivery.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: &MailMessage) -> Result<(), GatehouseError>;
}

/// Everything a transport needs to deliver one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub server_host: String,
    pub server_port: String,
    pub from_address: String,
    pub from_password: String,
    pub subject: String,
    pub body_template: String,
    pub to_address: String,
    pub payload: String,
}

impl MailMessage {
    /// The template with its first `%s` replaced by the payload.
    pub fn render_body(&self) -> String {
        self.body_template.replacen("%s", &self.payload, 1)
    }
}

/// A key checker that never grants an override.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeys;

impl KeyChecker for NoKeys {
    fn check_permissions(&self, _headers: &Headers) -> Result<bool, GatehouseError> {
        Ok(false)
    }
}
