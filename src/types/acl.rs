//! Per-entity access control entries.
//!
//! An entry maps a subject key to the permissions granted to it:
//!
//! ```json
//! { "*": { "get": true }, "user:42": { "get": true, "update": true } }
//! ```

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

use crate::error::GatehouseError;

use super::record::{ACL_FIELD, Record};

/// Key standing for every subject, authenticated or not.
pub const ALL_SUBJECTS: &str = "*";

const USER_KEY_PREFIX: &str = "user:";

/// Who an ACL entry applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubjectKey {
    All,
    User(String),
}

impl SubjectKey {
    pub fn user(id: impl Into<String>) -> Self {
        SubjectKey::User(id.into())
    }
}

impl Display for SubjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SubjectKey::All => write!(f, "{ALL_SUBJECTS}"),
            SubjectKey::User(id) => write!(f, "{USER_KEY_PREFIX}{id}"),
        }
    }
}

impl FromStr for SubjectKey {
    type Err = GatehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_SUBJECTS {
            return Ok(SubjectKey::All);
        }
        match s.strip_prefix(USER_KEY_PREFIX) {
            Some(id) if !id.is_empty() => Ok(SubjectKey::user(id)),
            _ => Err(GatehouseError::MalformedRequest(format!(
                "Invalid ACL subject key '{s}' (expected '{ALL_SUBJECTS}' or '{USER_KEY_PREFIX}<id>')."
            ))),
        }
    }
}

/// A permission that can be granted in an ACL entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Permission {
    Get,
    Create,
    Update,
    Delete,
    Query,
}

/// The access control structure stored under `_acl` on an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct AccessControlEntry(BTreeMap<String, BTreeMap<String, bool>>);

impl AccessControlEntry {
    /// The entry attached to a freshly created account: everybody may read it,
    /// its owner may read and update it. No other grants exist.
    pub fn default_for_owner(owner_id: &str) -> Self {
        let mut acl = Self::default();
        acl.grant(&SubjectKey::All, Permission::Get);
        let owner = SubjectKey::user(owner_id);
        acl.grant(&owner, Permission::Get);
        acl.grant(&owner, Permission::Update);
        acl
    }

    pub fn grant(&mut self, key: &SubjectKey, permission: Permission) {
        self.0
            .entry(key.to_string())
            .or_default()
            .insert(permission.to_string(), true);
    }

    /// Whether `key` is explicitly granted `permission`.
    pub fn allows(&self, key: &SubjectKey, permission: Permission) -> bool {
        self.0
            .get(&key.to_string())
            .and_then(|perms| perms.get(permission.as_ref()))
            .copied()
            .unwrap_or(false)
    }

    /// Raw permissions recorded for a subject key.
    pub fn permissions(&self, key: &SubjectKey) -> Option<&BTreeMap<String, bool>> {
        self.0.get(&key.to_string())
    }

    pub fn subject_keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Read the entry stored on a record, if there is one.
    pub fn from_record(record: &Record) -> Result<Option<Self>, GatehouseError> {
        record
            .get(ACL_FIELD)
            .map(|value| serde_json::from_value(value.clone()).map_err(GatehouseError::from))
            .transpose()
    }

    pub fn to_value(&self) -> Result<Value, GatehouseError> {
        Ok(serde_json::to_value(self)?)
    }
}
