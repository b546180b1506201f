//! Record aliases and reserved field names.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// A stored entity or request body: an ordered JSON object.
pub type Record = Map<String, Value>;

/// Request headers, keyed by header name.
pub type Headers = BTreeMap<String, String>;

/// Query parameters; every name may carry several values.
pub type QueryParams = BTreeMap<String, Vec<String>>;

pub const ID_FIELD: &str = "_id";
pub const ACL_FIELD: &str = "_acl";
pub const ROLES_FIELD: &str = "_roles";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";
pub const ITEMS_FIELD: &str = "items";
pub const USERNAME_FIELD: &str = "username";
pub const EMAIL_FIELD: &str = "email";
pub const PASSWORD_FIELD: &str = "password";
pub const NEW_PASSWORD_FIELD: &str = "newPassword";
pub const ACCESS_TOKEN_FIELD: &str = "accessToken";
pub const MESSAGE_FIELD: &str = "message";

/// Query parameter carrying a JSON filter document.
pub const WHERE_PARAM: &str = "where";

/// Unwrap a JSON object into a [`Record`]; anything else becomes an empty record.
pub fn into_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

/// Unicode case-insensitive string equality.
pub fn eq_fold(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
