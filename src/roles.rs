//! Role list merging for grant and recall.
//!
//! Membership here is exact, case-sensitive string equality. The gate checks
//! the caller's own roles case-insensitively, so granting `Admin` to someone
//! holding `admin` yields both entries.

use itertools::Itertools;
use serde_json::Value;

use crate::error::GatehouseError;
use crate::types::ROLES_FIELD;

/// Append each requested role not already present, keeping existing order.
/// Repeats within the request collapse to the first occurrence.
pub fn grant_roles(existing: &[String], requested: &[String]) -> Vec<String> {
    let mut merged = existing.to_vec();
    merged.extend(
        requested
            .iter()
            .unique()
            .filter(|role| !existing.contains(role))
            .cloned(),
    );
    merged
}

/// Drop every existing role that appears in `removal`.
pub fn recall_roles(existing: &[String], removal: &[String]) -> Vec<String> {
    existing
        .iter()
        .filter(|role| !removal.contains(role))
        .cloned()
        .collect()
}

/// Read a role list, requiring an array of strings.
pub fn role_list(value: &Value) -> Result<Vec<String>, GatehouseError> {
    let invalid = || {
        GatehouseError::MalformedRequest(format!(
            "The field '{ROLES_FIELD}' must be a list of role names."
        ))
    };

    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|role| role.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}
