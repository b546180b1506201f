//! The caller on whose behalf a request runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::{ID_FIELD, ROLES_FIELD, Record};

/// An authenticated account record, or nothing for anonymous callers.
///
/// An empty record is treated exactly like an anonymous caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(Record);

impl Subject {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_record(record: Record) -> Self {
        Self(record)
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Role names held by this subject, or `None` when the record has no role field.
    ///
    /// Entries that are not strings are skipped.
    pub fn roles(&self) -> Option<Vec<&str>> {
        let roles = self.0.get(ROLES_FIELD)?;
        Some(
            roles
                .as_array()
                .map(|roles| roles.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default(),
        )
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn record(&self) -> &Record {
        &self.0
    }
}

impl From<Record> for Subject {
    fn from(record: Record) -> Self {
        Self::from_record(record)
    }
}
