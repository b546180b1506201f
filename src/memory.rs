//! In-memory [`Storage`], for tests and single-process embedders.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

use crate::error::GatehouseError;
use crate::traits::{Mutation, QueryResults, Storage};
use crate::types::{ID_FIELD, QueryParams, Record, WHERE_PARAM};

const EQ_OPERATOR: &str = "$eq";

/// Collections of records keyed by `_id`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing duplicate checks.
    pub fn seed(&self, collection: &str, record: Record) -> Result<(), GatehouseError> {
        let id = record_id(&record)?;
        self.collections
            .write()?
            .entry(collection.to_string())
            .or_default()
            .insert(id, record);
        Ok(())
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl Storage for MemoryStore {
    fn create(&self, collection: &str, fields: Record) -> Result<Mutation, GatehouseError> {
        let id = record_id(&fields)?;
        let mut collections = self.collections.write()?;
        let records = collections.entry(collection.to_string()).or_default();
        if records.contains_key(&id) {
            return Err(GatehouseError::Conflict(format!(
                "Object with id '{id}' already exists in '{collection}'."
            )));
        }
        records.insert(id.clone(), fields.clone());
        debug!(event = "MemoryStore", phase = "Create", collection = collection, id = id);
        Ok(Mutation::new(fields))
    }

    fn get(&self, collection: &str, id: &str) -> Result<Record, GatehouseError> {
        self.collections
            .read()?
            .get(collection)
            .and_then(|records| records.get(id))
            .cloned()
            .ok_or_else(|| GatehouseError::NotFound("Object not found.".to_string()))
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Record,
    ) -> Result<Mutation, GatehouseError> {
        let mut collections = self.collections.write()?;
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| GatehouseError::NotFound("Object not found.".to_string()))?;
        record.extend(fields);
        debug!(event = "MemoryStore", phase = "Update", collection = collection, id = id);
        Ok(Mutation::new(record.clone()))
    }

    fn query(
        &self,
        collection: &str,
        parameters: &QueryParams,
    ) -> Result<QueryResults, GatehouseError> {
        let filter = parameters
            .get(WHERE_PARAM)
            .and_then(|values| values.first())
            .map(|raw| parse_filter(raw))
            .transpose()?
            .unwrap_or_default();

        let collections = self.collections.read()?;
        let list = collections
            .get(collection)
            .map(|records| {
                records
                    .values()
                    .filter(|record| {
                        filter
                            .iter()
                            .all(|(path, expected)| lookup(record, path) == Some(expected))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(QueryResults { list })
    }
}

fn record_id(record: &Record) -> Result<String, GatehouseError> {
    record
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            GatehouseError::MalformedRequest(format!(
                "Object must carry a string '{ID_FIELD}'."
            ))
        })
}

/// Parse `{"a.b": {"$eq": value}, ...}` into (path, value) clauses.
fn parse_filter(raw: &str) -> Result<Vec<(String, Value)>, GatehouseError> {
    let document: Record = serde_json::from_str(raw).map_err(|e| {
        GatehouseError::MalformedRequest(format!("Invalid '{WHERE_PARAM}' parameter: {e}"))
    })?;

    document
        .into_iter()
        .map(|(path, condition)| match condition.get(EQ_OPERATOR) {
            Some(expected) => Ok((path, expected.clone())),
            None => Err(GatehouseError::MalformedRequest(format!(
                "Only '{EQ_OPERATOR}' conditions are supported, found {condition} for '{path}'."
            ))),
        })
        .collect()
}

fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = current.get(segment)?;
    }
    Some(current)
}
