//! Positional parsing of resource paths.

use serde::Serialize;

use crate::error::GatehouseError;
use crate::types::{Convention, Operation, eq_fold};

/// The entity (and, for field operations, the field) a request addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResourcePath {
    Entity {
        class: String,
        id: String,
    },
    Field {
        class: String,
        id: String,
        field: String,
    },
}

impl ResourcePath {
    /// Split `path` according to the convention of `operation`.
    ///
    /// Role operations only apply to the users collection, compared
    /// case-insensitively against `users_collection`.
    pub fn parse(
        path: &str,
        operation: Operation,
        users_collection: &str,
    ) -> Result<Self, GatehouseError> {
        let convention = operation
            .convention()
            .ok_or_else(|| GatehouseError::Internal(operation.usage()))?;

        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() != convention.segment_count() {
            return Err(GatehouseError::MalformedRequest(operation.usage()));
        }

        match convention {
            Convention::GrantRecall => {
                if !eq_fold(segments[1], users_collection) {
                    return Err(GatehouseError::MalformedRequest(operation.usage()));
                }
                Ok(ResourcePath::Entity {
                    class: segments[1].to_string(),
                    id: segments[2].to_string(),
                })
            }
            Convention::FieldMutation => Ok(ResourcePath::Field {
                class: segments[1].to_string(),
                id: segments[2].to_string(),
                field: segments[3].to_string(),
            }),
        }
    }

    pub fn class(&self) -> &str {
        match self {
            ResourcePath::Entity { class, .. } | ResourcePath::Field { class, .. } => class,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ResourcePath::Entity { id, .. } | ResourcePath::Field { id, .. } => id,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ResourcePath::Entity { .. } => None,
            ResourcePath::Field { field, .. } => Some(field),
        }
    }
}
