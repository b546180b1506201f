//! Set-like mutation of array-valued entity fields.

use serde_json::Value;

use crate::error::GatehouseError;
use crate::types::ArrayItem;

/// Append every item not already present.
///
/// A missing field starts out empty. Strings are compared case-sensitively and
/// objects shallowly; items of any other shape are ignored.
pub fn append_unique(
    field: &str,
    current: Option<&Value>,
    items: &[Value],
) -> Result<Vec<Value>, GatehouseError> {
    let mut merged = match current {
        None => Vec::new(),
        Some(value) => existing_items(field, value)?.to_vec(),
    };

    for value in items {
        let Some(item) = ArrayItem::from_value(value) else {
            continue;
        };
        if !item.is_contained_in(&merged) {
            merged.push(value.clone());
        }
    }

    Ok(merged)
}

/// Keep every existing element that matches none of `items`.
///
/// Each existing element is only compared against removal items of its own
/// shape; elements that are neither strings nor objects always survive.
pub fn remove_matching(
    field: &str,
    current: Option<&Value>,
    items: &[Value],
) -> Result<Vec<Value>, GatehouseError> {
    let current = current.ok_or_else(|| {
        GatehouseError::NotFound(format!("The field '{field}' doesn't exist."))
    })?;

    Ok(existing_items(field, current)?
        .iter()
        .filter(|value| match ArrayItem::from_value(value) {
            Some(item) => !item.is_contained_in(items),
            None => true,
        })
        .cloned()
        .collect())
}

fn existing_items<'a>(field: &str, value: &'a Value) -> Result<&'a [Value], GatehouseError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| {
            GatehouseError::MalformedRequest(format!("The field '{field}' is not an array."))
        })
}
