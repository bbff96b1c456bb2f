pub mod entity;
pub mod record;

use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::service::SYSTEM_FIELDS;
use crate::database::tables::{self, EntityTable};
use crate::error::ApiError;

/// Query keys consumed by the list endpoint itself; everything else becomes
/// an equality filter.
pub(crate) const RESERVED_PARAMS: &[&str] = &["page", "limit", "order", "q", "fields"];

/// Resolve the `:entity` path segment through the table registry.
pub(crate) fn table_for(entity: &str) -> Result<&'static EntityTable, ApiError> {
    tables::lookup(entity)
        .ok_or_else(|| ApiError::not_found(format!("unknown entity '{}'", entity)))
}

pub(crate) fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id)
        .map_err(|_| ApiError::validation_error(format!("'{}' is not a valid record id", id), None))
}

/// Extract a write payload: must be a JSON object with at least one field,
/// none of them system-owned. Offenders are reported together.
pub(crate) fn write_fields(payload: Value) -> Result<Map<String, Value>, ApiError> {
    let fields = match payload {
        Value::Object(map) => map,
        _ => return Err(ApiError::invalid_json("expected a JSON object")),
    };
    if fields.is_empty() {
        return Err(ApiError::validation_error("no fields provided", None));
    }

    let mut field_errors = HashMap::new();
    for key in fields.keys() {
        if SYSTEM_FIELDS.contains(&key.as_str()) {
            field_errors.insert(
                key.clone(),
                "system field cannot be set via the API".to_string(),
            );
        }
    }
    if !field_errors.is_empty() {
        let mut failing: Vec<&str> = field_errors.keys().map(|k| k.as_str()).collect();
        failing.sort();
        return Err(ApiError::validation_error(
            format!("validation failed: {}", failing.join(", ")),
            Some(field_errors),
        ));
    }
    Ok(fields)
}

/// Translate leftover query params into an equality filter map. Values that
/// parse as integers or booleans are typed accordingly so they bind against
/// numeric and boolean columns.
pub(crate) fn where_from_params(params: &HashMap<String, String>) -> Option<Value> {
    let mut conditions = Map::new();
    for (key, value) in params {
        if RESERVED_PARAMS.contains(&key.as_str()) {
            continue;
        }
        let typed = if let Ok(i) = value.parse::<i64>() {
            Value::from(i)
        } else if let Ok(b) = value.parse::<bool>() {
            Value::from(b)
        } else {
            Value::String(value.clone())
        };
        conditions.insert(key.clone(), typed);
    }
    if conditions.is_empty() {
        None
    } else {
        Some(Value::Object(conditions))
    }
}

pub(crate) fn parse_i64(params: &HashMap<String, String>, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| v.parse().ok())
}
