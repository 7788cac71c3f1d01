//! Filter input validation

use serde_json::Value;

use super::Filter;
use super::error::FilterError;
use crate::core::constants::MAX_FILTER_JSON_SIZE;

/// Parse a filter from JSON text
///
/// Validates the text size, then requires the document to be a JSON object.
pub fn parse_filter(json_str: &str) -> Result<Filter, FilterError> {
    if json_str.len() > MAX_FILTER_JSON_SIZE {
        return Err(FilterError::FilterTooLarge {
            limit: MAX_FILTER_JSON_SIZE,
        });
    }

    let value: Value =
        serde_json::from_str(json_str).map_err(|e| FilterError::InvalidJson(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        other => as_filter(&other).cloned(),
    }
}

/// View an arbitrary value as a filter map
pub fn as_filter(value: &Value) -> Result<&Filter, FilterError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(FilterError::Undefined),
        Value::Bool(_) => Err(FilterError::NotAFilter("boolean")),
        Value::Number(_) => Err(FilterError::NotAFilter("number")),
        Value::String(_) => Err(FilterError::NotAFilter("string")),
        Value::Array(_) => Err(FilterError::NotAFilter("list")),
    }
}
