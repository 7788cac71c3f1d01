//! Key and operand parsing
//!
//! A filter entry `key: operand` may carry a connector prefix on the key
//! (`$or$age`), a comparator suffix on the key (`age$gte$`), a comparator
//! wrapped around a string operand (`"$gte$30"`) or a single-entry operand
//! map (`{"$gte$": 30}`). This module takes those apart and validates the
//! remaining field name, which is the only user text that reaches emitted SQL.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::error::FilterError;
use super::tag::{Comparator, Connector, Tag, leading_token, trailing_token};

/// Allowed field names: letters, digits, underscore, dot, hyphen
static FIELD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Invalid regex"));

/// Raw pieces of a key, without any validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyParts<'a> {
    pub prefix: Option<&'a str>,
    pub suffix: Option<&'a str>,
    pub field: &'a str,
}

/// Split a key into prefix token, field and suffix token
///
/// Never fails; used where keys must be inspected without rejecting them.
pub fn split_key(key: &str) -> KeyParts<'_> {
    let (prefix, rest) = match leading_token(key) {
        Some((token, rest)) => (Some(token), rest),
        None => (None, key),
    };
    let (field, suffix) = match trailing_token(rest) {
        Some((field, token)) => (field, Some(token)),
        None => (rest, None),
    };
    KeyParts {
        prefix,
        suffix,
        field,
    }
}

/// A validated key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub connector: Option<Connector>,
    pub comparator: Option<Comparator>,
    /// Normalized field name; empty only for bare connector keys (`$or$`)
    pub field: String,
}

/// Parse and validate a filter key
pub fn parse_key(key: &str, fold_case: bool) -> Result<ParsedKey, FilterError> {
    let parts = split_key(key);

    let connector = match parts.prefix {
        None => None,
        Some(token) => match Tag::from_token(token) {
            Some(Tag::Connector(c)) => Some(c),
            _ => return Err(FilterError::invalid_operator(token)),
        },
    };

    let comparator = match parts.suffix {
        None => None,
        Some(token) => match Tag::from_token(token) {
            Some(Tag::Comparator(c)) => Some(c),
            _ => return Err(FilterError::invalid_operator(token)),
        },
    };

    let field = if parts.field.is_empty() && connector.is_some() && comparator.is_none() {
        String::new()
    } else {
        normalize_field(parts.field, fold_case).map_err(|_| FilterError::invalid_key(key))?
    };

    Ok(ParsedKey {
        connector,
        comparator,
        field,
    })
}

/// Fold and validate a bare field name
pub fn normalize_field(field: &str, fold_case: bool) -> Result<String, FilterError> {
    let field = if fold_case {
        field.to_lowercase()
    } else {
        field.to_string()
    };
    if !is_safe_field(&field) {
        return Err(FilterError::InvalidKey(field));
    }
    Ok(field)
}

/// Check a field name against the identifier pattern
pub fn is_safe_field(field: &str) -> bool {
    FIELD_PATTERN.is_match(field)
}

/// Resolve the comparator and bare value of a leaf operand
///
/// `key_comparator` is the comparator already taken from the key, if any.
/// A second comparator source in the operand is a format conflict.
pub fn resolve_operand(
    field: &str,
    key_comparator: Option<Comparator>,
    operand: &Value,
) -> Result<(Comparator, Value), FilterError> {
    let from_operand = match operand {
        Value::String(s) => match leading_token(s) {
            Some((token, rest)) => match Tag::from_token(token) {
                Some(Tag::Comparator(c)) => Some((c, Value::String(rest.to_string()))),
                _ => return Err(FilterError::invalid_operator(token)),
            },
            None => None,
        },
        Value::Object(map) => {
            if key_comparator.is_some() {
                return Err(FilterError::FormatConflict(field.to_string()));
            }
            let mut entries = map.iter();
            let (token, value) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => {
                    return Err(FilterError::AmbiguousOperand {
                        field: field.to_string(),
                        len: map.len(),
                    });
                }
            };
            match Tag::from_token(token) {
                Some(Tag::Comparator(c)) => Some((c, value.clone())),
                _ => return Err(FilterError::invalid_operator(token.as_str())),
            }
        }
        _ => None,
    };

    match (key_comparator, from_operand) {
        (Some(_), Some(_)) => Err(FilterError::FormatConflict(field.to_string())),
        (Some(c), None) => Ok((c, operand.clone())),
        (None, Some(resolved)) => Ok(resolved),
        (None, None) => Ok((Comparator::Eq, operand.clone())),
    }
}

/// Lowercase a field and keep it only if it is safe
///
/// Returns an empty string for anything that is not a plain field name.
pub fn safe_field(s: &str) -> String {
    let lower = s.to_lowercase();
    if is_safe_field(&lower) {
        lower
    } else {
        String::new()
    }
}
