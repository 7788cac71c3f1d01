//! Filter compilation errors

use thiserror::Error;

/// Error returned when a filter cannot be translated
///
/// Every variant aborts translation; no partial clause or document is ever
/// produced for a malformed filter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The filter value is null
    #[error("filter is undefined")]
    Undefined,

    /// The filter value is not a map
    #[error("filter must be a map, got {0}")]
    NotAFilter(&'static str),

    /// Field name is empty or contains disallowed characters
    #[error("invalid field name: {0:?}")]
    InvalidKey(String),

    /// Tag is not recognized or not allowed in this position
    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    /// A map-shaped operand must hold exactly one comparator entry
    #[error("operand for {field:?} must be a single-entry map, found {len} entries")]
    AmbiguousOperand { field: String, len: usize },

    /// Comparator given by both the key and the operand
    #[error("comparator for {0:?} is given in both key and operand")]
    FormatConflict(String),

    /// Nesting deeper than the configured maximum
    #[error("filter nesting exceeds maximum depth of {0}")]
    DepthExceeded(usize),

    /// `$in$` with no candidate values
    #[error("membership list for {0:?} is empty")]
    EmptyMembership(String),

    /// `$inc$` operand is not a map of field to amount
    #[error("increment operand must be a map of fields to amounts")]
    InvalidIncrement,

    /// Filter text longer than the accepted maximum
    #[error("filter JSON exceeds maximum size of {limit} bytes")]
    FilterTooLarge { limit: usize },

    /// Filter text is not valid JSON
    #[error("invalid filter JSON: {0}")]
    InvalidJson(String),
}

impl FilterError {
    /// Create an invalid key error
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey(key.into())
    }

    /// Create an invalid operator error
    pub fn invalid_operator(tag: impl Into<String>) -> Self {
        Self::InvalidOperator(tag.into())
    }

    /// Short machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Undefined => "FILTER_UNDEFINED",
            Self::NotAFilter(_) => "FILTER_NOT_A_MAP",
            Self::InvalidKey(_) => "INVALID_FILTER_KEY",
            Self::InvalidOperator(_) => "INVALID_FILTER_OPERATOR",
            Self::AmbiguousOperand { .. } => "AMBIGUOUS_FILTER_OPERAND",
            Self::FormatConflict(_) => "FILTER_FORMAT_CONFLICT",
            Self::DepthExceeded(_) => "FILTER_TOO_DEEP",
            Self::EmptyMembership(_) => "EMPTY_FILTER_MEMBERSHIP",
            Self::InvalidIncrement => "INVALID_INCREMENT",
            Self::FilterTooLarge { .. } => "FILTER_JSON_TOO_LARGE",
            Self::InvalidJson(_) => "INVALID_FILTER_JSON",
        }
    }
}
