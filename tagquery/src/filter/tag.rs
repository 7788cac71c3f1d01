//! Tag grammar
//!
//! Tags are `$`-delimited tokens (`$gte$`, `$or$`, ...). Comparators attach to
//! a single field; connectors group sub-expressions. Token bodies are ASCII
//! letters only, so `"$5 off"` or `"$1$"` are plain values, not tags.

use std::fmt;

/// Tag delimiter
pub const TAG_SEP: char = '$';

/// Per-field comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// No tag: equality
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    Text,
}

impl Comparator {
    /// Delimited tag, `None` for equality which has no spelling
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Eq => None,
            Self::Ne => Some("$ne$"),
            Self::Lt => Some("$lt$"),
            Self::Lte => Some("$lte$"),
            Self::Gt => Some("$gt$"),
            Self::Gte => Some("$gte$"),
            Self::Like => Some("$like$"),
            Self::Text => Some("$text$"),
        }
    }

    /// SQL operator for a non-null operand
    pub fn sql_op(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like | Self::Text => "LIKE",
        }
    }

    /// Document-store operator key, `None` for equality
    pub fn document_op(&self) -> Option<&'static str> {
        match self {
            Self::Eq => None,
            Self::Ne => Some("$ne"),
            Self::Lt => Some("$lt"),
            Self::Lte => Some("$lte"),
            Self::Gt => Some("$gt"),
            Self::Gte => Some("$gte"),
            Self::Like | Self::Text => Some("$regex"),
        }
    }

    /// Whether the operand is a pattern rather than a value
    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Like | Self::Text)
    }
}

/// Grouping operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connector {
    Or,
    And,
    /// Membership: field equals one of a list of values
    In,
    /// Update-only increment
    Inc,
}

impl Connector {
    /// Delimited tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Or => "$or$",
            Self::And => "$and$",
            Self::In => "$in$",
            Self::Inc => "$inc$",
        }
    }

    /// Document-store operator key
    pub fn document_op(&self) -> &'static str {
        match self {
            Self::Or => "$or",
            Self::And => "$and",
            Self::In => "$in",
            Self::Inc => "$inc",
        }
    }
}

/// Any recognized tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Comparator(Comparator),
    Connector(Connector),
}

impl Tag {
    /// Resolve a delimited token such as `$gte$`
    ///
    /// Matching is ASCII case-insensitive. `$no$` is accepted as an alias of
    /// `$ne$`.
    pub fn from_token(token: &str) -> Option<Tag> {
        let body = token.strip_prefix(TAG_SEP)?.strip_suffix(TAG_SEP)?;
        let tag = match body.to_ascii_lowercase().as_str() {
            "ne" | "no" => Tag::Comparator(Comparator::Ne),
            "lt" => Tag::Comparator(Comparator::Lt),
            "lte" => Tag::Comparator(Comparator::Lte),
            "gt" => Tag::Comparator(Comparator::Gt),
            "gte" => Tag::Comparator(Comparator::Gte),
            "like" => Tag::Comparator(Comparator::Like),
            "text" => Tag::Comparator(Comparator::Text),
            "or" => Tag::Connector(Connector::Or),
            "and" => Tag::Connector(Connector::And),
            "in" => Tag::Connector(Connector::In),
            "inc" => Tag::Connector(Connector::Inc),
            _ => return None,
        };
        Some(tag)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Comparator(c) => write!(f, "{}", c.tag().unwrap_or("=")),
            Tag::Connector(c) => write!(f, "{}", c.tag()),
        }
    }
}

fn is_token_body(body: &str) -> bool {
    !body.is_empty() && body.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Split a leading `$name$` token off `s`
///
/// Returns `(token, rest)` when `s` starts with a well-formed token.
pub fn leading_token(s: &str) -> Option<(&str, &str)> {
    let inner = s.strip_prefix(TAG_SEP)?;
    let end = inner.find(TAG_SEP)?;
    if !is_token_body(&inner[..end]) {
        return None;
    }
    // `$` is one byte, so the token spans `end + 2` bytes of `s`
    Some(s.split_at(end + 2))
}

/// Split a trailing `$name$` token off `s`
///
/// Returns `(head, token)` when `s` ends with a well-formed token.
pub fn trailing_token(s: &str) -> Option<(&str, &str)> {
    let inner = s.strip_suffix(TAG_SEP)?;
    let start = inner.rfind(TAG_SEP)?;
    if !is_token_body(&inner[start + 1..]) {
        return None;
    }
    Some(s.split_at(start))
}
