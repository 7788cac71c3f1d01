//! SQLite SQL dialect implementation

use super::{PlaceholderStyle, SqlDialect};

/// SQLite SQL dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident)
    }

    fn order_by(&self, col: &str, desc: bool) -> String {
        // SQLite sorts NULLs first ascending; keep them last in both directions
        let dir = if desc { "DESC" } else { "ASC" };
        format!("CASE WHEN {} IS NULL THEN 1 ELSE 0 END, {} {}", col, col, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let dialect = SqliteDialect;
        assert_eq!(dialect.placeholder(3), "?");
        assert_eq!(dialect.placeholder_style(), PlaceholderStyle::Positional);
    }

    #[test]
    fn test_like_escape() {
        assert_eq!(SqliteDialect.like_escape(), " ESCAPE '\\'");
    }

    #[test]
    fn test_order_by_nulls_last() {
        let dialect = SqliteDialect;
        assert_eq!(
            dialect.order_by("\"name\"", false),
            "CASE WHEN \"name\" IS NULL THEN 1 ELSE 0 END, \"name\" ASC"
        );
    }
}
