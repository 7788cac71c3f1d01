//! PostgreSQL SQL dialect implementation

use super::{PlaceholderStyle, SqlDialect};

/// PostgreSQL SQL dialect
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Ordinal
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.placeholder(1), "$1");
        assert_eq!(dialect.placeholder(5), "$5");
        assert_eq!(dialect.placeholder_style(), PlaceholderStyle::Ordinal);
    }

    #[test]
    fn test_quote_ident() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.quote_ident("age"), "\"age\"");
        assert_eq!(dialect.quote_ident("tree.leaf"), "\"tree.leaf\"");
    }

    #[test]
    fn test_order_by() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.order_by("\"created\"", true), "\"created\" DESC");
    }
}
