//! MySQL SQL dialect implementation

use super::{PlaceholderStyle, SqlDialect};

/// MySQL SQL dialect
pub struct MysqlDialect;

impl SqlDialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident)
    }

    fn like_escape(&self) -> &'static str {
        // Backslash is the default LIKE escape, and '\' would open a string escape
        ""
    }
}
