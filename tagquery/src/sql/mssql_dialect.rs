//! SQL Server dialect implementation

use super::{PlaceholderStyle, SqlDialect};

/// Microsoft SQL Server dialect
pub struct MssqlDialect;

impl SqlDialect for MssqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Ordinal
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("[{}]", ident)
    }
}
