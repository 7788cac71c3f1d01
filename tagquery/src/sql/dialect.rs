//! SQL dialect trait for multi-database support
//!
//! This trait defines the interface for the database-specific pieces of an
//! emitted predicate: placeholders, identifier quoting and LIKE escaping.

/// How a dialect numbers its bind parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Numbered placeholders sharing one counter per statement (`$1`, `@p1`)
    Ordinal,
    /// Anonymous placeholders bound strictly in render order (`?`)
    Positional,
}

/// SQL dialect trait for generating database-specific SQL
///
/// Different databases have different syntax for:
/// - Parameter placeholders (? vs $1 vs @p1)
/// - Identifier quoting ("col" vs `col` vs [col])
/// - The escape character used by LIKE
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Placeholder family of this dialect
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - PostgreSQL: Returns "$1", "$2", etc.
    /// - SQL Server: Returns "@p1", "@p2", etc.
    /// - MySQL/SQLite: Always returns "?"
    fn placeholder(&self, index: usize) -> String;

    /// Quote a validated identifier
    ///
    /// Callers only pass names matching the field pattern, so no escaping of
    /// embedded quote characters is performed.
    fn quote_ident(&self, ident: &str) -> String;

    /// Suffix appended to a LIKE whose pattern escapes metacharacters with `\`
    ///
    /// MySQL and PostgreSQL already treat backslash as the LIKE escape, so
    /// the default clause is only required where it is not the default.
    fn like_escape(&self) -> &'static str {
        " ESCAPE '\\'"
    }

    /// Generate an ORDER BY term for a quoted column
    fn order_by(&self, col: &str, desc: bool) -> String {
        let dir = if desc { "DESC" } else { "ASC" };
        format!("{} {}", col, dir)
    }
}
