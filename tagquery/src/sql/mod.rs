//! SQL abstraction layer for multi-database support
//!
//! This module provides the dialect-specific pieces the filter compiler needs
//! to render predicates for different backends (PostgreSQL, MySQL, SQLite,
//! SQL Server).

mod dialect;
mod mssql_dialect;
mod mysql_dialect;
mod postgres_dialect;
mod sqlite_dialect;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filter::{FilterError, SortKey};

pub use dialect::{PlaceholderStyle, SqlDialect};
pub use mssql_dialect::MssqlDialect;
pub use mysql_dialect::MysqlDialect;
pub use postgres_dialect::PostgresDialect;
pub use sqlite_dialect::SqliteDialect;

/// Database dialect identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
    Mssql,
}

impl Dialect {
    /// Get the SQL dialect implementation
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &PostgresDialect,
            Dialect::Mysql => &MysqlDialect,
            Dialect::Sqlite => &SqliteDialect,
            Dialect::Mssql => &MssqlDialect,
        }
    }

    /// Get the dialect name
    pub fn name(&self) -> &'static str {
        self.dialect().name()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            "sqlite" => Ok(Dialect::Sqlite),
            "mssql" | "sqlserver" => Ok(Dialect::Mssql),
            _ => Err(format!(
                "Invalid dialect '{}'. Valid options: postgres, mysql, sqlite, mssql",
                s
            )),
        }
    }
}

/// Render an ORDER BY clause from sort keys
///
/// Returns an empty string when there are no keys, so the result can be
/// appended to a statement unconditionally.
pub fn order_by_clause(keys: &[SortKey], dialect: &dyn SqlDialect) -> String {
    if keys.is_empty() {
        return String::new();
    }
    let terms: Vec<String> = keys
        .iter()
        .map(|k| dialect.order_by(&dialect.quote_ident(&k.field), k.descending))
        .collect();
    format!("ORDER BY {}", terms.join(", "))
}

/// Parse `+field` / `-field` / `field` strings and render them as ORDER BY
pub fn order_by_from_strs<S: AsRef<str>>(
    keys: &[S],
    dialect: &dyn SqlDialect,
    fold_case: bool,
) -> Result<String, FilterError> {
    let parsed = keys
        .iter()
        .map(|k| SortKey::parse(k.as_ref(), fold_case))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(order_by_clause(&parsed, dialect))
}
