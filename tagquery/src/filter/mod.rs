//! Tagged filter compiler
//!
//! Translates loosely-typed filter maps into parameterized SQL predicates or
//! document-store queries. Keys and string operands carry `$`-delimited tags:
//!
//! ```text
//! {"age$gte$": 30}                  key suffix
//! {"age": "$gte$30"}                wrapped string operand
//! {"age": {"$gte$": 30}}            single-entry operand map
//! {"$or$status": [1, 2]}            per-field OR group
//! {"$and$": [{"a": 1}, {"b": 2}]}   nested filters
//! {"$in$status": [1, 2]}            membership
//! ```
//!
//! Keys are processed in lexicographic order at every level, so equal inputs
//! always produce byte-identical output.

mod document;
mod error;
mod input;
mod parser;
mod sanitize;
mod sql;
mod tag;
mod tree;
mod update;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::constants::DEFAULT_MAX_DEPTH;
use crate::sql::SqlDialect;

pub use document::DocumentEmitter;
pub use error::FilterError;
pub use input::{as_filter, parse_filter};
pub use parser::{is_safe_field, parse_key, safe_field};
pub use sanitize::{Sanitizer, SortKey, sort_safe};
pub use sql::{SqlClause, SqlEmitter, SqlParams};
pub use tag::{Comparator, Connector, Tag};
pub use tree::{Logic, Node, Predicate, TreeBuilder};
pub use update::{Assign, UpdatePlan};

/// Filter expression: string keys to arbitrary JSON values
pub type Filter = serde_json::Map<String, serde_json::Value>;

/// How `$like$` / `$text$` operands are turned into patterns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeMode {
    /// Operand is the pattern; the caller supplies any wildcards
    #[default]
    Raw,
    /// Operand is a literal substring; metacharacters are escaped
    Contains,
}

impl FromStr for LikeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(LikeMode::Raw),
            "contains" => Ok(LikeMode::Contains),
            _ => Err(format!(
                "Invalid like mode '{}'. Valid options: raw, contains",
                s
            )),
        }
    }
}

/// Compiler settings, bound at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Deepest nesting level accepted (top level is 0)
    pub max_depth: usize,
    pub like_mode: LikeMode,
    /// Lowercase field names before validation
    pub fold_case: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            like_mode: LikeMode::default(),
            fold_case: true,
        }
    }
}

/// Entry point for filter translation
#[derive(Debug, Clone, Default)]
pub struct FilterCompiler {
    config: CompilerConfig,
}

impl FilterCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Build the expression tree of a filter
    pub fn build(&self, filter: &Filter) -> Result<Vec<Node>, FilterError> {
        TreeBuilder::new(self.config.max_depth, self.config.fold_case).build(filter)
    }

    /// Compile to a WHERE fragment with placeholders numbered from 1
    pub fn to_sql(
        &self,
        filter: &Filter,
        dialect: &dyn SqlDialect,
    ) -> Result<SqlClause, FilterError> {
        self.to_sql_with_offset(filter, dialect, 0)
    }

    /// Compile to a WHERE fragment whose placeholders start at `offset + 1`
    ///
    /// Positional dialects ignore the offset in the text, but values are still
    /// returned in binding order.
    pub fn to_sql_with_offset(
        &self,
        filter: &Filter,
        dialect: &dyn SqlDialect,
        offset: usize,
    ) -> Result<SqlClause, FilterError> {
        let nodes = self.build(filter)?;
        let mut params = SqlParams::with_offset(offset);
        let sql = SqlEmitter::new(dialect, self.config.like_mode).emit(&nodes, &mut params);

        tracing::debug!(
            dialect = dialect.name(),
            nodes = nodes.len(),
            values = params.values.len(),
            offset,
            "Compiled filter to SQL"
        );
        Ok(SqlClause {
            sql,
            values: params.values,
        })
    }

    /// Compile to a document-store query
    pub fn to_document(&self, filter: &Filter) -> Result<Filter, FilterError> {
        let nodes = self.build(filter)?;
        let doc = DocumentEmitter::new(self.config.like_mode).emit(&nodes);
        tracing::debug!(nodes = nodes.len(), keys = doc.len(), "Compiled filter to document");
        Ok(doc)
    }

    /// Validate an update map
    pub fn update_plan(&self, update: &Filter) -> Result<UpdatePlan, FilterError> {
        UpdatePlan::parse(update, self.config.fold_case)
    }

    /// Compile an update map to a SET list
    ///
    /// A WHERE clause for the same statement should be compiled with
    /// `to_sql_with_offset(.., clause.values.len())`.
    pub fn update_to_sql(
        &self,
        update: &Filter,
        dialect: &dyn SqlDialect,
    ) -> Result<SqlClause, FilterError> {
        let clause = self.update_plan(update)?.to_clause(dialect);
        tracing::debug!(
            dialect = dialect.name(),
            values = clause.values.len(),
            "Compiled update to SQL"
        );
        Ok(clause)
    }

    /// Compile an update map to `{"$inc": .., "$set": ..}`
    pub fn update_to_document(&self, update: &Filter) -> Result<Filter, FilterError> {
        Ok(self.update_plan(update)?.to_document())
    }

    /// Sanitizer sharing this compiler's case folding and depth limit
    pub fn sanitizer(&self) -> Sanitizer {
        Sanitizer::new()
            .fold_case(self.config.fold_case)
            .max_depth(self.config.max_depth)
    }
}
