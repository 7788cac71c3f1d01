//! SQL WHERE clause emitter

use serde::Serialize;
use serde_json::Value;

use super::LikeMode;
use super::tag::Comparator;
use super::tree::{Logic, Node, Predicate};
use crate::sql::SqlDialect;
use crate::utils::sql::escape_like_pattern;

/// Bind values collected while rendering
///
/// Placeholder indices are `offset + position`, so a clause can be appended
/// after values that were already bound elsewhere in the statement.
#[derive(Debug, Clone, Default)]
pub struct SqlParams {
    pub values: Vec<Value>,
    offset: usize,
}

impl SqlParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start numbering placeholders after `offset` already-bound values
    pub fn with_offset(offset: usize) -> Self {
        Self {
            values: Vec::new(),
            offset,
        }
    }

    /// Push a value and return its placeholder
    pub fn bind(&mut self, value: Value, dialect: &dyn SqlDialect) -> String {
        self.values.push(value);
        dialect.placeholder(self.offset + self.values.len())
    }
}

/// Rendered clause with its bind values in placeholder order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SqlClause {
    pub sql: String,
    pub values: Vec<Value>,
}

/// Renders node lists into SQL for one dialect
pub struct SqlEmitter<'a> {
    dialect: &'a dyn SqlDialect,
    like_mode: LikeMode,
}

impl<'a> SqlEmitter<'a> {
    pub fn new(dialect: &'a dyn SqlDialect, like_mode: LikeMode) -> Self {
        Self { dialect, like_mode }
    }

    /// Render a top-level node list; fragments are joined with AND
    pub fn emit(&self, nodes: &[Node], params: &mut SqlParams) -> String {
        nodes
            .iter()
            .map(|node| self.render_top(node, params))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn render_top(&self, node: &Node, params: &mut SqlParams) -> String {
        match node {
            Node::Group { .. } => self.render_inline(node, params),
            _ => format!("({})", self.render_inline(node, params)),
        }
    }

    /// Render a node without outer parentheses, except for groups
    fn render_inline(&self, node: &Node, params: &mut SqlParams) -> String {
        match node {
            Node::Leaf(predicate) => self.render_leaf(predicate, params),
            Node::Membership { field, values } => self.render_membership(field, values, params),
            Node::Group { logic, members } => self.render_group(*logic, members, params),
        }
    }

    fn render_group(
        &self,
        logic: Logic,
        members: &[Vec<Node>],
        params: &mut SqlParams,
    ) -> String {
        let parts: Vec<String> = members
            .iter()
            .map(|member| self.render_member(member, params))
            .collect();
        format!("({})", parts.join(logic.sql_sep()))
    }

    fn render_member(&self, member: &[Node], params: &mut SqlParams) -> String {
        match member {
            [single] => self.render_inline(single, params),
            nodes => {
                let parts: Vec<String> = nodes
                    .iter()
                    .map(|node| self.render_inline(node, params))
                    .collect();
                format!("({})", parts.join(" AND "))
            }
        }
    }

    fn render_leaf(&self, predicate: &Predicate, params: &mut SqlParams) -> String {
        let col = self.dialect.quote_ident(&predicate.field);
        match (predicate.comparator, &predicate.operand) {
            // A null pattern matches absence, as equality does
            (Comparator::Eq | Comparator::Like | Comparator::Text, Value::Null) => {
                format!("{} IS NULL", col)
            }
            (Comparator::Ne, Value::Null) => format!("{} IS NOT NULL", col),
            (comparator, operand) if comparator.is_pattern() => {
                self.render_like(&col, operand, params)
            }
            (comparator, operand) => {
                let placeholder = params.bind(operand.clone(), self.dialect);
                format!("{} {} {}", col, comparator.sql_op(), placeholder)
            }
        }
    }

    fn render_like(&self, col: &str, operand: &Value, params: &mut SqlParams) -> String {
        match (self.like_mode, literal_text(operand)) {
            (LikeMode::Contains, Some(text)) => {
                let pattern = format!("%{}%", escape_like_pattern(&text));
                let placeholder = params.bind(Value::String(pattern), self.dialect);
                format!("{} LIKE {}{}", col, placeholder, self.dialect.like_escape())
            }
            _ => {
                let placeholder = params.bind(operand.clone(), self.dialect);
                format!("{} LIKE {}", col, placeholder)
            }
        }
    }

    fn render_membership(&self, field: &str, values: &[Value], params: &mut SqlParams) -> String {
        let placeholders: Vec<String> = values
            .iter()
            .map(|v| params.bind(v.clone(), self.dialect))
            .collect();
        format!(
            "{} IN ({})",
            self.dialect.quote_ident(field),
            placeholders.join(", ")
        )
    }
}

/// Text of a string or number operand used as a literal match
///
/// Other operands have no substring form and are passed through unchanged.
pub(crate) fn literal_text(operand: &Value) -> Option<String> {
    match operand {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
