//! Expression tree builder
//!
//! Walks a filter map in lexicographic key order and produces the node list
//! both emitters consume. The tree never outlives a single translation call.

use serde_json::Value;

use super::Filter;
use super::error::FilterError;
use super::parser::{ParsedKey, parse_key, resolve_operand};
use super::tag::{Comparator, Connector, Tag};

/// A single field predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub comparator: Comparator,
    pub operand: Value,
}

/// Boolean connective of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    Or,
    And,
}

impl Logic {
    /// Separator placed between rendered SQL members
    pub fn sql_sep(&self) -> &'static str {
        match self {
            Logic::Or => " OR ",
            Logic::And => " AND ",
        }
    }
}

/// Node of a compiled filter level
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Predicate),
    /// `$in$field: [..]`
    Membership { field: String, values: Vec<Value> },
    /// `$or$`/`$and$` group; each member is the node list of one list element
    Group { logic: Logic, members: Vec<Vec<Node>> },
}

/// Builds node lists from filter maps
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder {
    max_depth: usize,
    fold_case: bool,
}

impl TreeBuilder {
    pub fn new(max_depth: usize, fold_case: bool) -> Self {
        Self {
            max_depth,
            fold_case,
        }
    }

    /// Build the top level of a filter
    pub fn build(&self, filter: &Filter) -> Result<Vec<Node>, FilterError> {
        self.build_level(filter, 0)
    }

    fn build_level(&self, map: &Filter, depth: usize) -> Result<Vec<Node>, FilterError> {
        if depth > self.max_depth {
            return Err(FilterError::DepthExceeded(self.max_depth));
        }
        tracing::trace!(depth, keys = map.len(), "Building filter level");

        // Map iteration order is not part of the input's meaning
        let mut entries: Vec<(&String, &Value)> = map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut nodes = Vec::with_capacity(entries.len());
        for (raw_key, value) in entries {
            let key = parse_key(raw_key, self.fold_case)?;
            match key.connector {
                None => {
                    let (comparator, operand) =
                        resolve_operand(&key.field, key.comparator, value)?;
                    nodes.push(Node::Leaf(Predicate {
                        field: key.field,
                        comparator,
                        operand,
                    }));
                }
                Some(Connector::Or) => {
                    nodes.extend(self.build_group(Logic::Or, &key, raw_key, value, depth)?);
                }
                Some(Connector::And) => {
                    nodes.extend(self.build_group(Logic::And, &key, raw_key, value, depth)?);
                }
                Some(Connector::In) => {
                    nodes.push(build_membership(&key, raw_key, value)?);
                }
                Some(Connector::Inc) => {
                    return Err(FilterError::invalid_operator(Connector::Inc.tag()));
                }
            }
        }
        Ok(nodes)
    }

    /// Build a connector group
    ///
    /// Map elements are nested filters built one level deeper. With a field
    /// on the key (`$or$age`) scalars and `{"$gte$": 30}` operand maps are
    /// operands of that field. Without one (`$or$`) scalars are rejected.
    /// Returns `None` when no member survives.
    fn build_group(
        &self,
        logic: Logic,
        key: &ParsedKey,
        raw_key: &str,
        value: &Value,
        depth: usize,
    ) -> Result<Option<Node>, FilterError> {
        let mut members = Vec::new();
        for element in as_list(value) {
            let member = match element {
                Value::Object(map) if key.field.is_empty() => self.build_level(map, depth + 1)?,
                _ if key.field.is_empty() => return Err(FilterError::invalid_key(raw_key)),
                // A key comparator claims every map, so `{"x": 1}` there is a conflict
                Value::Object(map) if key.comparator.is_none() && !is_operand_map(map) => {
                    self.build_level(map, depth + 1)?
                }
                _ => {
                    let (comparator, operand) =
                        resolve_operand(&key.field, key.comparator, element)?;
                    vec![Node::Leaf(Predicate {
                        field: key.field.clone(),
                        comparator,
                        operand,
                    })]
                }
            };
            if !member.is_empty() {
                members.push(member);
            }
        }
        Ok((!members.is_empty()).then_some(Node::Group { logic, members }))
    }
}

fn build_membership(key: &ParsedKey, raw_key: &str, value: &Value) -> Result<Node, FilterError> {
    if key.field.is_empty() {
        return Err(FilterError::invalid_key(raw_key));
    }
    if key.comparator.is_some() {
        return Err(FilterError::FormatConflict(key.field.clone()));
    }
    let items = as_list(value);
    if items.is_empty() {
        return Err(FilterError::EmptyMembership(key.field.clone()));
    }
    if let Some(Value::Object(map)) = items.iter().find(|v| v.is_object()) {
        return Err(FilterError::AmbiguousOperand {
            field: key.field.clone(),
            len: map.len(),
        });
    }
    Ok(Node::Membership {
        field: key.field.clone(),
        values: items.to_vec(),
    })
}

/// `{"$gte$": 30}`: exactly one entry keyed by a comparator tag
pub(super) fn is_operand_map(map: &Filter) -> bool {
    let mut keys = map.keys();
    match (keys.next(), keys.next()) {
        (Some(token), None) => matches!(Tag::from_token(token), Some(Tag::Comparator(_))),
        _ => false,
    }
}

/// A list value as-is, anything else as a one-element list
fn as_list(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(value: Value) -> Result<Vec<Node>, FilterError> {
        let filter = value.as_object().cloned().unwrap();
        TreeBuilder::new(5, true).build(&filter)
    }

    fn leaf(field: &str, comparator: Comparator, operand: Value) -> Node {
        Node::Leaf(Predicate {
            field: field.to_string(),
            comparator,
            operand,
        })
    }

    #[test]
    fn leaves_in_key_order() {
        let nodes = build(json!({"skip": 20, "age": "$gte$30", "limit": 10})).unwrap();
        assert_eq!(
            nodes,
            vec![
                leaf("age", Comparator::Gte, json!("30")),
                leaf("limit", Comparator::Eq, json!(10)),
                leaf("skip", Comparator::Eq, json!(20)),
            ]
        );
    }

    #[test]
    fn field_group_from_scalars() {
        let nodes = build(json!({"$or$age": ["$lte$30", "$gte$40"]})).unwrap();
        assert_eq!(
            nodes,
            vec![Node::Group {
                logic: Logic::Or,
                members: vec![
                    vec![leaf("age", Comparator::Lte, json!("30"))],
                    vec![leaf("age", Comparator::Gte, json!("40"))],
                ],
            }]
        );
    }

    #[test]
    fn key_comparator_applies_to_every_member() {
        let nodes = build(json!({"$or$age$gt$": [1, 2]})).unwrap();
        assert_eq!(
            nodes,
            vec![Node::Group {
                logic: Logic::Or,
                members: vec![
                    vec![leaf("age", Comparator::Gt, json!(1))],
                    vec![leaf("age", Comparator::Gt, json!(2))],
                ],
            }]
        );
    }

    #[test]
    fn field_group_accepts_operand_maps() {
        let nodes = build(json!({"$and$age": [{"$gte$": 30}, {"$lte$": 40}]})).unwrap();
        assert_eq!(
            nodes,
            vec![Node::Group {
                logic: Logic::And,
                members: vec![
                    vec![leaf("age", Comparator::Gte, json!(30))],
                    vec![leaf("age", Comparator::Lte, json!(40))],
                ],
            }]
        );
    }

    #[test]
    fn field_group_recurses_into_sub_filters() {
        let nodes = build(json!({"$or$age": [{"name": "x"}, {"city": "y"}]})).unwrap();
        assert_eq!(
            nodes,
            vec![Node::Group {
                logic: Logic::Or,
                members: vec![
                    vec![leaf("name", Comparator::Eq, json!("x"))],
                    vec![leaf("city", Comparator::Eq, json!("y"))],
                ],
            }]
        );
    }

    #[test]
    fn field_group_mixes_operands_and_sub_filters() {
        let nodes = build(json!({"$or$age": [{"$gte$": 30}, {"name": "x", "age$lt$": 5}]}))
            .unwrap();
        assert_eq!(
            nodes,
            vec![Node::Group {
                logic: Logic::Or,
                members: vec![
                    vec![leaf("age", Comparator::Gte, json!(30))],
                    vec![
                        leaf("age", Comparator::Lt, json!(5)),
                        leaf("name", Comparator::Eq, json!("x")),
                    ],
                ],
            }]
        );
    }

    #[test]
    fn field_group_sub_filters_count_depth() {
        let builder = TreeBuilder::new(0, true);
        let keyed = json!({"$or$age": [{"name": "x"}]}).as_object().cloned().unwrap();
        assert_eq!(builder.build(&keyed), Err(FilterError::DepthExceeded(0)));
    }

    #[test]
    fn key_comparator_rejects_map_members() {
        assert_eq!(
            build(json!({"$or$age$gt$": [{"name": "x"}]})),
            Err(FilterError::FormatConflict("age".to_string()))
        );
        assert_eq!(
            build(json!({"$or$age$gt$": [{"$lt$": 1}]})),
            Err(FilterError::FormatConflict("age".to_string()))
        );
    }

    #[test]
    fn non_list_connector_value_is_one_member() {
        let nodes = build(json!({"$and$": {"a": 1, "b": 2}})).unwrap();
        assert_eq!(
            nodes,
            vec![Node::Group {
                logic: Logic::And,
                members: vec![vec![
                    leaf("a", Comparator::Eq, json!(1)),
                    leaf("b", Comparator::Eq, json!(2)),
                ]],
            }]
        );
    }

    #[test]
    fn empty_members_and_groups_are_dropped() {
        assert_eq!(build(json!({"$or$": [{}, {}]})).unwrap(), vec![]);
        assert_eq!(build(json!({"$or$": []})).unwrap(), vec![]);
    }

    #[test]
    fn bare_connector_rejects_scalars() {
        assert_eq!(
            build(json!({"$or$": ["a", "b"]})),
            Err(FilterError::InvalidKey("$or$".to_string()))
        );
    }

    #[test]
    fn membership() {
        let nodes = build(json!({"$in$status": [1, "2"]})).unwrap();
        assert_eq!(
            nodes,
            vec![Node::Membership {
                field: "status".to_string(),
                values: vec![json!(1), json!("2")],
            }]
        );
    }

    #[test]
    fn membership_errors() {
        assert_eq!(
            build(json!({"$in$status": []})),
            Err(FilterError::EmptyMembership("status".to_string()))
        );
        assert!(matches!(
            build(json!({"$in$status": [{"a": 1}]})),
            Err(FilterError::AmbiguousOperand { .. })
        ));
        assert_eq!(
            build(json!({"$in$": [1]})),
            Err(FilterError::InvalidKey("$in$".to_string()))
        );
        assert_eq!(
            build(json!({"$in$age$gt$": [1]})),
            Err(FilterError::FormatConflict("age".to_string()))
        );
    }

    #[test]
    fn increment_is_not_a_predicate() {
        assert_eq!(
            build(json!({"$inc$": {"balance": 1}})),
            Err(FilterError::InvalidOperator("$inc$".to_string()))
        );
    }

    #[test]
    fn depth_limit_counts_nested_levels() {
        fn nested(levels: usize) -> Value {
            let mut value = json!({"leaf": 1});
            for _ in 0..levels {
                value = json!({"$and$": [value]});
            }
            value
        }
        // Five connector levels put the innermost map at depth 5
        assert!(build(nested(5)).is_ok());
        assert_eq!(build(nested(6)), Err(FilterError::DepthExceeded(5)));
    }

    #[test]
    fn zero_depth_allows_only_flat_filters() {
        let builder = TreeBuilder::new(0, true);
        let flat = json!({"a": 1}).as_object().cloned().unwrap();
        let nested = json!({"$or$": [{"a": 1}]}).as_object().cloned().unwrap();
        assert!(builder.build(&flat).is_ok());
        assert_eq!(builder.build(&nested), Err(FilterError::DepthExceeded(0)));
    }
}
