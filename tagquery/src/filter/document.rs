//! Document-store query emitter
//!
//! Renders node lists into the operator-object form understood by document
//! databases: `{"age": {"$gte": 30}, "$or": [...], "$and": [...]}`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::sql::literal_text;
use super::tag::{Comparator, Connector};
use super::tree::{Logic, Node, Predicate};
use super::{Filter, LikeMode};

/// Renders node lists into document queries
#[derive(Debug, Clone, Copy)]
pub struct DocumentEmitter {
    like_mode: LikeMode,
}

/// Output under construction for one filter level
#[derive(Default)]
struct Level {
    fields: BTreeMap<String, Value>,
    and_list: Vec<Value>,
}

impl Level {
    /// Add a field condition, merging disjoint operator objects on the same field
    fn put_field(&mut self, field: &str, value: Value) {
        let Some(existing) = self.fields.get_mut(field) else {
            self.fields.insert(field.to_string(), value);
            return;
        };
        if let Some(current) = operator_object(existing)
            && let Some(incoming) = operator_object(&value)
            && incoming.keys().all(|k| !current.contains_key(k))
        {
            let incoming = incoming.clone();
            if let Value::Object(current) = existing {
                current.extend(incoming);
            }
            return;
        }
        self.and_list.push(single(field, value));
    }

    fn finish(mut self) -> Filter {
        if !self.and_list.is_empty() {
            self.fields.insert(
                Connector::And.document_op().to_string(),
                Value::Array(self.and_list),
            );
        }
        self.fields.into_iter().collect()
    }
}

impl DocumentEmitter {
    pub fn new(like_mode: LikeMode) -> Self {
        Self { like_mode }
    }

    /// Render one level of nodes into a document map
    pub fn emit(&self, nodes: &[Node]) -> Filter {
        let or_groups = nodes
            .iter()
            .filter(|n| matches!(n, Node::Group { logic: Logic::Or, .. }))
            .count();

        let mut level = Level::default();
        for node in nodes {
            match node {
                Node::Leaf(predicate) => {
                    level.put_field(&predicate.field, self.leaf_value(predicate));
                }
                Node::Membership { field, values } => {
                    let value = single(Connector::In.document_op(), Value::Array(values.clone()));
                    level.put_field(field, value);
                }
                Node::Group {
                    logic: Logic::And,
                    members,
                } => {
                    level
                        .and_list
                        .extend(members.iter().map(|m| Value::Object(self.emit(m))));
                }
                Node::Group {
                    logic: Logic::Or,
                    members,
                } => {
                    let list = Value::Array(
                        members
                            .iter()
                            .map(|m| Value::Object(self.emit(m)))
                            .collect(),
                    );
                    let op = Connector::Or.document_op();
                    // A map holds one `$or`; several groups are ANDed together
                    if or_groups == 1 {
                        level.fields.insert(op.to_string(), list);
                    } else {
                        level.and_list.push(single(op, list));
                    }
                }
            }
        }
        level.finish()
    }

    fn leaf_value(&self, predicate: &Predicate) -> Value {
        match predicate.comparator {
            Comparator::Eq => predicate.operand.clone(),
            Comparator::Like | Comparator::Text if predicate.operand.is_null() => Value::Null,
            Comparator::Like | Comparator::Text => {
                let pattern = match (self.like_mode, literal_text(&predicate.operand)) {
                    (LikeMode::Contains, Some(text)) => Value::String(regex::escape(&text)),
                    _ => predicate.operand.clone(),
                };
                let mut object = Map::new();
                object.insert("$options".to_string(), Value::String("i".to_string()));
                object.insert("$regex".to_string(), pattern);
                Value::Object(object)
            }
            comparator => match comparator.document_op() {
                Some(op) => single(op, predicate.operand.clone()),
                None => predicate.operand.clone(),
            },
        }
    }
}

/// Operator objects are maps whose keys are all `$` operators
fn operator_object(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => {
            Some(map)
        }
        _ => None,
    }
}

/// One-entry map
fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}
