//! Update compilation
//!
//! An update map assigns plain keys and increments the fields listed under
//! `$inc$` (either `{"$inc$": {"balance": 100}}` or `{"$inc$balance": 100}`).

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::Filter;
use super::error::FilterError;
use super::parser::{normalize_field, parse_key};
use super::sql::{SqlClause, SqlParams};
use super::tag::Connector;
use crate::sql::SqlDialect;

/// How a field is changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assign {
    Set,
    Increment,
}

/// Validated update, one entry per field in field order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePlan {
    assignments: BTreeMap<String, (Assign, Value)>,
}

impl UpdatePlan {
    /// Validate an update map
    pub fn parse(update: &Filter, fold_case: bool) -> Result<Self, FilterError> {
        let mut entries: Vec<(&String, &Value)> = update.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut plan = Self::default();
        for (raw_key, value) in entries {
            let key = parse_key(raw_key, fold_case)?;
            if let Some(comparator) = key.comparator {
                let tag = comparator.tag().unwrap_or(raw_key.as_str());
                return Err(FilterError::invalid_operator(tag));
            }
            match key.connector {
                None => plan.insert(key.field, Assign::Set, value.clone())?,
                Some(Connector::Inc) if key.field.is_empty() => {
                    let Value::Object(amounts) = value else {
                        return Err(FilterError::InvalidIncrement);
                    };
                    for (field, amount) in amounts {
                        let field = normalize_field(field, fold_case)
                            .map_err(|_| FilterError::invalid_key(field.as_str()))?;
                        plan.insert(field, Assign::Increment, amount_value(amount)?)?;
                    }
                }
                Some(Connector::Inc) => {
                    plan.insert(key.field, Assign::Increment, amount_value(value)?)?;
                }
                Some(other) => return Err(FilterError::invalid_operator(other.tag())),
            }
        }
        Ok(plan)
    }

    fn insert(&mut self, field: String, assign: Assign, value: Value) -> Result<(), FilterError> {
        if self.assignments.contains_key(&field) {
            return Err(FilterError::FormatConflict(field));
        }
        self.assignments.insert(field, (assign, value));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Number of bind values the SET list consumes
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Render the SET list, e.g. `"balance" = "balance" + $1, "name" = $2`
    pub fn to_sql(&self, dialect: &dyn SqlDialect, params: &mut SqlParams) -> String {
        self.assignments
            .iter()
            .map(|(field, (assign, value))| {
                let col = dialect.quote_ident(field);
                let placeholder = params.bind(value.clone(), dialect);
                match assign {
                    Assign::Set => format!("{} = {}", col, placeholder),
                    Assign::Increment => format!("{} = {} + {}", col, col, placeholder),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render as a clause with its own parameter list
    pub fn to_clause(&self, dialect: &dyn SqlDialect) -> SqlClause {
        let mut params = SqlParams::new();
        let sql = self.to_sql(dialect, &mut params);
        SqlClause {
            sql,
            values: params.values,
        }
    }

    /// Render as `{"$inc": {...}, "$set": {...}}`, omitting empty parts
    pub fn to_document(&self) -> Filter {
        let mut inc = Map::new();
        let mut set = Map::new();
        for (field, (assign, value)) in &self.assignments {
            match assign {
                Assign::Set => set.insert(field.clone(), value.clone()),
                Assign::Increment => inc.insert(field.clone(), value.clone()),
            };
        }

        let mut doc = Filter::new();
        if !inc.is_empty() {
            doc.insert(Connector::Inc.document_op().to_string(), Value::Object(inc));
        }
        if !set.is_empty() {
            doc.insert("$set".to_string(), Value::Object(set));
        }
        doc
    }
}

fn amount_value(amount: &Value) -> Result<Value, FilterError> {
    match amount {
        Value::Number(_) => Ok(amount.clone()),
        _ => Err(FilterError::InvalidIncrement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{MysqlDialect, PostgresDialect};
    use serde_json::json;

    fn plan(value: Value) -> Result<UpdatePlan, FilterError> {
        UpdatePlan::parse(value.as_object().unwrap(), true)
    }

    #[test]
    fn set_and_increment_sql() {
        let plan = plan(json!({"name": "jack", "$inc$": {"balance": 100}})).unwrap();
        let clause = plan.to_clause(&PostgresDialect);
        assert_eq!(clause.sql, r#""balance" = "balance" + $1, "name" = $2"#);
        assert_eq!(clause.values, vec![json!(100), json!("jack")]);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn field_on_increment_key() {
        let plan = plan(json!({"$inc$Visits": 1})).unwrap();
        assert_eq!(plan.to_clause(&MysqlDialect).sql, "`visits` = `visits` + ?");
    }

    #[test]
    fn document_form() {
        let plan = plan(json!({"name": "jack", "$inc$": {"balance": -5}})).unwrap();
        assert_eq!(
            Value::Object(plan.to_document()),
            json!({"$inc": {"balance": -5}, "$set": {"name": "jack"}})
        );
        let only_set = UpdatePlan::parse(json!({"a": 1}).as_object().unwrap(), true).unwrap();
        assert_eq!(Value::Object(only_set.to_document()), json!({"$set": {"a": 1}}));
    }

    #[test]
    fn rejects_bad_increments() {
        assert_eq!(
            plan(json!({"$inc$": 5})),
            Err(FilterError::InvalidIncrement)
        );
        assert_eq!(
            plan(json!({"$inc$": {"balance": "ten"}})),
            Err(FilterError::InvalidIncrement)
        );
        assert!(matches!(
            plan(json!({"$inc$": {"bad field": 1}})),
            Err(FilterError::InvalidKey(_))
        ));
    }

    #[test]
    fn rejects_conflicts_and_other_tags() {
        assert_eq!(
            plan(json!({"balance": 1, "$inc$": {"balance": 2}})),
            Err(FilterError::FormatConflict("balance".to_string()))
        );
        assert_eq!(
            plan(json!({"$inc$a": 1, "$inc$": {"a": 2}})),
            Err(FilterError::FormatConflict("a".to_string()))
        );
        assert_eq!(
            plan(json!({"$or$": [{"a": 1}]})),
            Err(FilterError::InvalidOperator("$or$".to_string()))
        );
        assert_eq!(
            plan(json!({"age$gte$": 1})),
            Err(FilterError::InvalidOperator("$gte$".to_string()))
        );
    }

    #[test]
    fn empty_update() {
        let plan = plan(json!({})).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.to_clause(&PostgresDialect), SqlClause::default());
        assert!(plan.to_document().is_empty());
    }
}
