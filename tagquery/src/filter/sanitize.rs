//! Safe-filter sanitizer and sort-key allow-listing
//!
//! Client-supplied filters are pruned before compilation: an allow-list keeps
//! only known fields, a deny-list strips forbidden ones (at any depth), and
//! defaults overwrite top-level entries the server must control.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use super::Filter;
use super::error::FilterError;
use super::parser::{normalize_field, split_key};
use super::tag::{Connector, Tag};
use super::tree::is_operand_map;
use crate::core::constants::DEFAULT_MAX_DEPTH;

/// Which list a pass enforces
#[derive(Clone, Copy)]
enum Mode<'a> {
    Allow(&'a HashSet<String>),
    Deny(&'a HashSet<String>),
}

impl Mode<'_> {
    fn keeps(&self, field: &str) -> bool {
        match self {
            Mode::Allow(fields) => fields.contains(field),
            Mode::Deny(fields) => !fields.contains(field),
        }
    }
}

/// Allow/deny/default pruning of a filter map
#[derive(Debug, Clone)]
pub struct Sanitizer {
    allow: Option<Vec<String>>,
    deny: Option<Vec<String>>,
    defaults: Filter,
    fold_case: bool,
    max_depth: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            allow: None,
            deny: None,
            defaults: Filter::new(),
            fold_case: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only these fields
    pub fn allow<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Remove these fields wherever they appear
    pub fn deny<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Top-level values written after pruning, replacing any client value
    pub fn defaults(mut self, defaults: Filter) -> Self {
        self.defaults = defaults;
        self
    }

    /// Compare fields after lowercasing, matching the compiler's folding
    pub fn fold_case(mut self, fold_case: bool) -> Self {
        self.fold_case = fold_case;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sanitize `filter` in place
    ///
    /// On error the filter may be partially pruned and must not be used.
    pub fn apply(&self, filter: &mut Filter) -> Result<(), FilterError> {
        let before = filter.len();

        if let Some(allow) = &self.allow {
            let fields = self.field_set(allow);
            self.prune(filter, Mode::Allow(&fields), 0)?;
        }
        if let Some(deny) = &self.deny {
            let fields = self.field_set(deny);
            self.prune(filter, Mode::Deny(&fields), 0)?;
        }
        for (key, value) in &self.defaults {
            filter.insert(key.clone(), value.clone());
        }

        tracing::debug!(
            before,
            after = filter.len(),
            defaults = self.defaults.len(),
            "Sanitized filter"
        );
        Ok(())
    }

    fn fold(&self, field: &str) -> String {
        if self.fold_case {
            field.to_lowercase()
        } else {
            field.to_string()
        }
    }

    fn field_set(&self, fields: &[String]) -> HashSet<String> {
        fields.iter().map(|f| self.fold(f)).collect()
    }

    fn prune(&self, map: &mut Filter, mode: Mode<'_>, depth: usize) -> Result<(), FilterError> {
        if depth > self.max_depth {
            return Err(FilterError::DepthExceeded(self.max_depth));
        }

        let mut error = None;
        map.retain(|key, value| {
            if error.is_some() {
                return true;
            }
            let parts = split_key(key);
            let field = self.fold(parts.field);
            let connector = match parts.prefix.and_then(Tag::from_token) {
                Some(Tag::Connector(c)) => Some(c),
                _ => None,
            };
            match connector {
                Some(Connector::Or | Connector::And)
                    if field.is_empty() || mode.keeps(&field) =>
                {
                    match self.prune_group(value, mode, depth) {
                        Ok(keep) => keep,
                        Err(e) => {
                            error = Some(e);
                            true
                        }
                    }
                }
                _ => !field.is_empty() && mode.keeps(&field),
            }
        });

        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Prune the nested filters of a connector group; returns whether it survives
    ///
    /// Scalars and `{"$gte$": 30}` operand maps are kept as they are.
    fn prune_group(
        &self,
        value: &mut Value,
        mode: Mode<'_>,
        depth: usize,
    ) -> Result<bool, FilterError> {
        let items = match value.take() {
            Value::Array(items) => items,
            other => vec![other],
        };

        let mut kept = Vec::with_capacity(items.len());
        for mut item in items {
            if let Value::Object(map) = &mut item
                && !is_operand_map(map)
            {
                self.prune(map, mode, depth + 1)?;
                if map.is_empty() {
                    continue;
                }
            }
            kept.push(item);
        }

        let keep = !kept.is_empty();
        *value = Value::Array(kept);
        Ok(keep)
    }
}

/// A validated ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    /// Parse `+field`, `-field` or `field` (ascending)
    pub fn parse(s: &str, fold_case: bool) -> Result<Self, FilterError> {
        let (descending, field) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let field = normalize_field(field, fold_case).map_err(|_| FilterError::invalid_key(s))?;
        Ok(Self { field, descending })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.descending { '-' } else { '+' };
        write!(f, "{}{}", sign, self.field)
    }
}

/// Filter requested sort keys against an allow-list
///
/// Matching ignores case and the `+`/`-` direction prefix of allow entries.
/// Accepted inputs are returned as given; when none survive (or none were
/// requested) the defaults are returned. Without an allow-list the inputs
/// pass through unchecked.
pub fn sort_safe<A, D, I>(allow: Option<&[A]>, defaults: &[D], inputs: &[I]) -> Vec<String>
where
    A: AsRef<str>,
    D: AsRef<str>,
    I: AsRef<str>,
{
    let to_strings = |items: &[D]| -> Vec<String> {
        items.iter().map(|s| s.as_ref().to_string()).collect()
    };

    let Some(allow) = allow else {
        if inputs.is_empty() {
            return to_strings(defaults);
        }
        return inputs.iter().map(|s| s.as_ref().to_string()).collect();
    };

    let mut valid = HashSet::new();
    for entry in allow {
        let lower = entry.as_ref().to_lowercase();
        let bare = lower.trim_start_matches(['+', '-']);
        valid.insert(bare.to_string());
        valid.insert(format!("+{}", bare));
        valid.insert(format!("-{}", bare));
    }

    let result: Vec<String> = inputs
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| valid.contains(&s.to_lowercase()))
        .map(str::to_string)
        .collect();

    if result.is_empty() {
        to_strings(defaults)
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter(value: Value) -> Filter {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn allow_deny_defaults() {
        let mut m = filter(json!({
            "uid": "something not allowed",
            "name": "jack",
            "city": "nanning",
            "$or$": [{"$and$": [{"uid": "nested"}, {"habit": "football"}]}]
        }));
        Sanitizer::new()
            .allow(["name", "habit"])
            .deny(["uid"])
            .defaults(filter(json!({"country": "china"})))
            .apply(&mut m)
            .unwrap();
        assert_eq!(
            Value::Object(m),
            json!({
                "$or$": [{"$and$": [{"habit": "football"}]}],
                "country": "china",
                "name": "jack"
            })
        );
    }

    #[test]
    fn deny_reaches_nested_levels() {
        let mut m = filter(json!({
            "name": "a",
            "$and$": [{"uid": 1}, {"$or$": [{"uid": 2}, {"age": 3}]}]
        }));
        Sanitizer::new().deny(["uid"]).apply(&mut m).unwrap();
        assert_eq!(
            Value::Object(m),
            json!({"name": "a", "$and$": [{"$or$": [{"age": 3}]}]})
        );
    }

    #[test]
    fn emptied_groups_are_removed() {
        let mut m = filter(json!({"name": "a", "$or$": [{"uid": 1}, {"uid": 2}]}));
        Sanitizer::new().deny(["uid"]).apply(&mut m).unwrap();
        assert_eq!(Value::Object(m), json!({"name": "a"}));
    }

    #[test]
    fn tagged_keys_are_judged_by_field() {
        let mut m = filter(json!({
            "age$gte$": 18,
            "$or$city": ["a", "b"],
            "$in$uid": [1, 2],
            "name": "$like$ja%"
        }));
        Sanitizer::new()
            .allow(["age", "city", "uid", "name"])
            .deny(["uid"])
            .apply(&mut m)
            .unwrap();
        assert_eq!(
            Value::Object(m),
            json!({"age$gte$": 18, "$or$city": ["a", "b"], "name": "$like$ja%"})
        );
    }

    #[test]
    fn deny_reaches_sub_filters_of_keyed_groups() {
        let mut m = filter(json!({
            "$or$age": [{"$gte$": 30}, {"uid": 1}, {"uid": 2, "name": "a"}]
        }));
        Sanitizer::new().deny(["uid"]).apply(&mut m).unwrap();
        assert_eq!(
            Value::Object(m),
            json!({"$or$age": [{"$gte$": 30}, {"name": "a"}]})
        );

        let mut m = filter(json!({"$and$age": [{"uid": 1}], "name": "a"}));
        Sanitizer::new().deny(["uid"]).apply(&mut m).unwrap();
        assert_eq!(Value::Object(m), json!({"name": "a"}));
    }

    #[test]
    fn case_variants_cannot_bypass_deny() {
        let mut m = filter(json!({"UID": 1, "Uid$ne$": 2, "name": "a"}));
        Sanitizer::new().deny(["uid"]).apply(&mut m).unwrap();
        assert_eq!(Value::Object(m), json!({"name": "a"}));
    }

    #[test]
    fn case_sensitive_when_not_folding() {
        let mut m = filter(json!({"UID": 1, "uid": 2}));
        Sanitizer::new()
            .fold_case(false)
            .deny(["uid"])
            .apply(&mut m)
            .unwrap();
        assert_eq!(Value::Object(m), json!({"UID": 1}));
    }

    #[test]
    fn empty_field_leaves_are_removed() {
        let mut m = filter(json!({"": 1, "$gte$": 2, "name": "a"}));
        Sanitizer::new().deny(["uid"]).apply(&mut m).unwrap();
        assert_eq!(Value::Object(m), json!({"name": "a"}));
    }

    #[test]
    fn defaults_overwrite_client_values() {
        let mut m = filter(json!({"tenant": "other", "name": "a"}));
        Sanitizer::new()
            .defaults(filter(json!({"tenant": "mine"})))
            .apply(&mut m)
            .unwrap();
        assert_eq!(Value::Object(m), json!({"tenant": "mine", "name": "a"}));
    }

    #[test]
    fn no_lists_leaves_filter_untouched() {
        let original = filter(json!({"x y": 1, "$or$": []}));
        let mut m = original.clone();
        Sanitizer::new().apply(&mut m).unwrap();
        assert_eq!(m, original);
    }

    #[test]
    fn depth_guard() {
        let mut value = json!({"uid": 1});
        for _ in 0..3 {
            value = json!({"$or$": [value]});
        }
        let mut m = filter(value);
        let err = Sanitizer::new()
            .max_depth(2)
            .deny(["uid"])
            .apply(&mut m)
            .unwrap_err();
        assert_eq!(err, FilterError::DepthExceeded(2));
    }

    #[test]
    fn sort_key_parse() {
        assert_eq!(
            SortKey::parse("-createTime", true).unwrap(),
            SortKey {
                field: "createtime".to_string(),
                descending: true
            }
        );
        assert_eq!(SortKey::parse("+name", true).unwrap().to_string(), "+name");
        assert_eq!(SortKey::parse("name", false).unwrap().to_string(), "+name");
        assert!(matches!(
            SortKey::parse("-", true),
            Err(FilterError::InvalidKey(_))
        ));
        assert!(matches!(
            SortKey::parse("a;b", true),
            Err(FilterError::InvalidKey(_))
        ));
    }

    #[test]
    fn sort_safe_filters_by_allow_list() {
        let allow = ["createTime", "status"];
        let res = sort_safe(Some(&allow[..]), &["-createTime"], &["+createTime", "updateTime"]);
        assert_eq!(res, vec!["+createTime"]);
    }

    #[test]
    fn sort_safe_falls_back_to_defaults() {
        let allow = ["-status"];
        let res = sort_safe(Some(&allow[..]), &["-createTime"], &["updateTime"]);
        assert_eq!(res, vec!["-createTime"]);

        let res = sort_safe(Some(&allow[..]), &["-createTime"], &["+STATUS", "status"]);
        assert_eq!(res, vec!["+STATUS", "status"]);
    }

    #[test]
    fn sort_safe_without_allow_list() {
        let inputs: [&str; 0] = [];
        assert_eq!(
            sort_safe(None::<&[&str]>, &["-id"], &inputs),
            vec!["-id"]
        );
        assert_eq!(
            sort_safe(None::<&[&str]>, &["-id"], &["anything"]),
            vec!["anything"]
        );
    }
}
