//! Query filters and find options.
//!
//! Filters are conjunctions of equality clauses on dotted paths, matching
//! the subset of the document-database query language the kernel uses:
//!
//! ```text
//! {"type": "version", "parent": <subset id>}   sort: [("name", Descending)]   limit: 1
//! ```
//!
//! A clause on an array field matches when the array contains the value,
//! and a `null` clause matches a missing field.

use std::cmp::Ordering;

use avalon_types::{DocumentId, DocumentKind};
use serde_json::{Map, Value};

/// A conjunction of `path == value` clauses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// A filter matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match documents of the given kind.
    pub fn kind(kind: DocumentKind) -> Self {
        Self::new().eq("type", kind.as_str())
    }

    /// Match the document with the given id.
    pub fn by_id(id: DocumentId) -> Self {
        Self::new().eq("_id", id)
    }

    /// Add an equality clause on a dotted path.
    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((path.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    /// Whether `doc` satisfies every clause.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(path, expected)| match (lookup(doc, path), expected) {
                (None, Value::Null) => true,
                (None, _) => false,
                (Some(Value::Array(items)), expected) if !expected.is_array() => {
                    items.contains(expected)
                }
                (Some(actual), expected) => actual == expected,
            })
    }
}

/// Resolve a dotted path (`data.families`) inside a JSON document.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(doc, |current, segment| current.as_object()?.get(segment))
}

/// Sort direction of a find.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Projection, sort and limit applied to the matches of a find.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOptions {
    /// Dotted paths to keep. `_id` is always kept. `None` keeps everything.
    pub projection: Option<Vec<String>>,
    pub sort: Vec<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, path: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((path.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn project<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Sort, truncate and project `docs`, in that order.
    pub fn apply(&self, mut docs: Vec<Value>) -> Vec<Value> {
        if !self.sort.is_empty() {
            docs.sort_by(|a, b| {
                self.sort
                    .iter()
                    .map(|(path, order)| {
                        let ord = compare_values(lookup(a, path), lookup(b, path));
                        match order {
                            SortOrder::Ascending => ord,
                            SortOrder::Descending => ord.reverse(),
                        }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        match &self.projection {
            Some(paths) => docs.iter().map(|doc| project(doc, paths)).collect(),
            None => docs,
        }
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order over JSON values: missing/null, numbers, strings, objects,
/// arrays, booleans.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn project(doc: &Value, paths: &[String]) -> Value {
    let mut out = Map::new();
    let keep = std::iter::once("_id").chain(paths.iter().map(String::as_str));
    for path in keep {
        if let Some(value) = lookup(doc, path) {
            insert_path(&mut out, path, value.clone());
        }
    }
    Value::Object(out)
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equality_and_dotted_paths() {
        let doc = json!({"type": "version", "name": 3, "data": {"author": "bruce"}});
        assert!(Filter::new().eq("type", "version").eq("name", 3).matches(&doc));
        assert!(Filter::new().eq("data.author", "bruce").matches(&doc));
        assert!(!Filter::new().eq("data.author", "alfred").matches(&doc));
        assert!(!Filter::new().eq("data.missing", "x").matches(&doc));
    }

    #[test]
    fn null_matches_missing_field() {
        let doc = json!({"type": "project", "parent": null});
        assert!(Filter::new().eq("parent", Value::Null).matches(&doc));
        let doc = json!({"type": "project"});
        assert!(Filter::new().eq("parent", Value::Null).matches(&doc));
    }

    #[test]
    fn array_fields_match_by_membership() {
        let doc = json!({"data": {"families": ["model", "rig"]}});
        assert!(Filter::new().eq("data.families", "rig").matches(&doc));
        assert!(!Filter::new().eq("data.families", "look").matches(&doc));
        assert!(Filter::new()
            .eq("data.families", json!(["model", "rig"]))
            .matches(&doc));
    }

    #[test]
    fn sort_limit_and_projection() {
        let docs = vec![
            json!({"_id": "a", "name": 1, "data": {"x": 1, "y": 2}}),
            json!({"_id": "b", "name": 3, "data": {"x": 3, "y": 4}}),
            json!({"_id": "c", "name": 2, "data": {"x": 2, "y": 3}}),
        ];
        let options = FindOptions::new()
            .sort_by("name", SortOrder::Descending)
            .limit(2)
            .project(["data.x"]);
        let out = options.apply(docs);
        assert_eq!(
            out,
            vec![
                json!({"_id": "b", "data": {"x": 3}}),
                json!({"_id": "c", "data": {"x": 2}}),
            ]
        );
    }

    #[test]
    fn missing_sort_keys_order_first() {
        let docs = vec![json!({"name": "b"}), json!({}), json!({"name": "a"})];
        let out = FindOptions::new()
            .sort_by("name", SortOrder::Ascending)
            .apply(docs);
        assert_eq!(out, vec![json!({}), json!({"name": "a"}), json!({"name": "b"})]);
    }
}
