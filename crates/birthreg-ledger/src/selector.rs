//! JSON selector query engine.
//!
//! Queries are documents of the form:
//!
//! ```json
//! {"selector": {"child.lastName": "Morgan", "child.weightGrams": {"$gte": 3000}}, "limit": 10}
//! ```
//!
//! Besides `selector`, a query may carry `limit`, `skip`, `sort` (a list of
//! `"path"` or `{"path": "asc" | "desc"}`), `fields` (paths to project), and
//! `use_index` (an index hint with no effect on results). Any other key is
//! rejected rather than ignored.
//!
//! Field names may be dotted paths or nested objects. Supported operators:
//! `$eq $ne $gt $gte $lt $lte $in $nin $exists`, combined with
//! `$and $or $not`. Values of different JSON types order as
//! `null < false < true < number < string < array < object`.
//! A missing field fails every condition except `{"$exists": false}`.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::error::{LedgerError, LedgerResult};

/// Top-level query keys this engine understands.
const QUERY_KEYS: [&str; 6] = ["selector", "limit", "skip", "sort", "fields", "use_index"];

/// A parsed, validated selector query.
#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
    condition: Condition,
    limit: Option<usize>,
    skip: usize,
    sort: Vec<SortKey>,
    fields: Vec<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
struct SortKey {
    path: Vec<String>,
    descending: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Field { path: Vec<String>, op: FieldOp },
}

#[derive(Clone, Debug, PartialEq)]
enum FieldOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

impl Selector {
    /// Parse a query document.
    pub fn parse(query: &str) -> LedgerResult<Self> {
        let doc: Value = serde_json::from_str(query)
            .map_err(|e| LedgerError::InvalidQuery(format!("query is not valid JSON: {e}")))?;
        let doc = doc
            .as_object()
            .ok_or_else(|| invalid("query must be a JSON object"))?;
        if let Some(key) = doc.keys().find(|k| !QUERY_KEYS.contains(&k.as_str())) {
            return Err(invalid(format!("unsupported query key {key:?}")));
        }

        let selector = doc
            .get("selector")
            .ok_or_else(|| invalid("query has no \"selector\""))?
            .as_object()
            .ok_or_else(|| invalid("\"selector\" must be an object"))?;

        let limit = match doc.get("limit") {
            None => None,
            Some(v) => Some(parse_count(v, "limit")?),
        };
        let skip = match doc.get("skip") {
            None => 0,
            Some(v) => parse_count(v, "skip")?,
        };
        let sort = match doc.get("sort") {
            None => Vec::new(),
            Some(v) => parse_sort(v)?,
        };
        let fields = match doc.get("fields") {
            None => Vec::new(),
            Some(v) => parse_fields(v)?,
        };
        match doc.get("use_index") {
            None | Some(Value::String(_)) => {}
            Some(Value::Array(parts)) if parts.iter().all(Value::is_string) => {}
            Some(_) => return Err(invalid("\"use_index\" must be a string or array of strings")),
        }

        Ok(Self {
            condition: parse_object(selector, &[])?,
            limit,
            skip,
            sort,
            fields,
        })
    }

    /// Whether `doc` satisfies the selector.
    pub fn matches(&self, doc: &Value) -> bool {
        self.condition.eval(doc)
    }

    /// Maximum number of results, if the query set one.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Number of leading matches to skip.
    pub fn skip(&self) -> usize {
        self.skip
    }

    /// Order two matching documents by the query's sort keys. Documents
    /// missing a sort field order before those that have it. Without sort
    /// keys everything compares equal, so a stable sort keeps key order.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        self.sort
            .iter()
            .map(|key| {
                let ord = match (lookup(a, &key.path), lookup(b, &key.path)) {
                    (Some(x), Some(y)) => collate(x, y),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if key.descending {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Whether results are projected to a subset of fields.
    pub fn projects(&self) -> bool {
        !self.fields.is_empty()
    }

    /// The document reduced to the query's `fields`, or a copy of it when
    /// the query names none. Paths the document lacks are left out.
    pub fn project(&self, doc: &Value) -> Value {
        if self.fields.is_empty() {
            return doc.clone();
        }
        let mut out = Map::new();
        for path in &self.fields {
            if let Some(found) = lookup(doc, path) {
                insert_path(&mut out, path, found.clone());
            }
        }
        Value::Object(out)
    }
}

fn lookup<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |node, segment| node.get(segment))
}

fn insert_path(out: &mut Map<String, Value>, path: &[String], value: Value) {
    match path {
        [] => {}
        [last] => {
            out.insert(last.clone(), value);
        }
        [first, rest @ ..] => {
            let child = out
                .entry(first.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}

fn parse_path(name: &str) -> LedgerResult<Vec<String>> {
    let path: Vec<String> = name.split('.').map(str::to_string).collect();
    if path.iter().any(String::is_empty) {
        return Err(invalid(format!("empty path segment in field {name:?}")));
    }
    Ok(path)
}

fn parse_sort(value: &Value) -> LedgerResult<Vec<SortKey>> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid("\"sort\" must be an array"))?;
    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(SortKey {
                path: parse_path(name)?,
                descending: false,
            }),
            Value::Object(entry) => {
                let mut entries = entry.iter();
                let (Some((name, direction)), None) = (entries.next(), entries.next()) else {
                    return Err(invalid("sort objects must name exactly one field"));
                };
                let descending = match direction.as_str() {
                    Some("asc") => false,
                    Some("desc") => true,
                    _ => {
                        return Err(invalid(format!(
                            "sort direction for {name:?} must be \"asc\" or \"desc\""
                        )))
                    }
                };
                Ok(SortKey {
                    path: parse_path(name)?,
                    descending,
                })
            }
            _ => Err(invalid("sort items must be a field name or {\"field\": \"asc\"|\"desc\"}")),
        })
        .collect()
}

fn parse_fields(value: &Value) -> LedgerResult<Vec<Vec<String>>> {
    value
        .as_array()
        .ok_or_else(|| invalid("\"fields\" must be an array"))?
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| invalid("\"fields\" items must be strings"))
                .and_then(parse_path)
        })
        .collect()
}

fn invalid(reason: impl Into<String>) -> LedgerError {
    LedgerError::InvalidQuery(reason.into())
}

fn parse_count(value: &Value, name: &str) -> LedgerResult<usize> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(format!("\"{name}\" must be a non-negative integer")))
}

fn parse_object(object: &Map<String, Value>, prefix: &[String]) -> LedgerResult<Condition> {
    let mut conditions = Vec::with_capacity(object.len());
    for (name, value) in object {
        if let Some(op) = name.strip_prefix('$') {
            conditions.push(parse_operator(op, value, prefix)?);
        } else {
            let mut path = prefix.to_vec();
            path.extend(parse_path(name)?);
            conditions.push(parse_field(value, path)?);
        }
    }
    Ok(match conditions.len() {
        1 => conditions.remove(0),
        _ => Condition::And(conditions),
    })
}

fn parse_field(value: &Value, path: Vec<String>) -> LedgerResult<Condition> {
    match value {
        // Operators apply to this path; plain nested fields extend it.
        Value::Object(object) if !object.is_empty() => parse_object(object, &path),
        other => Ok(Condition::Field {
            path,
            op: FieldOp::Eq(other.clone()),
        }),
    }
}

fn parse_operator(op: &str, value: &Value, prefix: &[String]) -> LedgerResult<Condition> {
    match op {
        "and" | "or" => {
            let items = value
                .as_array()
                .filter(|a| !a.is_empty())
                .ok_or_else(|| invalid(format!("${op} expects a non-empty array")))?;
            let parsed = items
                .iter()
                .map(|item| {
                    item.as_object()
                        .ok_or_else(|| invalid(format!("${op} items must be objects")))
                        .and_then(|o| parse_object(o, prefix))
                })
                .collect::<LedgerResult<Vec<_>>>()?;
            Ok(if op == "and" {
                Condition::And(parsed)
            } else {
                Condition::Or(parsed)
            })
        }
        "not" => {
            let object = value
                .as_object()
                .ok_or_else(|| invalid("$not expects an object"))?;
            Ok(Condition::Not(Box::new(parse_object(object, prefix)?)))
        }
        _ if prefix.is_empty() => Err(invalid(format!(
            "operator ${op} must be applied to a field"
        ))),
        _ => Ok(Condition::Field {
            path: prefix.to_vec(),
            op: parse_field_op(op, value)?,
        }),
    }
}

fn parse_field_op(op: &str, value: &Value) -> LedgerResult<FieldOp> {
    let list = |value: &Value| {
        value
            .as_array()
            .cloned()
            .ok_or_else(|| invalid(format!("${op} expects an array")))
    };
    Ok(match op {
        "eq" => FieldOp::Eq(value.clone()),
        "ne" => FieldOp::Ne(value.clone()),
        "gt" => FieldOp::Gt(value.clone()),
        "gte" => FieldOp::Gte(value.clone()),
        "lt" => FieldOp::Lt(value.clone()),
        "lte" => FieldOp::Lte(value.clone()),
        "in" => FieldOp::In(list(value)?),
        "nin" => FieldOp::Nin(list(value)?),
        "exists" => FieldOp::Exists(
            value
                .as_bool()
                .ok_or_else(|| invalid("$exists expects a boolean"))?,
        ),
        other => return Err(invalid(format!("unsupported operator ${other}"))),
    })
}

impl Condition {
    fn eval(&self, doc: &Value) -> bool {
        match self {
            Self::And(items) => items.iter().all(|c| c.eval(doc)),
            Self::Or(items) => items.iter().any(|c| c.eval(doc)),
            Self::Not(inner) => !inner.eval(doc),
            Self::Field { path, op } => {
                match (lookup(doc, path), op) {
                    (None, FieldOp::Exists(expected)) => !expected,
                    (None, _) => false,
                    (Some(_), FieldOp::Exists(expected)) => *expected,
                    (Some(actual), op) => op.eval(actual),
                }
            }
        }
    }
}

impl FieldOp {
    fn eval(&self, actual: &Value) -> bool {
        match self {
            Self::Eq(v) => collate(actual, v) == Ordering::Equal,
            Self::Ne(v) => collate(actual, v) != Ordering::Equal,
            Self::Gt(v) => collate(actual, v) == Ordering::Greater,
            Self::Gte(v) => collate(actual, v) != Ordering::Less,
            Self::Lt(v) => collate(actual, v) == Ordering::Less,
            Self::Lte(v) => collate(actual, v) != Ordering::Greater,
            Self::In(vs) => vs.iter().any(|v| collate(actual, v) == Ordering::Equal),
            Self::Nin(vs) => vs.iter().all(|v| collate(actual, v) != Ordering::Equal),
            Self::Exists(expected) => *expected,
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

fn collate(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x.cmp(&y);
            }
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(a, b)| collate(a, b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => {
            if x == y {
                Ordering::Equal
            } else {
                x.len()
                    .cmp(&y.len())
                    .then_with(|| a.to_string().cmp(&b.to_string()))
            }
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
