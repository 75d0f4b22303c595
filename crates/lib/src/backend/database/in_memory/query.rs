//! Filter matching and update application for the in-memory backend.
//!
//! Filters match on dotted storage keys. A key that walks into a list
//! matches against every map element of that list, and a list value matches
//! an expected scalar when it contains it. Supported filter operators are
//! `$exists`, `$ne`, `$in` and `$nin`; supported update operators are
//! `$set`, `$unset` and `$inc`.

use std::str::FromStr;

use uuid::Uuid;

use crate::{
    backend::{BackendError, Namespace},
    constants::ID_KEY,
    schema::Index,
    value::{Doc, KeyPath, Segment, Value},
};

fn invalid_query(reason: impl Into<String>) -> BackendError {
    BackendError::InvalidQuery {
        reason: reason.into(),
    }
}

fn invalid_update(reason: impl Into<String>) -> BackendError {
    BackendError::InvalidUpdate {
        reason: reason.into(),
    }
}

fn is_operator(key: &str) -> bool {
    key.starts_with('$')
}

fn is_operator_doc(doc: &Doc) -> bool {
    !doc.is_empty() && doc.keys().all(|key| is_operator(key))
}

/// Collects every value reachable at `path`, fanning out over lists.
pub(crate) fn values_at<'d>(doc: &'d Doc, path: &KeyPath) -> Vec<&'d Value> {
    let mut found = Vec::new();
    if let Some((Segment::Key(key), rest)) = path.segments().split_first() {
        if let Some(value) = doc.get(key) {
            collect(value, rest, &mut found);
        }
    }
    found
}

fn collect<'d>(value: &'d Value, rest: &[Segment], found: &mut Vec<&'d Value>) {
    match rest.split_first() {
        None => found.push(value),
        Some((Segment::Key(key), tail)) => match value {
            Value::Doc(doc) => {
                if let Some(next) = doc.get(key) {
                    collect(next, tail, found);
                }
            }
            Value::List(items) => {
                for item in items.iter().filter(|item| matches!(item, Value::Doc(_))) {
                    collect(item, rest, found);
                }
            }
            _ => {}
        },
        Some((Segment::Index(index), tail)) => {
            if let Some(next) = value.as_list().and_then(|items| items.get(*index)) {
                collect(next, tail, found);
            }
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_float() == b.as_float()
        }
        _ => a == b,
    }
}

fn matches_value(actual: &Value, expected: &Value) -> bool {
    values_equal(actual, expected)
        || actual
            .as_list()
            .is_some_and(|items| items.iter().any(|item| values_equal(item, expected)))
}

fn condition_holds(found: &[&Value], expected: &Value) -> Result<bool, BackendError> {
    match expected {
        Value::Doc(ops) if is_operator_doc(ops) => {
            for (op, arg) in ops {
                let holds = match op.as_str() {
                    "$exists" => {
                        let wanted = arg
                            .as_bool()
                            .ok_or_else(|| invalid_query("$exists takes a bool"))?;
                        wanted == !found.is_empty()
                    }
                    "$ne" => !found.iter().any(|value| matches_value(value, arg)),
                    "$in" | "$nin" => {
                        let options = arg
                            .as_list()
                            .ok_or_else(|| invalid_query(format!("{op} takes a list")))?;
                        let any = options
                            .iter()
                            .any(|option| found.iter().any(|value| matches_value(value, option)));
                        if op == "$in" { any } else { !any }
                    }
                    other => return Err(invalid_query(format!("unsupported operator '{other}'"))),
                };
                if !holds {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Value::Null => Ok(found.is_empty() || found.iter().any(|value| value.is_null())),
        _ => Ok(found.iter().any(|value| matches_value(value, expected))),
    }
}

fn parse_key(key: &str) -> Result<KeyPath, BackendError> {
    KeyPath::from_str(key).map_err(|err| invalid_query(err.to_string()))
}

/// Returns true if `doc` satisfies every condition in `filter`.
pub(crate) fn matches(doc: &Doc, filter: &Doc) -> Result<bool, BackendError> {
    for (key, expected) in filter {
        let path = parse_key(key)?;
        if !condition_holds(&values_at(doc, &path), expected)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn set_path(doc: &mut Doc, key: &str, value: Value) -> Result<(), BackendError> {
    let path = parse_key(key)?;
    let Some((Segment::Key(last), parent)) = path.split_last() else {
        return Err(invalid_update(format!("cannot set '{key}'")));
    };
    doc.materialize(&parent)
        .map_err(|err| invalid_update(format!("cannot set '{key}': {err}")))?
        .insert(last.clone(), value);
    Ok(())
}

/// Applies an operator or replacement update to `doc`.
///
/// Replacement keeps the existing `_id`.
pub(crate) fn apply_update(doc: &mut Doc, update: &Doc) -> Result<(), BackendError> {
    let operators = update.keys().filter(|key| is_operator(key)).count();
    if operators == 0 {
        let id = doc.get(ID_KEY).cloned();
        *doc = update.clone();
        if let Some(id) = id {
            doc.insert(ID_KEY, id);
        }
        return Ok(());
    }
    if operators != update.len() {
        return Err(invalid_update("cannot mix operators and plain keys"));
    }

    for (op, fields) in update {
        let fields = fields
            .as_doc()
            .ok_or_else(|| invalid_update(format!("{op} takes a document")))?;
        match op.as_str() {
            "$set" => {
                for (key, value) in fields {
                    set_path(doc, key, value.clone())?;
                }
            }
            "$unset" => {
                for key in fields.keys() {
                    doc.remove_path(&parse_key(key)?);
                }
            }
            "$inc" => {
                for (key, by) in fields {
                    let current = doc
                        .get_path(&parse_key(key)?)
                        .cloned()
                        .unwrap_or(Value::Int(0));
                    let next = current
                        .increment(by)
                        .map_err(|err| invalid_update(format!("cannot increment '{key}': {err}")))?;
                    set_path(doc, key, next)?;
                }
            }
            other => return Err(invalid_update(format!("unsupported operator '{other}'"))),
        }
    }
    Ok(())
}

/// Builds the document an upsert starts from: the filter's plain equality
/// conditions.
pub(crate) fn upsert_seed(filter: &Doc) -> Result<Doc, BackendError> {
    let mut seed = Doc::new();
    for (key, value) in filter {
        if is_operator(key) || matches!(value, Value::Doc(ops) if is_operator_doc(ops)) {
            continue;
        }
        set_path(&mut seed, key, value.clone())?;
    }
    Ok(seed)
}

/// Returns the document's `_id`, generating one if missing.
pub(crate) fn ensure_id(doc: &mut Doc) -> Value {
    if let Some(id) = doc.get(ID_KEY) {
        return id.clone();
    }
    let id = Value::Text(Uuid::new_v4().to_string());
    doc.insert(ID_KEY, id.clone());
    id
}

/// The values `doc` contributes to `index`, or `None` when a sparse index
/// skips it.
fn index_entry(doc: &Doc, index: &Index) -> Option<Vec<Value>> {
    let mut present = false;
    let entry = index
        .keys()
        .iter()
        .map(|(key, _)| {
            let value = KeyPath::from_str(key)
                .ok()
                .and_then(|path| values_at(doc, &path).first().map(|value| (*value).clone()));
            present |= value.is_some();
            value.unwrap_or(Value::Null)
        })
        .collect();
    (present || !index.is_sparse()).then_some(entry)
}

/// Checks `candidate` against the `_id` and every unique index, ignoring the
/// document at position `skip`.
pub(crate) fn check_unique(
    ns: &Namespace,
    documents: &[Doc],
    indexes: &[Index],
    candidate: &Doc,
    skip: Option<usize>,
) -> Result<(), BackendError> {
    let others = || {
        documents
            .iter()
            .enumerate()
            .filter(move |(position, _)| Some(*position) != skip)
            .map(|(_, doc)| doc)
    };

    if let Some(id) = candidate.get(ID_KEY) {
        if others().any(|doc| doc.get(ID_KEY) == Some(id)) {
            return Err(BackendError::DuplicateKey {
                namespace: ns.to_string(),
                key: ID_KEY.to_string(),
                value: id.to_string(),
            });
        }
    }

    for index in indexes.iter().filter(|index| index.is_unique()) {
        let Some(entry) = index_entry(candidate, index) else {
            continue;
        };
        if others().any(|doc| index_entry(doc, index).as_ref() == Some(&entry)) {
            return Err(BackendError::DuplicateKey {
                namespace: ns.to_string(),
                key: index.name(),
                value: Value::List(entry).to_string(),
            });
        }
    }
    Ok(())
}
