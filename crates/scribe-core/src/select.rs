//! Dotted-path property selection.
//!
//! Paths such as `headers.x-request-id` or `body.items.0.sku` walk object
//! members and, for numeric segments, array indices. Resolution never panics;
//! anything that cannot be reached is simply absent.

use serde_json::{Map, Value};

/// Resolve `path` against `source`.
///
/// Returns `None` when a segment is missing, an intermediate value is not a
/// container, or the resolved value is `null`. An empty path yields `None`.
pub fn select<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = source;
    for segment in path.split('.') {
        current = step(current, segment)?;
    }
    (!current.is_null()).then_some(current)
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Mutable counterpart of [`select`], used to rewrite a resolved value in place.
pub fn select_mut<'a>(source: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = source;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

/// Pick every resolvable path from `source` into a new map, keeping each
/// value at the same nested position (`body.id` becomes `{"body":{"id":..}}`).
///
/// Array positions are rebuilt as object keys (`items.0` becomes
/// `{"items":{"0":..}}`); only the selected leaves are copied.
pub fn pick<S: AsRef<str>>(source: &Value, paths: &[S]) -> Map<String, Value> {
    let mut picked = Map::new();
    for path in paths {
        let path = path.as_ref();
        if let Some(value) = select(source, path) {
            insert_at(&mut picked, path, value.clone());
        }
    }
    picked
}

/// Write `value` at the dotted `path`, creating intermediate objects.
///
/// A non-object value sitting on the way is replaced by an object.
pub fn insert_at(target: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = target;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }
}

/// Shallow merge: top-level keys of `overlay` replace those in `base`.
pub fn merge_into(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    base.extend(overlay);
}
