// Dot-path access into a submission value tree
//
// Paths look like `mutations.0.allele`: object keys separated by dots, with
// numeric segments indexing into arrays.

use serde_json::{Map, Value};

/// Join a prefix and a segment into a field path
pub fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

/// Split a path into (parent, last segment)
pub fn split_last(path: &str) -> (&str, &str) {
    match path.rsplit_once('.') {
        Some((parent, last)) => (parent, last),
        None => ("", path),
    }
}

pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }

    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn get_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    if path.is_empty() {
        return Some(root);
    }

    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => items.get_mut(index),
            Err(_) => None,
        },
        _ => None,
    })
}

/// Set the value at `path`, creating intermediate objects as needed.
/// Array segments must already exist; an out-of-range index is a no-op.
/// Returns whether the value was written.
pub fn set(root: &mut Value, path: &str, value: Value) -> bool {
    if path.is_empty() {
        *root = value;
        return true;
    }

    let mut node = root;
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return false,
    };

    for segment in parents {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert(Value::Null),
            Value::Array(items) => {
                let index = match segment.parse::<usize>() {
                    Ok(index) => index,
                    Err(_) => return false,
                };
                match items.get_mut(index) {
                    Some(item) => item,
                    None => return false,
                }
            }
            _ => return false,
        };
    }

    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            true
        }
        Value::Array(items) => match last.parse::<usize>() {
            Ok(index) if index < items.len() => {
                items[index] = value;
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Number of entries in the array at `path` (0 when absent or not an array)
pub fn array_len(root: &Value, path: &str) -> usize {
    get(root, path)
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

/// Append to the array at `path`, creating it when absent
pub fn push(root: &mut Value, path: &str, value: Value) -> bool {
    if let Some(Value::Array(items)) = get_mut(root, path) {
        items.push(value);
        return true;
    }

    match get(root, path) {
        Some(Value::Null) | None => set(root, path, Value::Array(vec![value])),
        Some(_) => false,
    }
}

/// Remove one entry from an array. `path` points at the entry itself
/// (`mutations.1`).
pub fn remove_index(root: &mut Value, path: &str) -> bool {
    let (parent, last) = split_last(path);
    let index = match last.parse::<usize>() {
        Ok(index) => index,
        Err(_) => return false,
    };

    match get_mut(root, parent) {
        Some(Value::Array(items)) if index < items.len() => {
            items.remove(index);
            true
        }
        _ => false,
    }
}

/// Render a scalar value as display text (empty for null)
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => String::new(),
    }
}

/// Replace every leaf with null, keeping keys and array lengths. Two trees
/// with equal shapes have the same structure.
pub fn shape_of(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), shape_of(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(shape_of).collect()),
        _ => Value::Null,
    }
}
