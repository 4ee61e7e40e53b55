//! Helpers for building and walking JSON schema trees in place.

use serde_json::{Map, Value};

pub const REF: &str = "$ref";
pub const DEFS: &str = "$defs";
pub const PROPERTIES: &str = "properties";
pub const ALL_OF: &str = "allOf";
pub const REQUIRED: &str = "required";

/// Get-or-insert access to nested objects of a JSON tree.
///
/// Missing children are created as empty objects, children of another type
/// are replaced. Key insertion order is preserved.
pub trait ObjectNodeExt {
    fn as_object_node(&mut self) -> &mut Map<String, Value>;

    fn object_or_create(&mut self, key: &str) -> &mut Map<String, Value> {
        let entry = self
            .as_object_node()
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        entry.as_object_node()
    }

    fn object_path_or_create<'a, I>(&mut self, path: I) -> &mut Map<String, Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut cur = self.as_object_node();
        for key in path {
            cur = cur.object_or_create(key);
        }
        cur
    }

    fn array_or_create(&mut self, key: &str) -> &mut Vec<Value> {
        let entry = self
            .as_object_node()
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        let Value::Array(items) = entry else {
            unreachable!("entry was replaced by an array");
        };
        items
    }
}

impl ObjectNodeExt for Map<String, Value> {
    fn as_object_node(&mut self) -> &mut Map<String, Value> {
        self
    }
}

impl ObjectNodeExt for Value {
    fn as_object_node(&mut self) -> &mut Map<String, Value> {
        if !self.is_object() {
            *self = Value::Object(Map::new());
        }
        let Value::Object(map) = self else {
            unreachable!("value was replaced by an object");
        };
        map
    }
}

/// Escape a single JSON pointer reference token (RFC 6901).
#[must_use]
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[must_use]
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Build a JSON pointer (`/a/b`) from unescaped segments.
#[must_use]
pub fn pointer<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", escape_segment(s.as_ref())))
        .collect()
}

/// The JSON pointer of a document-local reference (`#/a/b` → `/a/b`).
///
/// Returns `None` for references to other documents and for anchors.
#[must_use]
pub fn local_pointer(reference: &str) -> Option<&str> {
    let fragment = reference.strip_prefix('#')?;
    if fragment.is_empty() || fragment.starts_with('/') {
        Some(fragment)
    } else {
        None
    }
}

/// A `$ref` found in a schema tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefNode {
    /// JSON pointer of the object holding the `$ref` keyword.
    pub location: String,
    pub reference: String,
}

/// Collect every `$ref` of `root`, in document order.
#[must_use]
pub fn collect_refs(root: &Value) -> Vec<RefNode> {
    let mut out = Vec::new();
    collect_refs_inner(root, &mut String::new(), &mut out);
    out
}

fn collect_refs_inner(node: &Value, location: &mut String, out: &mut Vec<RefNode>) {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get(REF).and_then(Value::as_str) {
                out.push(RefNode {
                    location: location.clone(),
                    reference: reference.to_string(),
                });
            }
            for (key, child) in map {
                let len = location.len();
                location.push('/');
                location.push_str(&escape_segment(key));
                collect_refs_inner(child, location, out);
                location.truncate(len);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                let len = location.len();
                location.push('/');
                location.push_str(&idx.to_string());
                collect_refs_inner(child, location, out);
                location.truncate(len);
            }
        }
        _ => {}
    }
}

/// Replace the `$ref` of the object at `location`.
///
/// Returns `false` if there is no object at `location`.
pub fn set_ref(root: &mut Value, location: &str, reference: String) -> bool {
    match root.pointer_mut(location).and_then(Value::as_object_mut) {
        Some(node) => {
            node.insert(REF.to_string(), Value::String(reference));
            true
        }
        None => false,
    }
}

/// Remove keys from the object at the root of `node`, if it is an object.
pub fn remove_keys(node: &mut Value, keys: &[&str]) {
    if let Some(map) = node.as_object_mut() {
        for key in keys {
            map.shift_remove(*key);
        }
    }
}
