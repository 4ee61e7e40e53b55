use helm_values_core::node::{self, REF};
use serde_json::Value;

const COMMENT: &str = "$comment";

/// Replace every document-local `$ref` that does not resolve inside `schema`
/// with a `$comment` naming the removed reference.
///
/// Returns the number of removed references.
pub fn remove_dangling_refs(schema: &mut Value) -> usize {
    let dangling: Vec<_> = node::collect_refs(schema)
        .into_iter()
        .filter(|found| {
            node::local_pointer(&found.reference).is_some_and(|p| schema.pointer(p).is_none())
        })
        .collect();

    for found in &dangling {
        tracing::warn!(
            location = %found.location,
            reference = %found.reference,
            "removing dangling reference"
        );
        if let Some(holder) = schema
            .pointer_mut(&found.location)
            .and_then(Value::as_object_mut)
        {
            holder.shift_remove(REF);
            holder.insert(
                COMMENT.to_string(),
                Value::String(format!("Removed dangling reference {}", found.reference)),
            );
        }
    }
    dangling.len()
}
