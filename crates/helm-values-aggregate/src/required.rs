use std::collections::HashSet;

use helm_values_chart::ExtractedValuesAggregator;
use helm_values_core::{
    Chart, Error,
    node::{self, ALL_OF, PROPERTIES, REF, REQUIRED},
};
use serde_json::Value;

/// Drops `required` entries for properties that dependency defaults already set.
#[derive(Debug, Clone)]
pub struct RequiredPropertyCleaner {
    values: ExtractedValuesAggregator,
}

impl RequiredPropertyCleaner {
    #[must_use]
    pub fn new(values: ExtractedValuesAggregator) -> Self {
        Self { values }
    }

    /// # Errors
    ///
    /// Returns an error if the default values cannot be aggregated.
    pub fn discard_required_properties_for(
        &self,
        chart: &Chart,
        schema: &mut Value,
    ) -> Result<usize, Error> {
        let values = self.values.aggregate(chart)?;
        Ok(discard_required_properties(schema, &values))
    }
}

/// Remove names from `required` arrays of `schema` whose key is present in
/// `values` at the same position.
///
/// `properties`, `allOf` branches and document-local references are followed.
/// Returns the number of removed entries.
pub fn discard_required_properties(schema: &mut Value, values: &Value) -> usize {
    let mut walk = Walk {
        schema,
        values,
        visited: HashSet::new(),
        removals: Vec::new(),
    };
    walk.visit(String::new(), String::new());
    let removals = walk.removals;

    let mut removed = 0;
    for (location, name) in removals {
        let Some(holder) = schema.pointer_mut(&location).and_then(Value::as_object_mut) else {
            continue;
        };
        let Some(required) = holder.get_mut(REQUIRED).and_then(Value::as_array_mut) else {
            continue;
        };
        let before = required.len();
        required.retain(|r| r.as_str() != Some(name.as_str()));
        if required.len() < before {
            removed += 1;
            tracing::debug!(%location, property = %name, "dropped required property with default value");
        }
        if required.is_empty() {
            holder.shift_remove(REQUIRED);
        }
    }
    removed
}

struct Walk<'a> {
    schema: &'a Value,
    values: &'a Value,
    visited: HashSet<(String, String)>,
    removals: Vec<(String, String)>,
}

impl Walk<'_> {
    fn visit(&mut self, location: String, values_location: String) {
        if !self
            .visited
            .insert((location.clone(), values_location.clone()))
        {
            return;
        }
        let (schema, values) = (self.schema, self.values);
        let Some(node) = schema.pointer(&location).and_then(Value::as_object) else {
            return;
        };
        let Some(values) = values.pointer(&values_location).and_then(Value::as_object) else {
            return;
        };

        if let Some(required) = node.get(REQUIRED).and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if values.contains_key(name) {
                    self.removals.push((location.clone(), name.to_string()));
                }
            }
        }

        if let Some(target) = node
            .get(REF)
            .and_then(Value::as_str)
            .and_then(node::local_pointer)
        {
            self.visit(target.to_string(), values_location.clone());
        }

        if let Some(branches) = node.get(ALL_OF).and_then(Value::as_array) {
            for idx in 0..branches.len() {
                self.visit(format!("{location}/{ALL_OF}/{idx}"), values_location.clone());
            }
        }

        if let Some(properties) = node.get(PROPERTIES).and_then(Value::as_object) {
            for key in properties.keys().filter(|k| values.contains_key(*k)) {
                let segment = node::escape_segment(key);
                self.visit(
                    format!("{location}/{PROPERTIES}/{segment}"),
                    format!("{values_location}/{segment}"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use similar_asserts::assert_eq as sim_assert_eq;

    #[test]
    fn drops_required_properties_with_defaults() {
        let mut schema = json!({
            "properties": {
                "sibling": {"$ref": "#/$defs/sibling"},
                "other": {"required": ["x"], "properties": {"x": {}}}
            },
            "$defs": {
                "sibling": {
                    "allOf": [{"$ref": "#/$defs/foo"}],
                    "properties": {
                        "self": {"$ref": "#/$defs/sibling"}
                    }
                },
                "foo": {
                    "properties": {
                        "foo": {"required": ["bar", "qux"], "type": "object"}
                    }
                }
            }
        });
        let values = json!({
            "sibling": {"foo": {"bar": "baz"}, "self": {"foo": {"qux": 1}}}
        });

        assert_eq!(discard_required_properties(&mut schema, &values), 2);
        assert_eq!(schema.pointer("/$defs/foo/properties/foo/required"), None);
        sim_assert_eq!(
            schema.pointer("/properties/other/required"),
            Some(&json!(["x"]))
        );
    }
}
