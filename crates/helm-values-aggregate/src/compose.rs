//! Edits shared by the aggregation steps.

use helm_values_core::{
    Chart, ChartDependency, ObjectNodeExt,
    node::{self, ALL_OF, PROPERTIES, REF},
};
use serde_json::{Map, Value, json};

pub(crate) const GLOBAL: &str = "global";
const HTML_DESCRIPTION: &str = "x-intellij-html-description";

/// Whether a document-local reference resolves inside `schema`.
pub(crate) fn resolves(schema: &Value, reference: &str) -> bool {
    node::local_pointer(reference).is_some_and(|p| schema.pointer(p).is_some())
}

fn global_node(schema: &mut Value) -> &mut Map<String, Value> {
    schema.object_path_or_create([PROPERTIES, GLOBAL])
}

/// Drop the reference of the `global` property to the separately published
/// global values schema, which is not part of an aggregate.
pub(crate) fn detach_global_file_ref(schema: &mut Value) {
    let global = global_node(schema);
    let is_file_ref = global
        .get(REF)
        .and_then(Value::as_str)
        .is_some_and(|r| node::local_pointer(r).is_none());
    if is_file_ref {
        global.shift_remove(REF);
    }
}

/// Compose `reference` into the `global` property.
pub(crate) fn add_global_ref(schema: &mut Value, reference: String) {
    let entry = json!({ REF: reference });
    let all_of = global_node(schema).array_or_create(ALL_OF);
    if !all_of.contains(&entry) {
        all_of.push(entry);
    }
}

/// Remove keywords closing the `global` property of an embedded schema, so it
/// composes with the global schemas of other charts.
pub(crate) fn relax_global(schema: &mut Value, reference: &str) {
    if let Some(global) = node::local_pointer(reference).and_then(|p| schema.pointer_mut(p)) {
        node::remove_keys(global, &["additionalProperties", "unevaluatedProperties"]);
    }
}

/// Declare the properties of the schema at `reference` on the object at `at`,
/// so they are accepted next to `additionalProperties: false`.
pub(crate) fn expose_properties(schema: &mut Value, reference: &str, at: &[&str]) {
    let Some(pointer) = node::local_pointer(reference) else {
        return;
    };
    let keys: Vec<String> = schema
        .pointer(pointer)
        .and_then(|target| target.get(PROPERTIES))
        .and_then(Value::as_object)
        .map(|properties| properties.keys().cloned().collect())
        .unwrap_or_default();

    let properties = schema.object_path_or_create(at.iter().copied().chain([PROPERTIES]));
    for key in keys {
        if key == GLOBAL {
            continue;
        }
        let target = format!("{reference}/{PROPERTIES}/{}", node::escape_segment(&key));
        properties.entry(key).or_insert_with(|| json!({ REF: target }));
    }
}

/// Wire the `import-values` of `dependency`, whose values schema is at
/// `source`, into the values of its parent at `parent_properties`.
pub(crate) fn add_imports(
    schema: &mut Value,
    dependency: &ChartDependency,
    source: &str,
    parent_properties: &[&str],
) {
    for import in &dependency.import_values {
        let child: String = import
            .child_path()
            .iter()
            .map(|s| format!("/{PROPERTIES}/{}", node::escape_segment(s)))
            .collect();
        let reference = format!("{source}{child}");

        let mut path = parent_properties.to_vec();
        for segment in import.parent_path() {
            path.push(PROPERTIES);
            path.push(segment);
        }
        if path.is_empty() {
            expose_properties(schema, &reference, &[]);
        }
        tracing::debug!(
            dependency = dependency.alias_or_name(),
            child = %import.child,
            parent = %import.parent,
            "import values"
        );
        schema
            .object_path_or_create(path.iter().copied())
            .array_or_create(ALL_OF)
            .push(json!({ REF: reference }));
    }
}

fn is_description_entry(entry: &Value) -> bool {
    entry
        .as_object()
        .is_some_and(|e| e.contains_key(HTML_DESCRIPTION) && !e.contains_key(REF))
}

fn description_entry(chart: &Chart) -> Value {
    let intro = format!(
        "Global values shared between chart {} and its dependencies",
        chart.coordinates()
    );
    let mut text = intro.clone();
    let mut html = format!("<p>{intro}</p>");
    if !chart.dependencies.is_empty() {
        text.push(':');
        html.push_str("<ul>");
        for dependency in &chart.dependencies {
            text.push_str(&format!(
                "\n- {} ({})",
                dependency.alias_or_name(),
                dependency.coordinates()
            ));
            html.push_str(&format!(
                "<li><code>{}</code> ({})</li>",
                dependency.alias_or_name(),
                dependency.coordinates()
            ));
        }
        html.push_str("</ul>");
    } else {
        text.push('.');
    }
    json!({
        "title": "Global values",
        "description": text,
        HTML_DESCRIPTION: html,
    })
}

/// Replace the descriptive entry of the `global` property and close it.
pub(crate) fn rebuild_global(schema: &mut Value, chart: &Chart) {
    let global = global_node(schema);
    let composed = {
        let all_of = global.array_or_create(ALL_OF);
        all_of.retain(|entry| !is_description_entry(entry));
        let composed = all_of.len();
        all_of.insert(0, description_entry(chart));
        composed
    };
    global
        .entry("type")
        .or_insert_with(|| Value::String("object".to_string()));
    global.insert("unevaluatedProperties".to_string(), Value::Bool(false));
    if composed == 0 {
        global.insert("additionalProperties".to_string(), Value::Bool(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_values_core::ChartDependencyImport;
    use similar_asserts::assert_eq as sim_assert_eq;

    #[test]
    fn rebuilding_global_replaces_description() {
        let chart = Chart::new("helm-chart", "0.1.0").with_dependency(
            ChartDependency::new("app")
                .with_version("0.2.0")
                .with_repository("@apps"),
        );
        let mut schema = json!({"properties": {"global": {"$ref": "global-values.schema.json"}}});
        detach_global_file_ref(&mut schema);
        add_global_ref(&mut schema, "#/$defs/downloads/app/global-values.schema.json".into());
        add_global_ref(&mut schema, "#/$defs/downloads/app/global-values.schema.json".into());

        rebuild_global(&mut schema, &chart);
        let once = schema.clone();
        rebuild_global(&mut schema, &chart);
        sim_assert_eq!(schema, once);

        sim_assert_eq!(
            schema,
            json!({
                "properties": {
                    "global": {
                        "allOf": [
                            {
                                "title": "Global values",
                                "description": "Global values shared between chart helm-chart:0.1.0 and its dependencies:\n- app (@apps/app:0.2.0)",
                                "x-intellij-html-description": "<p>Global values shared between chart helm-chart:0.1.0 and its dependencies</p><ul><li><code>app</code> (@apps/app:0.2.0)</li></ul>"
                            },
                            {"$ref": "#/$defs/downloads/app/global-values.schema.json"}
                        ],
                        "type": "object",
                        "unevaluatedProperties": false
                    }
                }
            })
        );
    }

    #[test]
    fn imports_reference_child_path_at_parent_path() {
        let dependency = ChartDependency::new("app")
            .with_import(ChartDependencyImport::new("exports.data", "imported.data"))
            .with_import(ChartDependencyImport::new("exports.root", "."));
        let mut schema = json!({
            "properties": {},
            "$defs": {"app": {"properties": {"exports": {"properties": {"root": {
                "properties": {"flag": {"type": "boolean"}}
            }}}}}}
        });

        add_imports(&mut schema, &dependency, "#/$defs/app", &[]);
        sim_assert_eq!(
            schema.pointer("/properties/imported/properties/data/allOf"),
            Some(&json!([{"$ref": "#/$defs/app/properties/exports/properties/data"}]))
        );
        sim_assert_eq!(
            schema.get("allOf"),
            Some(&json!([{"$ref": "#/$defs/app/properties/exports/properties/root"}]))
        );
        sim_assert_eq!(
            schema.pointer("/properties/flag"),
            Some(&json!({"$ref": "#/$defs/app/properties/exports/properties/root/properties/flag"}))
        );
    }
}
