use serde_json::{Value, json};

use crate::SCHEMA_VERSION;

/// A permissive schema standing in for one that could not be obtained.
///
/// `coordinates` identifies the chart (e.g. `@apps/chart:0.1.0`) and `error`
/// is embedded in the description so the failure is visible to users of the
/// aggregated schema.
#[must_use]
pub fn fallback_schema(id: &str, coordinates: &str, error: &str) -> Value {
    json!({
        "$schema": SCHEMA_VERSION,
        "$id": id,
        "type": "object",
        "title": format!("Fallback schema for {coordinates}"),
        "description": format!("An error occurred loading the schema of {coordinates}: {error}"),
        "x-intellij-html-description": format!(
            "<p>An error occurred loading the schema of <code>{coordinates}</code>:</p><pre>{}</pre>",
            escape_html(error)
        ),
    })
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_error_in_description() {
        let schema = fallback_schema(
            "values.schema.json",
            "@apps/chart:0.1.0",
            "HTTP 404 <not found>",
        );
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["title"], "Fallback schema for @apps/chart:0.1.0");
        assert_eq!(
            schema["description"],
            "An error occurred loading the schema of @apps/chart:0.1.0: HTTP 404 <not found>"
        );
        assert!(
            schema["x-intellij-html-description"]
                .as_str()
                .is_some_and(|d| d.contains("HTTP 404 &lt;not found&gt;"))
        );
    }
}
