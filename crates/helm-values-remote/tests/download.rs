use color_eyre::eyre;
use helm_values_core::{
    Chart, ChartDependency, JsonSchemaRepository, RepositoryMappings, SchemaIo,
};
use helm_values_remote::{DownloadedSchema, HttpResponse, MemoryTransport, SchemaDownloader};
use serde_json::json;
use test_util::prelude::*;
use test_util::read_json;

const APPS: &str = "http://localhost:1980/apps";

fn mappings() -> RepositoryMappings {
    let mut mappings = RepositoryMappings::new();
    mappings.insert(
        "@apps".to_string(),
        JsonSchemaRepository::new(APPS).with_credentials("user", "pass"),
    );
    mappings
}

fn chart() -> Chart {
    Chart::new("helm-chart", "0.1.0")
        .with_dependency(
            ChartDependency::new("external")
                .with_version("0.2.0")
                .with_repository("@apps")
                .with_alias("ext"),
        )
        .with_dependency(
            ChartDependency::new("redis")
                .with_version("17.0.0")
                .with_repository("https://charts.bitnami.com/bitnami"),
        )
}

#[test]
fn downloads_schemas_and_transitive_references() -> eyre::Result<()> {
    Builder::default().build();
    let root = memory_root();
    let download_dir = root.join("build/downloads")?;
    write(&download_dir.join("stale/values.schema.json")?, "{}")?;

    let transport = MemoryTransport::new()
        .with_json(
            format!("{APPS}/external/0.2.0/values.schema.json"),
            &json!({
                "properties": {
                    "a": {"$ref": "defs/common.json#/$defs/a"},
                    "b": {"$ref": "http://localhost:1980/apps/other/1.0.0/values.schema.json"},
                    "c": {"$ref": "#/$defs/local"}
                }
            }),
        )
        .with_json(
            format!("{APPS}/external/0.2.0/defs/common.json"),
            &json!({"$defs": {"a": {"$ref": "../values.schema.json#/properties/c"}}}),
        )
        .with_json(
            format!("{APPS}/other/1.0.0/values.schema.json"),
            &json!({"type": "object"}),
        );

    let downloaded = SchemaDownloader::new(download_dir.clone(), mappings(), SchemaIo::default())
        .with_transport(transport.clone())
        .download(&chart())?;

    let entry = |path: &str, is_reference: bool| DownloadedSchema {
        base_folder: "ext".to_string(),
        path: path.to_string(),
        is_reference,
    };
    sim_assert_eq!(
        downloaded,
        vec![
            entry("values.schema.json", false),
            entry("defs/common.json", true),
            entry("localhost_1980/apps/other/1.0.0/values.schema.json", true),
            entry("global-values.schema.json", false),
        ]
    );

    assert!(!download_dir.join("stale")?.exists()?);

    let values = read_json(&download_dir.join("ext/values.schema.json")?)?;
    sim_assert_eq!(
        values,
        json!({
            "properties": {
                "a": {"$ref": "defs/common.json#/$defs/a"},
                "b": {"$ref": "localhost_1980/apps/other/1.0.0/values.schema.json"},
                "c": {"$ref": "#/$defs/local"}
            }
        })
    );

    let common = read_json(&download_dir.join("ext/defs/common.json")?)?;
    assert_eq!(
        common.pointer("/$defs/a/$ref"),
        Some(&json!("../values.schema.json#/properties/c"))
    );

    let other = read_json(
        &download_dir.join("ext/localhost_1980/apps/other/1.0.0/values.schema.json")?,
    )?;
    sim_assert_eq!(other, json!({"type": "object"}));

    let global = read_json(&download_dir.join("ext/global-values.schema.json")?)?;
    assert_eq!(global["title"], "Fallback schema for @apps/external:0.2.0");
    assert_that!(
        global["description"].as_str(),
        some(contains_substring("HTTP 404"))
    );

    let requests = transport.requests();
    assert_that!(requests, len(eq(4)));
    assert!(
        requests
            .iter()
            .all(|r| r.method == "GET" && r.authorization.as_deref() == Some("Basic dXNlcjpwYXNz"))
    );
    assert!(requests.iter().all(|r| r.uri.starts_with(APPS)));
    Ok(())
}

#[test]
fn unreachable_repository_writes_fallback_schemas() -> eyre::Result<()> {
    Builder::default().build();
    let root = memory_root();
    let download_dir = root.join("downloads")?;
    let values_uri = format!("{APPS}/external/0.2.0/values.schema.json");

    let transport = MemoryTransport::new()
        .with_unreachable(values_uri.clone())
        .with_response(
            format!("{APPS}/external/0.2.0/global-values.schema.json"),
            HttpResponse::new(200, "not json"),
        );

    SchemaDownloader::new(download_dir.clone(), mappings(), SchemaIo::default())
        .with_transport(transport)
        .download(&chart())?;

    let values = read_json(&download_dir.join("ext/values.schema.json")?)?;
    assert_eq!(values["$id"], json!(values_uri));
    assert_that!(
        values["description"].as_str(),
        some(contains_substring("unreachable"))
    );

    let global = read_json(&download_dir.join("ext/global-values.schema.json")?)?;
    assert_that!(
        global["description"].as_str(),
        some(contains_substring("invalid JSON"))
    );
    Ok(())
}

#[test]
fn reference_cycles_terminate() -> eyre::Result<()> {
    Builder::default().build();
    let root = memory_root();
    let download_dir = root.join("downloads")?;

    let transport = MemoryTransport::new()
        .with_json(
            format!("{APPS}/external/0.2.0/values.schema.json"),
            &json!({"$ref": "a.json"}),
        )
        .with_json(
            format!("{APPS}/external/0.2.0/a.json"),
            &json!({"$ref": "http://localhost:1980/apps/external/0.2.0/b.json"}),
        )
        .with_json(
            format!("{APPS}/external/0.2.0/b.json"),
            &json!({"$ref": "a.json"}),
        );

    let downloaded = SchemaDownloader::new(download_dir.clone(), mappings(), SchemaIo::default())
        .with_transport(transport.clone())
        .download(&chart())?;
    assert_that!(downloaded, len(eq(4)));

    let a = read_json(&download_dir.join("ext/a.json")?)?;
    sim_assert_eq!(a, json!({"$ref": "b.json"}));
    let b = read_json(&download_dir.join("ext/b.json")?)?;
    sim_assert_eq!(b, json!({"$ref": "a.json"}));
    Ok(())
}
