use color_eyre::eyre;
use helm_values_chart::{ExtractedValuesAggregator, SchemaExtractor};
use helm_values_core::{Chart, ChartDependency, SchemaIo};
use indoc::indoc;
use serde_json::json;
use test_util::prelude::*;
use test_util::read_json;
use vfs::VfsPath;

fn extract(root: &VfsPath, chart: &Chart) -> eyre::Result<VfsPath> {
    let extract_dir = root.join("build/extract")?;
    SchemaExtractor::new(root.join("charts")?, extract_dir.clone(), SchemaIo::default())
        .extract(chart)?;
    Ok(extract_dir)
}

#[test]
fn extracts_schemas_of_nested_archives() -> eyre::Result<()> {
    Builder::default().build();
    let root = memory_root();

    let grandchild = ChartArchive::chart("grandchild", "0.3.0")
        .with_file("values.schema.json", r#"{"title": "grandchild"}"#)
        .with_file("values.yaml", "level: grandchild\n");
    let child = ChartArchive::new("child")
        .with_file(
            "Chart.yaml",
            indoc! {r#"
                apiVersion: v2
                name: child
                version: 0.2.0
                dependencies:
                  - name: grandchild
                    version: 0.3.0
                    alias: gc
                  - name: unpacked
                    version: 0.1.0
            "#},
        )
        .with_file("values.schema.json", r#"{"title": "child"}"#)
        .with_archive("charts/grandchild-0.3.0.tgz", grandchild)
        .with_file("charts/unpacked/Chart.yaml", "name: unpacked\nversion: 0.1.0\n")
        .with_file("charts/unpacked/values.schema.json", r#"{"title": "unpacked"}"#);
    child.write_to(&root.join("charts/child-0.2.0.tgz")?)?;

    let chart = Chart::new("parent", "0.1.0").with_dependency(
        ChartDependency::new("child")
            .with_version("0.2.0")
            .with_alias("c"),
    );
    let extract_dir = extract(&root, &chart)?;

    sim_assert_eq!(
        read_json(&extract_dir.join("c/values.schema.json")?)?,
        json!({"title": "child"})
    );
    sim_assert_eq!(
        read_json(&extract_dir.join("c/gc/values.schema.json")?)?,
        json!({"title": "grandchild"})
    );
    sim_assert_eq!(
        read_json(&extract_dir.join("c/unpacked/values.schema.json")?)?,
        json!({"title": "unpacked"})
    );
    assert!(extract_dir.join("c/Chart.yaml")?.is_file()?);
    assert_eq!(
        extract_dir.join("c/gc/values.yaml")?.read_to_string()?,
        "level: grandchild\n"
    );
    Ok(())
}

#[test]
fn missing_archive_and_schema_yield_fallbacks() -> eyre::Result<()> {
    Builder::default().build();
    let root = memory_root();
    write(&root.join("build/extract/stale.json")?, "{}")?;
    ChartArchive::chart("no-schema", "1.0.0").write_to(&root.join("charts/no-schema-1.0.0.tgz")?)?;

    let chart = Chart::new("parent", "0.1.0")
        .with_dependency(ChartDependency::new("missing").with_version("1.0.0"))
        .with_dependency(ChartDependency::new("no-schema").with_version("1.0.0"))
        .with_dependency(ChartDependency::new("unversioned"));
    let extract_dir = extract(&root, &chart)?;

    assert!(!extract_dir.join("stale.json")?.exists()?);
    assert!(!extract_dir.join("unversioned")?.exists()?);

    let missing = read_json(&extract_dir.join("missing/values.schema.json")?)?;
    assert_eq!(missing["title"], "Fallback schema for missing:1.0.0");
    assert_that!(
        missing["description"].as_str(),
        some(contains_substring("missing-1.0.0.tgz not found"))
    );

    let no_schema = read_json(&extract_dir.join("no-schema/values.schema.json")?)?;
    assert_that!(
        no_schema["description"].as_str(),
        some(contains_substring("values.schema.json not found"))
    );
    assert!(extract_dir.join("no-schema/Chart.yaml")?.is_file()?);
    Ok(())
}

#[test]
fn nested_dependency_without_archive_yields_fallback() -> eyre::Result<()> {
    Builder::default().build();
    let root = memory_root();
    ChartArchive::new("mid")
        .with_file(
            "Chart.yaml",
            indoc! {r#"
                name: mid
                version: 0.5.0
                dependencies:
                  - name: gone
                    version: 9.9.9
            "#},
        )
        .with_file("values.schema.json", r#"{"title": "mid"}"#)
        .write_to(&root.join("charts/mid-0.5.0.tgz")?)?;

    let chart = Chart::new("parent", "0.1.0").with_dependency(
        ChartDependency::new("mid")
            .with_version("0.5.0")
            .with_alias("top"),
    );
    let extract_dir = extract(&root, &chart)?;

    sim_assert_eq!(
        read_json(&extract_dir.join("top/values.schema.json")?)?,
        json!({"title": "mid"})
    );
    let gone = read_json(&extract_dir.join("top/gone/values.schema.json")?)?;
    assert_eq!(gone["title"], "Fallback schema for gone:9.9.9");
    assert_that!(
        gone["description"].as_str(),
        some(contains_substring("archive gone-9.9.9.tgz not found"))
    );
    Ok(())
}

#[test]
fn first_schema_entry_in_archive_order_wins() -> eyre::Result<()> {
    Builder::default().build();
    let root = memory_root();
    ChartArchive::chart("dep", "1.0.0")
        .with_file("nested/values.schema.json", r#"{"title": "nested"}"#)
        .with_file("values.schema.json", r#"{"title": "root"}"#)
        .write_to(&root.join("charts/dep-1.0.0.tgz")?)?;

    let chart =
        Chart::new("parent", "0.1.0").with_dependency(ChartDependency::new("dep").with_version("1.0.0"));
    let extract_dir = extract(&root, &chart)?;

    sim_assert_eq!(
        read_json(&extract_dir.join("dep/nested/values.schema.json")?)?,
        json!({"title": "nested"})
    );
    assert!(!extract_dir.join("dep/values.schema.json")?.exists()?);
    Ok(())
}

#[test]
fn aggregates_values_with_ancestor_precedence_and_global_propagation() -> eyre::Result<()> {
    Builder::default().build();
    let root = memory_root();

    let grandchild = ChartArchive::chart("grandchild", "0.3.0").with_file(
        "values.yaml",
        indoc! {r#"
            image: grandchild
            replicas: 1
            global:
              domain: grandchild.local
              own: true
        "#},
    );
    let child = ChartArchive::new("child")
        .with_file(
            "Chart.yaml",
            indoc! {r#"
                name: child
                version: 0.2.0
                dependencies:
                  - name: grandchild
                    version: 0.3.0
                  - name: not-embedded
            "#},
        )
        .with_file(
            "values.yaml",
            indoc! {r#"
                foo:
                  bar: baz
                grandchild:
                  image: from-child
                global:
                  domain: child.local
            "#},
        )
        .with_archive("charts/grandchild-0.3.0.tgz", grandchild);
    child.write_to(&root.join("charts/child-0.2.0.tgz")?)?;

    let chart = Chart::new("parent", "0.1.0")
        .with_dependency(ChartDependency::new("child").with_version("0.2.0"));
    let extract_dir = extract(&root, &chart)?;

    let values = ExtractedValuesAggregator::new(extract_dir, SchemaIo::default()).aggregate(&chart)?;
    sim_assert_eq!(
        values,
        json!({
            "child": {
                "foo": {"bar": "baz"},
                "grandchild": {
                    "image": "from-child",
                    "replicas": 1,
                    "global": {"domain": "child.local", "own": true}
                },
                "global": {"domain": "child.local"}
            }
        })
    );
    Ok(())
}
