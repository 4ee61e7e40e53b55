use color_eyre::eyre;
use helm_values_core::{Chart, Error, JsonSchemaRepository, RepositoryMappings};
use helm_values_remote::{JsonSchemaPublisher, MemoryTransport};
use test_util::prelude::*;

fn setup() -> eyre::Result<(RepositoryMappings, vfs::VfsPath)> {
    let mut mappings = RepositoryMappings::new();
    mappings.insert(
        "@apps".to_string(),
        JsonSchemaRepository::new("http://localhost:1980/apps").with_credentials("user", "pass"),
    );
    let dir = memory_root().join("generated")?;
    write(&dir.join("values.schema.json")?, r#"{"title": "values"}"#)?;
    write(&dir.join("global-values.schema.json")?, r#"{"title": "global"}"#)?;
    Ok((mappings, dir))
}

#[test]
fn puts_both_schema_files() -> eyre::Result<()> {
    Builder::default().build();
    let (mappings, dir) = setup()?;
    let transport = MemoryTransport::new();

    JsonSchemaPublisher::new(mappings)
        .with_transport(transport.clone())
        .publish("@apps", &Chart::new("helm-chart", "0.1.0"), &dir)?;

    let requests = transport.requests();
    assert_that!(requests, len(eq(2)));
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(
        requests[0].uri,
        "http://localhost:1980/apps/helm-chart/0.1.0/values.schema.json"
    );
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(requests[0].authorization.as_deref(), Some("Basic dXNlcjpwYXNz"));
    assert_eq!(requests[0].body, br#"{"title": "values"}"#);
    assert_eq!(
        requests[1].uri,
        "http://localhost:1980/apps/helm-chart/0.1.0/global-values.schema.json"
    );
    Ok(())
}

#[test]
fn unexpected_status_is_a_publication_error() -> eyre::Result<()> {
    Builder::default().build();
    let (mappings, dir) = setup()?;
    let transport = MemoryTransport::new().with_put_status(409);

    let err = JsonSchemaPublisher::new(mappings)
        .with_transport(transport.clone())
        .publish("@apps", &Chart::new("helm-chart", "0.1.0"), &dir)
        .unwrap_err();

    assert_that!(
        &err,
        matches_pattern!(Error::Publication {
            chart: eq("helm-chart"),
            version: eq("0.1.0"),
            code: eq(&409),
            ..
        })
    );
    assert_that!(transport.requests(), len(eq(1)));
    Ok(())
}

#[test]
fn connection_failure_has_code_zero() -> eyre::Result<()> {
    Builder::default().build();
    let (mappings, dir) = setup()?;
    let transport = MemoryTransport::new()
        .with_unreachable("http://localhost:1980/apps/helm-chart/0.1.0/values.schema.json");

    let err = JsonSchemaPublisher::new(mappings)
        .with_transport(transport)
        .publish("@apps", &Chart::new("helm-chart", "0.1.0"), &dir)
        .unwrap_err();
    assert_that!(&err, matches_pattern!(Error::Publication { code: eq(&0), .. }));
    Ok(())
}

#[test]
fn unknown_repository_fails_before_any_request() -> eyre::Result<()> {
    let (mappings, dir) = setup()?;
    let transport = MemoryTransport::new();

    let err = JsonSchemaPublisher::new(mappings)
        .with_transport(transport.clone())
        .publish("@missing", &Chart::new("helm-chart", "0.1.0"), &dir)
        .unwrap_err();
    assert_that!(&err, matches_pattern!(Error::RepositoryNotFound(eq("@missing"))));
    assert_that!(transport.requests(), is_empty());
    Ok(())
}
