use helm_values_core::{Error, ObjectNodeExt, SchemaIo, node};
use serde_json::Value;
use url::Url;
use vfs::VfsPath;

/// Keywords dropped from the root of every embedded document.
const STRIPPED_KEYWORDS: [&str; 4] = ["$id", "$schema", "additionalProperties", "unevaluatedProperties"];

/// Copies schema files below `$defs` of an aggregate, following relative
/// file references.
///
/// A file is stored once per slot: `$defs/<namespace...>/<path segments>`.
/// References inside the file are rewritten to point into the aggregate,
/// references to absolute URIs are kept.
pub(crate) struct SchemaEmbedder<'a> {
    io: &'a SchemaIo,
}

impl<'a> SchemaEmbedder<'a> {
    pub(crate) fn new(io: &'a SchemaIo) -> Self {
        Self { io }
    }

    /// Embed `file` (relative to `base_dir`) and return the `#/...` reference to it.
    ///
    /// Returns `None` if the file cannot be read.
    pub(crate) fn embed(
        &self,
        root: &mut Value,
        namespace: &[&str],
        base_dir: &VfsPath,
        file: &str,
    ) -> Result<Option<String>, Error> {
        let segments = slot(namespace, file);
        let location = node::pointer(&segments);
        let reference = format!("#{location}");
        if root.pointer(&location).is_some() {
            return Ok(Some(reference));
        }

        let path = base_dir.join(file)?;
        if !path.is_file()? {
            tracing::warn!(path = path.as_str(), "schema to embed does not exist");
            return Ok(None);
        }
        let mut doc = match self.io.read_json(&path) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(path = path.as_str(), error = %err, "cannot read schema to embed");
                return Ok(None);
            }
        };

        // placeholder, so references back to this file end at the existence check
        root.object_path_or_create(segments.iter().map(String::as_str));
        node::remove_keys(&mut doc, &STRIPPED_KEYWORDS);

        let file_dir = file.rsplit_once('/').map_or("", |(dir, _)| dir);
        for found in node::collect_refs(&doc) {
            let rewritten = if let Some(fragment) = found.reference.strip_prefix('#') {
                if node::local_pointer(&found.reference).is_none() {
                    continue;
                }
                format!("{reference}{fragment}")
            } else {
                let (target, fragment) = found
                    .reference
                    .split_once('#')
                    .unwrap_or((found.reference.as_str(), ""));
                if Url::parse(target).is_ok() {
                    continue;
                }
                let Some(target) = join_relative(file_dir, target) else {
                    tracing::warn!(
                        file,
                        reference = %found.reference,
                        "reference leaves the schema folder"
                    );
                    continue;
                };
                let target_reference = match self.embed(root, namespace, base_dir, &target)? {
                    Some(target_reference) => target_reference,
                    None => format!("#{}", node::pointer(&slot(namespace, &target))),
                };
                format!("{target_reference}{fragment}")
            };
            node::set_ref(&mut doc, &found.location, rewritten);
        }

        if let Some(entry) = root.pointer_mut(&location) {
            *entry = doc;
        }
        tracing::debug!(path = path.as_str(), %reference, "embedded schema");
        Ok(Some(reference))
    }
}

fn slot(namespace: &[&str], file: &str) -> Vec<String> {
    std::iter::once(node::DEFS)
        .chain(namespace.iter().copied())
        .chain(file.split('/').filter(|s| !s.is_empty() && *s != "."))
        .map(str::to_string)
        .collect()
}

/// Resolve `reference` against folder `dir`, or `None` if it leaves the base folder.
fn join_relative(dir: &str, reference: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(reference.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            segment => segments.push(segment),
        }
    }
    Some(segments.join("/"))
}
