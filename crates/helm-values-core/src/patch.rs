use serde_json::Value;
use vfs::VfsPath;

use crate::{Error, SchemaIo};

/// An RFC 6902 JSON Patch document.
pub type JsonPatch = json_patch::Patch;

/// Load a JSON Patch from `path`, or `None` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but is not a valid JSON Patch.
pub fn load_json_patch(io: &SchemaIo, path: &VfsPath) -> Result<Option<JsonPatch>, Error> {
    let Some(raw) = io.read_json_if_exists(path)? else {
        return Ok(None);
    };
    let patch: JsonPatch = serde_json::from_value(raw)?;
    tracing::debug!(path = path.as_str(), ops = patch.0.len(), "loaded json patch");
    Ok(Some(patch))
}

/// Apply an optional patch to `schema`. Absence is a no-op.
///
/// # Errors
///
/// Returns an error if an operation of the patch cannot be applied.
/// `schema` is left unchanged in that case.
pub fn apply_json_patch(schema: &mut Value, patch: Option<&JsonPatch>) -> Result<(), Error> {
    if let Some(patch) = patch {
        json_patch::patch(schema, &patch.0)?;
    }
    Ok(())
}
