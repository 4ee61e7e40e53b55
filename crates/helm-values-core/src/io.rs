use std::io::Write;

use serde::de::DeserializeOwned;
use serde_json::Value;
use vfs::VfsPath;

use crate::Error;

/// How schemas and manifests are read and written.
///
/// Constructed once by the caller and handed to every pipeline component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaIo {
    pub pretty: bool,
}

impl Default for SchemaIo {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl SchemaIo {
    #[must_use]
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    /// Serialize a JSON document according to the output style.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn to_vec(&self, value: &Value) -> Result<Vec<u8>, Error> {
        let mut bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn read_json(&self, path: &VfsPath) -> Result<Value, Error> {
        let reader = path.open_file()?;
        Ok(serde_json::from_reader(reader)?)
    }

    /// Read a JSON file, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read_json_if_exists(&self, path: &VfsPath) -> Result<Option<Value>, Error> {
        if !path.is_file()? {
            return Ok(None);
        }
        self.read_json(path).map(Some)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialized.
    pub fn read_yaml<T: DeserializeOwned>(&self, path: &VfsPath) -> Result<T, Error> {
        let raw = path.read_to_string()?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Write a JSON document, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_json(&self, path: &VfsPath, value: &Value) -> Result<(), Error> {
        let bytes = self.to_vec(value)?;
        write_bytes(path, &bytes)
    }
}

/// Write raw bytes, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the parent directory or the file cannot be created.
pub fn write_bytes(path: &VfsPath, bytes: &[u8]) -> Result<(), Error> {
    path.parent().create_dir_all()?;
    let mut file = path.create_file()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(())
}

/// Delete `dir` with all its content and create it again empty.
///
/// # Errors
///
/// Returns an error if the directory cannot be removed or created.
pub fn recreate_dir(dir: &VfsPath) -> Result<(), Error> {
    if dir.exists()? {
        dir.remove_dir_all()?;
    }
    dir.create_dir_all()?;
    Ok(())
}
