use std::io::Write;

use color_eyre::eyre;
use flate2::{Compression, write::GzEncoder};
use tar::{EntryType, Header};
use vfs::VfsPath;

#[derive(Debug, Clone)]
enum Entry {
    Dir,
    File(Vec<u8>),
    Archive(ChartArchive),
}

/// Builds a packaged chart (`<name>-<version>.tgz`) in memory.
///
/// All entries are placed below the archive root directory, the way
/// `helm package` lays them out.
#[derive(Debug, Clone)]
pub struct ChartArchive {
    root: String,
    entries: Vec<(String, Entry)>,
}

impl ChartArchive {
    /// An empty archive with root directory `root`.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
        }
    }

    /// An archive for chart `name` with a minimal `Chart.yaml`.
    #[must_use]
    pub fn chart(name: &str, version: &str) -> Self {
        Self::new(name).with_file(
            "Chart.yaml",
            format!("apiVersion: v2\nname: {name}\nversion: {version}\n"),
        )
    }

    #[must_use]
    pub fn with_dir(mut self, path: impl Into<String>) -> Self {
        self.entries.push((path.into(), Entry::Dir));
        self
    }

    /// Add or replace a file. Paths are relative to the archive root.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, data: impl AsRef<[u8]>) -> Self {
        let path = path.into();
        self.entries.retain(|(p, _)| *p != path);
        self.entries
            .push((path, Entry::File(data.as_ref().to_vec())));
        self
    }

    /// Nest another packaged chart, e.g. at `charts/child-0.1.0.tgz`.
    #[must_use]
    pub fn with_archive(mut self, path: impl Into<String>, archive: ChartArchive) -> Self {
        self.entries.push((path.into(), Entry::Archive(archive)));
        self
    }

    /// Encode as gzip compressed tar.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry cannot be appended.
    pub fn to_bytes(&self) -> eyre::Result<Vec<u8>> {
        let mut tar_buf = Vec::new();
        {
            let mut tar = tar::Builder::new(&mut tar_buf);

            let mut dir_header = Header::new_gnu();
            dir_header.set_entry_type(EntryType::Directory);
            dir_header.set_mode(0o755);
            dir_header.set_size(0);
            dir_header.set_cksum();
            tar.append_data(&mut dir_header, format!("{}/", self.root), std::io::empty())?;

            for (path, entry) in &self.entries {
                let path = format!("{}/{path}", self.root);
                let data = match entry {
                    Entry::Dir => {
                        let mut header = Header::new_gnu();
                        header.set_entry_type(EntryType::Directory);
                        header.set_mode(0o755);
                        header.set_size(0);
                        header.set_cksum();
                        tar.append_data(&mut header, format!("{path}/"), std::io::empty())?;
                        continue;
                    }
                    Entry::File(data) => data.clone(),
                    Entry::Archive(archive) => archive.to_bytes()?,
                };
                let mut header = Header::new_gnu();
                header.set_entry_type(EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(data.len() as u64);
                header.set_cksum();
                tar.append_data(&mut header, path, std::io::Cursor::new(data))?;
            }
            tar.finish()?;
        }

        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&tar_buf)?;
        Ok(gz.finish()?)
    }

    /// Encode and write to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn write_to(&self, path: &VfsPath) -> eyre::Result<VfsPath> {
        crate::write(path, self.to_bytes()?)
    }
}
