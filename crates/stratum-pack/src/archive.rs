use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use stratum_resource::{Domain, Identifier, PATH_SEPARATOR};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::{PackError, PackSource, METADATA_FILE};

/// A [`PackSource`] backed by a `.zip` archive.
///
/// The archive handle is opened once and kept for the lifetime of the pack;
/// it is released when the pack is dropped. Entries are read out in full and
/// served as in-memory streams, so no borrow of the archive escapes a lookup.
#[must_use]
pub struct ZipPack {
    name: String,
    path: PathBuf,
    archive: Mutex<ZipArchive<File>>,
}

impl ZipPack {
    /// Opens the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`PackError`] if the file cannot be opened or is not a valid
    /// zip archive.
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, PackError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| PackError::io(source, path.clone()))?;
        let archive = ZipArchive::new(file)?;
        Ok(Self {
            name: name.into(),
            path,
            archive: Mutex::new(archive),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ZipArchive<File>> {
        self.archive.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry_name(domain: Domain, id: &Identifier) -> String {
        format!(
            "{dir}{sep}{ns}{sep}{path}",
            dir = domain.directory(),
            ns = id.namespace(),
            path = id.path(),
            sep = PATH_SEPARATOR,
        )
    }

    fn read_entry(&self, entry_name: &str) -> Option<io::Result<Vec<u8>>> {
        let mut archive = self.lock();
        let mut entry = match archive.by_name(entry_name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return None,
            Err(error) => return Some(Err(io::Error::other(error))),
        };
        let mut bytes = Vec::new();
        if let Err(error) = entry.read_to_end(&mut bytes) {
            return Some(Err(error));
        }
        Some(Ok(bytes))
    }
}

impl PackSource for ZipPack {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespaces(&self, domain: Domain) -> Vec<String> {
        let prefix = format!("{}{}", domain.directory(), PATH_SEPARATOR);
        let archive = self.lock();
        let mut namespaces: Vec<String> = archive
            .file_names()
            .filter_map(|entry| entry.strip_prefix(&prefix))
            .filter_map(|remainder| {
                let namespace = remainder.split(PATH_SEPARATOR).next()?;
                // A bare `assets/foo` file at namespace depth is not a namespace,
                // only `assets/foo/...` entries are.
                let is_nested = remainder.len() > namespace.len();
                (is_nested && !namespace.is_empty()).then(|| namespace.to_owned())
            })
            .collect();
        namespaces.sort_unstable();
        namespaces.dedup();
        namespaces
    }

    fn contains(&self, domain: Domain, id: &Identifier) -> bool {
        let entry_name = Self::entry_name(domain, id);
        self.lock().index_for_name(&entry_name).is_some()
    }

    fn open(&self, domain: Domain, id: &Identifier) -> Option<io::Result<Box<dyn Read + Send>>> {
        let entry_name = Self::entry_name(domain, id);
        let bytes = self.read_entry(&entry_name)?;
        Some(bytes.map(|bytes| Box::new(Cursor::new(bytes)) as Box<dyn Read + Send>))
    }

    fn list(&self, domain: Domain, namespace: &str, starting_path: &str) -> Vec<Identifier> {
        let namespace_prefix = format!(
            "{dir}{sep}{namespace}{sep}",
            dir = domain.directory(),
            sep = PATH_SEPARATOR,
        );
        let scan_prefix = if starting_path.is_empty() {
            namespace_prefix.clone()
        } else {
            format!("{namespace_prefix}{starting_path}{PATH_SEPARATOR}")
        };

        let archive = self.lock();
        let mut found: Vec<Identifier> = archive
            .file_names()
            .filter(|entry| entry.starts_with(&scan_prefix) && !entry.ends_with(PATH_SEPARATOR))
            .filter_map(|entry| {
                let path = entry.strip_prefix(&namespace_prefix)?;
                Identifier::new(namespace, path).ok()
            })
            .collect();
        found.sort_unstable();
        found
    }

    fn metadata_bytes(&self) -> Option<io::Result<Vec<u8>>> {
        self.read_entry(METADATA_FILE)
    }
}

impl fmt::Debug for ZipPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipPack")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
