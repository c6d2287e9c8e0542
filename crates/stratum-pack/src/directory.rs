use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use stratum_resource::{Domain, Identifier, PATH_SEPARATOR};
use tracing::warn;
use walkdir::WalkDir;

use crate::{PackSource, METADATA_FILE};

/// A [`PackSource`] backed by a plain directory on disk.
///
/// Resources live at `<root>/<domain-dir>/<namespace>/<path>`. The directory
/// is read lazily on every lookup, so the pack holds no OS handles between
/// calls.
#[derive(Debug, Clone)]
#[must_use]
pub struct DirectoryPack {
    name: String,
    root: PathBuf,
}

impl DirectoryPack {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    fn domain_root(&self, domain: Domain) -> PathBuf {
        self.root.join(domain.directory())
    }

    fn resource_path(&self, domain: Domain, id: &Identifier) -> PathBuf {
        let mut path = self.domain_root(domain);
        path.push(id.namespace());
        for segment in id.path().split(PATH_SEPARATOR) {
            path.push(segment);
        }
        path
    }
}

impl PackSource for DirectoryPack {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespaces(&self, domain: Domain) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.domain_root(domain)) else {
            return vec![];
        };

        let mut namespaces: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|file_type| file_type.is_dir()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        namespaces.sort_unstable();
        namespaces.dedup();
        namespaces
    }

    fn contains(&self, domain: Domain, id: &Identifier) -> bool {
        self.resource_path(domain, id).is_file()
    }

    fn open(&self, domain: Domain, id: &Identifier) -> Option<io::Result<Box<dyn Read + Send>>> {
        let path = self.resource_path(domain, id);
        if !path.is_file() {
            return None;
        }
        Some(File::open(path).map(|file| Box::new(file) as Box<dyn Read + Send>))
    }

    fn list(&self, domain: Domain, namespace: &str, starting_path: &str) -> Vec<Identifier> {
        let namespace_root = self.domain_root(domain).join(namespace);
        let mut scan_root = namespace_root.clone();
        for segment in starting_path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            scan_root.push(segment);
        }
        if !scan_root.is_dir() {
            return vec![];
        }

        let mut found = vec![];
        for entry in WalkDir::new(&scan_root).sort_by_file_name().into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            match relative_resource_path(&namespace_root, entry.path()) {
                Some(path) => match Identifier::new(namespace, path) {
                    Ok(id) => found.push(id),
                    Err(error) => {
                        warn!(pack = %self.name, %error, "Skipping a file that does not form a valid identifier");
                    }
                },
                None => {
                    warn!(
                        pack = %self.name,
                        path = %entry.path().display(),
                        "Skipping a file with a non-UTF-8 name",
                    );
                }
            }
        }
        found
    }

    fn metadata_bytes(&self) -> Option<io::Result<Vec<u8>>> {
        let path = self.root.join(METADATA_FILE);
        if !path.is_file() {
            return None;
        }
        Some(fs::read(path))
    }
}

/// Rebuilds the `/`-separated resource path of `file` relative to the
/// namespace root, independent of the platform's path separator.
fn relative_resource_path(namespace_root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(namespace_root).ok()?;
    let segments: Option<Vec<&str>> = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect();
    Some(segments?.join(&PATH_SEPARATOR.to_string()))
}
