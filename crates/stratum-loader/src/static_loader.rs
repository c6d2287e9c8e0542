use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use serde_json::Value;
use stratum_pack::{DirectoryPack, PackSource, Resource, ZipPack, ARCHIVE_EXTENSION};
use stratum_resource::{Domain, Identifier};
use tracing::{debug, warn};

use crate::manager::ResourceManager;
use crate::{Error, RuntimeContext};

/// Top-level directory under the runtime root (and under each mod root)
/// whose per-domain subdirectories contribute static packs.
pub const STATIC_DIRECTORY: &str = "static";

/// Legacy-compatibility alias: `<root>/resources/static/<domain-dir>` is
/// scanned right after the primary location.
pub const LEGACY_DIRECTORY_PREFIX: &str = "resources";

type Registry = Mutex<HashMap<Domain, Arc<StaticResourceLoader>>>;

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::default);

/// A resource loader over packs that are discovered once at startup and
/// never reloaded.
///
/// Unlike the reloadable managers rebuilt on every reload event, static
/// resources are accessible as soon as a loader instance exists, and the
/// pack set is frozen for the lifetime of the process. One instance exists
/// per [`Domain`]; the first caller pays the discovery cost, subsequent
/// callers share the same instance.
///
/// Packs are discovered from three locations, in override order (later wins
/// for single-resource resolution):
///
/// 1. `<root>/static/<domain-dir>` (created if absent),
/// 2. `<root>/resources/static/<domain-dir>` (legacy alias),
/// 3. `<mod-root>/static/<domain-dir>` for each installed mod.
///
/// Only the immediate children of those directories become packs: a child
/// directory is loaded as a directory pack, a child `.zip` as an archive
/// pack, and any other loose file is logged and skipped.
#[derive(Debug)]
#[must_use]
pub struct StaticResourceLoader {
    manager: ResourceManager,
}

impl StaticResourceLoader {
    /// Fetches (or lazily constructs) the process-wide instance for
    /// `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Environment`] when `domain` is unavailable in the
    /// context's environment - requesting client assets in a dedicated
    /// server run is a state error, and no instance is constructed. An I/O
    /// error is only possible while scaffolding the primary static
    /// directory.
    pub fn get(domain: Domain, context: &RuntimeContext) -> Result<Arc<Self>, Error> {
        if !domain.available_in(context.environment) {
            return Err(Error::Environment {
                domain,
                environment: context.environment,
            });
        }

        let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(loader) = registry.get(&domain) {
            return Ok(Arc::clone(loader));
        }

        let packs = discover_packs(domain, context)?;
        let loader = Arc::new(Self {
            manager: ResourceManager::new_static(domain, packs),
        });
        registry.insert(domain, Arc::clone(&loader));
        Ok(loader)
    }

    /// Drops every memoized instance.
    ///
    /// Intended for test isolation; production code has no reason to call
    /// this, as static resources are by definition loaded once per process.
    pub fn reset() {
        REGISTRY
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// The underlying manager; its kind is always [`ManagerKind::Static`].
    ///
    /// [`ManagerKind::Static`]: crate::ManagerKind::Static
    #[must_use]
    pub const fn manager(&self) -> &ResourceManager {
        &self.manager
    }

    #[must_use]
    pub fn namespaces(&self) -> &[String] {
        self.manager.namespaces()
    }

    #[must_use]
    pub fn packs(&self) -> &[Arc<dyn PackSource>] {
        self.manager.packs()
    }

    #[must_use]
    pub fn get_resource(&self, id: &Identifier) -> Option<Resource> {
        self.manager.get_resource(id)
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingResource`] if no pack contributes `id`.
    pub fn get_resource_or_error(&self, id: &Identifier) -> Result<Resource, Error> {
        self.manager.get_resource_or_error(id)
    }

    #[must_use]
    pub fn get_all_resources(&self, id: &Identifier) -> Vec<Resource> {
        self.manager.get_all_resources(id)
    }

    /// # Errors
    ///
    /// Returns [`Error::TrailingSeparator`] for a `starting_path` ending in
    /// `/`.
    pub fn find_resources(
        &self,
        starting_path: &str,
        predicate: impl Fn(&Identifier) -> bool,
    ) -> Result<BTreeMap<Identifier, Resource>, Error> {
        self.manager.find_resources(starting_path, predicate)
    }

    /// # Errors
    ///
    /// Returns [`Error::TrailingSeparator`] for a `starting_path` ending in
    /// `/`.
    pub fn find_all_resources(
        &self,
        starting_path: &str,
        predicate: impl Fn(&Identifier) -> bool,
    ) -> Result<BTreeMap<Identifier, Vec<Resource>>, Error> {
        self.manager.find_all_resources(starting_path, predicate)
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingResource`] if `id` is absent, or an I/O error
    /// if the winning pack fails to produce a stream.
    pub fn open(&self, id: &Identifier) -> Result<Box<dyn Read + Send>, Error> {
        self.manager.open(id)
    }

    /// # Errors
    ///
    /// Same conditions as [`StaticResourceLoader::open`].
    pub fn open_buffered(&self, id: &Identifier) -> Result<BufReader<Box<dyn Read + Send>>, Error> {
        self.manager.open_buffered(id)
    }

    /// Finds every `.json` resource under `starting_path` (optionally
    /// restricted to `namespace`) and parses each into a generic
    /// [`Value`].
    ///
    /// A document that fails to read or parse is logged and excluded from
    /// the result; it never aborts the batch. `None` (or an empty string)
    /// for either argument means "no restriction".
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrailingSeparator`] for a `starting_path` ending in
    /// `/`.
    pub fn find_json_documents(
        &self,
        namespace: Option<&str>,
        starting_path: Option<&str>,
    ) -> Result<BTreeMap<Identifier, Value>, Error> {
        let resources = self
            .manager
            .find_resources(starting_path.unwrap_or(""), |id| {
                let namespace_matches = namespace
                    .is_none_or(|namespace| namespace.is_empty() || namespace == id.namespace());
                namespace_matches && id.path().ends_with(".json")
            })?;

        let mut documents = BTreeMap::new();
        for (id, resource) in resources {
            match parse_json(&resource) {
                Ok(value) => {
                    documents.insert(id, value);
                }
                Err(error) => {
                    warn!(%id, pack = resource.source_name(), %error, "Skipping an unparsable static JSON document");
                }
            }
        }
        Ok(documents)
    }
}

fn parse_json(resource: &Resource) -> serde_json::Result<Value> {
    let reader = resource.open_buffered().map_err(serde_json::Error::io)?;
    serde_json::from_reader(reader)
}

/// Assembles the static pack list for `domain`, in discovery order.
fn discover_packs(
    domain: Domain,
    context: &RuntimeContext,
) -> Result<Vec<Arc<dyn PackSource>>, Error> {
    let primary = context
        .root_dir
        .join(STATIC_DIRECTORY)
        .join(domain.directory());
    if !primary.is_dir() {
        // The primary location is a convenience scaffold, not an error
        // condition.
        fs::create_dir_all(&primary)?;
    }

    let legacy = context
        .root_dir
        .join(LEGACY_DIRECTORY_PREFIX)
        .join(STATIC_DIRECTORY)
        .join(domain.directory());

    let mut packs = scan_directory(&primary);
    packs.extend(scan_directory(&legacy));
    for container in &context.mods {
        let bundled = container
            .root
            .join(STATIC_DIRECTORY)
            .join(domain.directory());
        packs.extend(scan_directory(&bundled));
    }

    debug!(%domain, packs = packs.len(), "Discovered static packs");
    Ok(packs)
}

/// Turns the immediate children of `directory` into pack sources.
///
/// An unreadable or missing location contributes nothing; that is the
/// normal state for the legacy alias and for mods that bundle no static
/// content.
fn scan_directory(directory: &Path) -> Vec<Arc<dyn PackSource>> {
    let Ok(entries) = fs::read_dir(directory) else {
        return vec![];
    };

    let mut children: Vec<_> = entries.flatten().collect();
    children.sort_by_key(fs::DirEntry::file_name);

    let mut packs: Vec<Arc<dyn PackSource>> = vec![];
    for child in children {
        let path = child.path();
        let name = child.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            packs.push(Arc::new(DirectoryPack::new(name, path)));
        } else if path.extension() == Some(OsStr::new(ARCHIVE_EXTENSION)) {
            match ZipPack::open(name, &path) {
                Ok(pack) => packs.push(Arc::new(pack)),
                Err(error) => {
                    warn!(path = %path.display(), %error, "Skipping an unreadable pack archive");
                }
            }
        } else {
            warn!(
                path = %path.display(),
                "Loose files are not supported as static packs, skipping",
            );
        }
    }
    packs
}
