use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{BufReader, Read};
use std::sync::Arc;

use itertools::Itertools;
use stratum_pack::{PackSource, PathFilter, Resource};
use stratum_resource::{Domain, Identifier, PATH_SEPARATOR};
use strum::Display;
use tracing::{debug, warn};

use crate::index::NamespaceIndex;
use crate::Error;

/// Whether a [`ResourceManager`] may ever be rebuilt.
#[derive(Display, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[strum(serialize_all = "lowercase")]
#[must_use]
pub enum ManagerKind {
    /// Rebuilt wholesale from a fresh pack snapshot on every reload event.
    Reloadable,
    /// Assembled once for the process lifetime, never rebuilt.
    Static,
}

/// Owns the complete pack list for one [`Domain`] and answers
/// identifier-level and path-prefix-level queries over it.
///
/// The per-namespace overlay order is derived state: it is recomputed from
/// scratch whenever the pack list changes and never patched incrementally,
/// since a single insertion or removal can shift the overlay order of every
/// namespace.
#[derive(Debug)]
#[must_use]
pub struct ResourceManager {
    domain: Domain,
    kind: ManagerKind,
    packs: Vec<Arc<dyn PackSource>>,
    namespaces: Vec<String>,
    indices: HashMap<String, NamespaceIndex>,
}

impl ResourceManager {
    /// Builds a reloadable manager from a snapshot of pack sources.
    ///
    /// The snapshot is ordered: later packs override earlier ones for
    /// single-resource resolution.
    pub fn new(domain: Domain, packs: Vec<Arc<dyn PackSource>>) -> Self {
        Self::with_kind(domain, ManagerKind::Reloadable, packs)
    }

    /// Builds a manager that is never rebuilt; [`ResourceManager::update_packs`]
    /// will refuse to touch it.
    pub fn new_static(domain: Domain, packs: Vec<Arc<dyn PackSource>>) -> Self {
        Self::with_kind(domain, ManagerKind::Static, packs)
    }

    fn with_kind(domain: Domain, kind: ManagerKind, packs: Vec<Arc<dyn PackSource>>) -> Self {
        let mut manager = Self {
            domain,
            kind,
            packs,
            namespaces: vec![],
            indices: HashMap::new(),
        };
        manager.compute_namespaces();
        manager
    }

    /// Replaces the pack snapshot and recomputes every derived index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaticRebuild`] for a [`ManagerKind::Static`]
    /// manager.
    pub fn update_packs(&mut self, packs: Vec<Arc<dyn PackSource>>) -> Result<(), Error> {
        if self.kind == ManagerKind::Static {
            return Err(Error::StaticRebuild);
        }
        self.packs = packs;
        self.compute_namespaces();
        Ok(())
    }

    /// Rebuilds the `namespace -> overlay` mapping from the current pack
    /// list.
    ///
    /// A pack contributes to a namespace's index if it declares the
    /// namespace directly, or if its metadata filter matches the namespace.
    /// When both hold, the filter still narrows what the pack contributes.
    fn compute_namespaces(&mut self) {
        let declared: Vec<BTreeSet<String>> = self
            .packs
            .iter()
            .map(|pack| pack.namespaces(self.domain).into_iter().collect())
            .collect();
        let filters: Vec<Option<Arc<PathFilter>>> = self
            .packs
            .iter()
            .map(|pack| derive_filter(pack.as_ref()))
            .collect();

        // Distinct union of declared namespaces, preserving first-seen order.
        self.namespaces = declared.iter().flatten().unique().cloned().collect();

        self.indices = self
            .namespaces
            .iter()
            .map(|namespace| {
                let mut index = NamespaceIndex::new(self.domain, namespace);
                for ((pack, declared), filter) in
                    self.packs.iter().zip(&declared).zip(&filters)
                {
                    let declares = declared.contains(namespace);
                    let filter_matches = filter
                        .as_ref()
                        .is_some_and(|filter| filter.blocks_namespace(namespace));
                    if declares || filter_matches {
                        index.add_source(Arc::clone(pack), filter.clone());
                    }
                }
                debug_assert!(!index.is_empty());
                (namespace.clone(), index)
            })
            .collect();

        debug!(
            domain = %self.domain,
            packs = self.packs.len(),
            namespaces = self.namespaces.len(),
            "Recomputed namespace indices",
        );
    }

    pub const fn domain(&self) -> Domain {
        self.domain
    }

    pub const fn kind(&self) -> ManagerKind {
        self.kind
    }

    /// The pack snapshot this manager was built from, in insertion order.
    #[must_use]
    pub fn packs(&self) -> &[Arc<dyn PackSource>] {
        &self.packs
    }

    /// Every known namespace, in first-seen order across the pack list.
    #[must_use]
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// The overlay index for one namespace, if any source contributes it.
    #[must_use]
    pub fn namespace_index(&self, namespace: &str) -> Option<&NamespaceIndex> {
        self.indices.get(namespace)
    }

    /// Resolves `id` to the single winning resource, if any.
    ///
    /// Absence is a valid outcome, not a failure.
    #[must_use]
    pub fn get_resource(&self, id: &Identifier) -> Option<Resource> {
        self.indices.get(id.namespace())?.resolve_one(id)
    }

    /// Resolves `id`, treating absence as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingResource`] if no pack contributes `id`.
    pub fn get_resource_or_error(&self, id: &Identifier) -> Result<Resource, Error> {
        self.get_resource(id)
            .ok_or_else(|| Error::MissingResource { id: id.clone() })
    }

    /// Every contributing source for `id` across the whole overlay stack,
    /// oldest first - the order layered-merge consumers want.
    #[must_use]
    pub fn get_all_resources(&self, id: &Identifier) -> Vec<Resource> {
        self.indices
            .get(id.namespace())
            .map(|index| index.resolve_all(id))
            .unwrap_or_default()
    }

    /// Enumerates every identifier under `starting_path` across all
    /// namespaces that satisfies `predicate`, resolved to its single winning
    /// source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrailingSeparator`] if `starting_path` ends with a
    /// `/` - a usage error, rejected rather than silently normalized.
    pub fn find_resources(
        &self,
        starting_path: &str,
        predicate: impl Fn(&Identifier) -> bool,
    ) -> Result<BTreeMap<Identifier, Resource>, Error> {
        reject_trailing_separator(starting_path)?;
        let mut found = BTreeMap::new();
        for namespace in &self.namespaces {
            found.extend(self.indices[namespace].find_resources(starting_path, &predicate));
        }
        Ok(found)
    }

    /// Like [`ResourceManager::find_resources`], but keeps every
    /// contributing source per identifier, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrailingSeparator`] if `starting_path` ends with a
    /// `/`.
    pub fn find_all_resources(
        &self,
        starting_path: &str,
        predicate: impl Fn(&Identifier) -> bool,
    ) -> Result<BTreeMap<Identifier, Vec<Resource>>, Error> {
        reject_trailing_separator(starting_path)?;
        let mut found = BTreeMap::new();
        for namespace in &self.namespaces {
            found.extend(self.indices[namespace].find_all_resources(starting_path, &predicate));
        }
        Ok(found)
    }

    /// Resolves `id` and opens its byte stream in one step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingResource`] if `id` is absent, or an I/O error
    /// if the winning pack fails to produce a stream.
    pub fn open(&self, id: &Identifier) -> Result<Box<dyn Read + Send>, Error> {
        Ok(self.get_resource_or_error(id)?.open()?)
    }

    /// Resolves `id` and opens it behind a [`BufReader`].
    ///
    /// # Errors
    ///
    /// Same conditions as [`ResourceManager::open`].
    pub fn open_buffered(&self, id: &Identifier) -> Result<BufReader<Box<dyn Read + Send>>, Error> {
        Ok(self.open(id).map(BufReader::new)?)
    }
}

fn reject_trailing_separator(starting_path: &str) -> Result<(), Error> {
    if starting_path.ends_with(PATH_SEPARATOR) {
        return Err(Error::TrailingSeparator {
            path: starting_path.to_owned(),
        });
    }
    Ok(())
}

/// Derives a pack's contribution filter from its metadata.
///
/// Malformed or unreadable metadata is logged and treated as "no filter";
/// a single misbehaving pack must not abort manager construction.
fn derive_filter(pack: &dyn PackSource) -> Option<Arc<PathFilter>> {
    match pack.metadata() {
        Ok(None) => None,
        Ok(Some(meta)) => match meta.compile_filter() {
            Ok(filter) => filter.map(Arc::new),
            Err(error) => {
                warn!(pack = pack.name(), %error, "Ignoring an uncompilable resource filter");
                None
            }
        },
        Err(error) => {
            warn!(pack = pack.name(), %error, "Failed to read pack metadata, assuming no filter");
            None
        }
    }
}
