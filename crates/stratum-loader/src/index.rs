use std::collections::BTreeMap;
use std::sync::Arc;

use stratum_pack::{PackSource, PathFilter, Resource};
use stratum_resource::{Domain, Identifier};

/// The override-ordered list of pack sources contributing one namespace.
///
/// Entries are appended in pack-list order; for single-resource resolution
/// the *latest* matching entry wins, while "all resources" queries walk the
/// stack oldest-first. An index only ever exists for a namespace some source
/// actually contributes - empty indices are never constructed.
#[derive(Debug)]
#[must_use]
pub struct NamespaceIndex {
    domain: Domain,
    namespace: String,
    entries: Vec<Entry>,
}

#[derive(Debug)]
struct Entry {
    source: Arc<dyn PackSource>,
    filter: Option<Arc<PathFilter>>,
}

impl Entry {
    /// Whether this entry is allowed to contribute `path` at all.
    fn allows(&self, namespace: &str, path: &str) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|filter| filter.allows(namespace, path))
    }
}

impl NamespaceIndex {
    pub(crate) fn new(domain: Domain, namespace: impl Into<String>) -> Self {
        Self {
            domain,
            namespace: namespace.into(),
            entries: vec![],
        }
    }

    /// Appends a source; later additions take single-resolution priority.
    pub(crate) fn add_source(
        &mut self,
        source: Arc<dyn PackSource>,
        filter: Option<Arc<PathFilter>>,
    ) {
        self.entries.push(Entry { source, filter });
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves `id` against the overlay stack, newest entry first.
    ///
    /// Entries whose filter rejects the path are skipped. `None` means "not
    /// found", which is a valid outcome rather than an error.
    #[must_use]
    pub fn resolve_one(&self, id: &Identifier) -> Option<Resource> {
        self.entries
            .iter()
            .rev()
            .filter(|entry| entry.allows(id.namespace(), id.path()))
            .find(|entry| entry.source.contains(self.domain, id))
            .map(|entry| Resource::new(Arc::clone(&entry.source), self.domain, id.clone()))
    }

    /// Every matching source for `id`, oldest first.
    #[must_use]
    pub fn resolve_all(&self, id: &Identifier) -> Vec<Resource> {
        self.entries
            .iter()
            .filter(|entry| entry.allows(id.namespace(), id.path()))
            .filter(|entry| entry.source.contains(self.domain, id))
            .map(|entry| Resource::new(Arc::clone(&entry.source), self.domain, id.clone()))
            .collect()
    }

    /// Enumerates identifiers under `starting_path`, resolved to the single
    /// winning source each. Later entries override earlier ones.
    pub(crate) fn find_resources(
        &self,
        starting_path: &str,
        predicate: impl Fn(&Identifier) -> bool,
    ) -> BTreeMap<Identifier, Resource> {
        let mut found = BTreeMap::new();
        for entry in &self.entries {
            for id in entry.source.list(self.domain, &self.namespace, starting_path) {
                if entry.allows(id.namespace(), id.path()) && predicate(&id) {
                    let resource = Resource::new(Arc::clone(&entry.source), self.domain, id.clone());
                    found.insert(id, resource);
                }
            }
        }
        found
    }

    /// Enumerates identifiers under `starting_path`, each with every
    /// contributing source, oldest first.
    pub(crate) fn find_all_resources(
        &self,
        starting_path: &str,
        predicate: impl Fn(&Identifier) -> bool,
    ) -> BTreeMap<Identifier, Vec<Resource>> {
        let mut found: BTreeMap<Identifier, Vec<Resource>> = BTreeMap::new();
        for entry in &self.entries {
            for id in entry.source.list(self.domain, &self.namespace, starting_path) {
                if entry.allows(id.namespace(), id.path()) && predicate(&id) {
                    let resource = Resource::new(Arc::clone(&entry.source), self.domain, id.clone());
                    found.entry(id).or_default().push(resource);
                }
            }
        }
        found
    }
}
