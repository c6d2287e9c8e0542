//! Optional pack-level metadata, read from [`METADATA_FILE`] at a pack's
//! root:
//!
//! ```json
//! {
//!     "pack": { "description": "Extra furnace recipes" },
//!     "filter": {
//!         "block": [
//!             { "namespace": "foo", "path": "recipes/.*" }
//!         ]
//!     }
//! }
//! ```
//!
//! The `filter` section narrows what the pack contributes: a resource is
//! withheld if any `block` entry matches both its namespace and its path.
//! Patterns are regexes matched against the full component; an omitted
//! pattern matches everything.
//!
//! [`METADATA_FILE`]: crate::METADATA_FILE

use regex::Regex;
use serde::Deserialize;

/// The deserialized shape of a pack's metadata file.
#[derive(Debug, Clone, Default, Deserialize)]
#[must_use]
pub struct PackMeta {
    #[serde(default)]
    pub pack: Option<PackSection>,
    #[serde(default)]
    pub filter: Option<FilterSection>,
}

impl PackMeta {
    /// Deserializes a [`PackMeta`] from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error for anything that is not a valid
    /// metadata document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Compiles the `filter` section into a [`PathFilter`].
    ///
    /// `Ok(None)` means the pack carries no filter and contributes
    /// everything.
    ///
    /// # Errors
    ///
    /// Returns a [`regex::Error`] if any block pattern fails to compile.
    pub fn compile_filter(&self) -> Result<Option<PathFilter>, regex::Error> {
        let Some(section) = &self.filter else {
            return Ok(None);
        };
        if section.block.is_empty() {
            return Ok(None);
        }

        let blocks = section
            .block
            .iter()
            .map(BlockPattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(PathFilter { blocks }))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackSection {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterSection {
    #[serde(default)]
    pub block: Vec<BlockEntry>,
}

/// One raw `block` entry; both patterns are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockEntry {
    pub namespace: Option<String>,
    pub path: Option<String>,
}

/// A compiled predicate narrowing which identifiers a pack contributes.
///
/// Absence of a filter means "contributes everything"; this type only
/// exists once at least one block entry compiled.
#[derive(Debug, Clone)]
#[must_use]
pub struct PathFilter {
    blocks: Vec<BlockPattern>,
}

impl PathFilter {
    /// Whether any block entry's namespace pattern matches `namespace`.
    #[must_use]
    pub fn blocks_namespace(&self, namespace: &str) -> bool {
        self.blocks
            .iter()
            .any(|block| block.matches_namespace(namespace))
    }

    /// Whether the identifier `(namespace, path)` survives this filter.
    #[must_use]
    pub fn allows(&self, namespace: &str, path: &str) -> bool {
        !self
            .blocks
            .iter()
            .any(|block| block.matches_namespace(namespace) && block.matches_path(path))
    }
}

#[derive(Debug, Clone)]
struct BlockPattern {
    namespace: Option<Regex>,
    path: Option<Regex>,
}

impl BlockPattern {
    fn compile(entry: &BlockEntry) -> Result<Self, regex::Error> {
        Ok(Self {
            namespace: entry.namespace.as_deref().map(anchored).transpose()?,
            path: entry.path.as_deref().map(anchored).transpose()?,
        })
    }

    fn matches_namespace(&self, namespace: &str) -> bool {
        self.namespace
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(namespace))
    }

    fn matches_path(&self, path: &str) -> bool {
        self.path
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(path))
    }
}

/// Patterns match the whole component, not a substring of it.
fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}
