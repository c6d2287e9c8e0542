//! Pack sources for **Stratum**.
//!
//! A *pack* is a single directory or archive contributing resources. Every
//! pack follows the same internal layout: a folder per [`Domain`] at the
//! root, a folder per namespace inside it, and resource files below that:
//!
//! ```not-rust
//! my_pack/
//!     pack.json
//!     assets/
//!         foo/
//!             lang/en_us.json
//!     data/
//!         foo/
//!             recipes/diamond_pickaxe.json
//! ```
//!
//! This crate provides the [`PackSource`] seam the resolution engine stacks
//! its overlays from, with a [directory-backed](DirectoryPack) and an
//! [archive-backed](ZipPack) implementation, plus the optional pack-level
//! [metadata](PackMeta) that may narrow what a pack contributes.

use std::fmt;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;

use stratum_resource::{Domain, Identifier};

mod archive;
mod directory;
mod meta;

pub use archive::ZipPack;
pub use directory::DirectoryPack;
pub use meta::{BlockEntry, FilterSection, PackMeta, PackSection, PathFilter};

/// Name of the optional metadata file at the root of every pack.
pub const METADATA_FILE: &str = "pack.json";

/// File extension recognized as an archive-backed pack.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// An opaque handle to a directory or archive contributing resources.
///
/// Implementations own their backing storage; underlying OS handles are
/// released when the source is dropped. All lookups are synchronous and
/// infallible in the "not found" case - absence is a valid outcome, not an
/// error.
pub trait PackSource: fmt::Debug + Send + Sync {
    /// Display name of this pack, used in logs and diagnostics.
    fn name(&self) -> &str;

    /// The namespaces this pack declares for `domain`, deduplicated and in
    /// deterministic (sorted) order.
    fn namespaces(&self, domain: Domain) -> Vec<String>;

    /// Whether this pack holds a resource for `id` in `domain`.
    fn contains(&self, domain: Domain, id: &Identifier) -> bool;

    /// Opens the resource stream for `id` in `domain`.
    ///
    /// `None` means this pack has no such resource; `Some(Err(_))` means the
    /// resource exists but its backing storage failed to produce a stream.
    fn open(&self, domain: Domain, id: &Identifier) -> Option<io::Result<Box<dyn Read + Send>>>;

    /// Every identifier this pack holds under `starting_path` within
    /// `namespace`, treated as a directory prefix. An empty `starting_path`
    /// enumerates the whole namespace.
    fn list(&self, domain: Domain, namespace: &str, starting_path: &str) -> Vec<Identifier>;

    /// Raw bytes of the pack-level [`METADATA_FILE`], if present.
    fn metadata_bytes(&self) -> Option<io::Result<Vec<u8>>>;

    /// Parses the pack-level metadata, if present.
    ///
    /// # Errors
    ///
    /// Returns a [`PackError`] if the metadata file exists but cannot be read
    /// or does not deserialize into a [`PackMeta`].
    fn metadata(&self) -> Result<Option<PackMeta>, PackError> {
        match self.metadata_bytes() {
            None => Ok(None),
            Some(Err(source)) => Err(PackError::io(source, PathBuf::from(METADATA_FILE))),
            Some(Ok(bytes)) => Ok(Some(PackMeta::from_slice(&bytes)?)),
        }
    }
}

/// A resolved resource: a handle pairing the contributing [`PackSource`]
/// with the identifier it was resolved under.
///
/// The handle keeps the source alive for as long as it is held, so a stream
/// can be opened well after the lookup that produced it.
#[derive(Debug, Clone)]
#[must_use]
pub struct Resource {
    source: Arc<dyn PackSource>,
    domain: Domain,
    id: Identifier,
}

impl Resource {
    pub fn new(source: Arc<dyn PackSource>, domain: Domain, id: Identifier) -> Self {
        Self { source, domain, id }
    }

    /// Opens the raw byte stream of this resource.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the backing storage fails, or a `NotFound`
    /// error if the resource vanished from under the handle.
    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        self.source.open(self.domain, &self.id).unwrap_or_else(|| {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Resource {id} is gone from pack {name}", id = self.id, name = self.source.name()),
            ))
        })
    }

    /// Opens this resource behind a [`BufReader`].
    ///
    /// # Errors
    ///
    /// Same conditions as [`Resource::open`].
    pub fn open_buffered(&self) -> io::Result<BufReader<Box<dyn Read + Send>>> {
        self.open().map(BufReader::new)
    }

    /// Reads this resource to a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Resource::open`], plus an `InvalidData` error for
    /// content that is not valid UTF-8.
    pub fn read_to_string(&self) -> io::Result<String> {
        let mut contents = String::new();
        self.open()?.read_to_string(&mut contents)?;
        Ok(contents)
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub const fn domain(&self) -> Domain {
        self.domain
    }

    pub const fn id(&self) -> &Identifier {
        &self.id
    }
}

/// Errors produced while reading a pack's backing storage or metadata.
#[derive(Debug, thiserror::Error)]
#[must_use]
pub enum PackError {
    #[error("An I/O error occurred, path at fault: {path:?}")]
    Io {
        source: io::Error,
        path: Option<PathBuf>,
    },

    #[error("Failed to read the pack archive")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to deserialize pack metadata")]
    Meta(#[from] serde_json::Error),

    #[error("Invalid filter pattern in pack metadata")]
    Pattern(#[from] regex::Error),
}

impl PackError {
    pub const fn io(source: io::Error, path: PathBuf) -> Self {
        Self::Io {
            source,
            path: Some(path),
        }
    }
}
