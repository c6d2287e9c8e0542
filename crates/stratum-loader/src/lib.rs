//! The **Stratum** resolution engine.
//!
//! Given an ordered list of [pack sources], this crate computes per-namespace
//! overlay order, resolves lookups by [`Identifier`], supports prefix and
//! predicate search, and re-runs the whole computation whenever the pack set
//! changes. Later-added packs take priority over earlier ones for
//! single-resource resolution; "all resources" queries see every contributor,
//! oldest first.
//!
//! Two manager flavors exist, distinguished by an explicit [`ManagerKind`]
//! tag: the reloadable kind is rebuilt wholesale from a fresh pack snapshot
//! on every reload event, while the [static] kind is assembled exactly once
//! per [`Domain`] from a fixed directory convention and never rebuilt.
//!
//! [pack sources]: stratum_pack::PackSource
//! [static]: StaticResourceLoader

use std::io;

use stratum_resource::{Domain, Environment, Identifier};

mod context;
mod index;
mod manager;
mod static_loader;

pub use context::{ModContainer, RuntimeContext};
pub use index::NamespaceIndex;
pub use manager::{ManagerKind, ResourceManager};
pub use static_loader::{StaticResourceLoader, LEGACY_DIRECTORY_PREFIX, STATIC_DIRECTORY};

/// Errors surfaced by the resolution engine.
///
/// Everything here is either a usage error, a hard state error or a missing
/// mandatory resource. Partial, recoverable conditions (malformed pack
/// metadata, an unreadable pack directory, an unparsable document) are
/// logged and skipped instead - a single misbehaving pack never aborts the
/// surrounding operation.
#[derive(Debug, thiserror::Error)]
#[must_use]
pub enum Error {
    #[error("No resource found for {id}")]
    MissingResource { id: Identifier },

    #[error("Starting path {path:?} must not end with a trailing separator")]
    TrailingSeparator { path: String },

    #[error("The `{domain}` domain is not available in a `{environment}` environment")]
    Environment {
        domain: Domain,
        environment: Environment,
    },

    #[error("A static resource manager is built once and never rebuilt")]
    StaticRebuild,

    #[error(transparent)]
    Io(#[from] io::Error),
}
