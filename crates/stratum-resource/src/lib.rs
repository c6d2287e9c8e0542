//! Value types shared across **Stratum**.
//!
//! Everything a resource lookup is keyed by lives here: the [`Identifier`]
//! value type, the [`Namespace`] it is partitioned by, and the [`Domain`] /
//! [`Environment`] discriminators that decide which resource space a manager
//! serves and where it is allowed to exist.
//!
//! This crate does not resolve anything on its own, it only provides types to
//! be used by the other parts of **Stratum**.

use std::fmt;
use std::str::FromStr;

use nutype::nutype;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The character separating the namespace from the path in the textual form
/// of an [`Identifier`].
pub const NAMESPACE_SEPARATOR: char = ':';

/// The character separating segments within an [`Identifier`]'s path.
pub const PATH_SEPARATOR: char = '/';

/// A grouping prefix partitioning identifiers by contributing origin.
#[nutype(
    sanitize(trim, lowercase),
    validate(not_empty),
    derive(
        Clone,
        Debug,
        Display,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Deref,
        TryFrom,
        Serialize,
        Deserialize,
    )
)]
pub struct Namespace(String);

/// A `(namespace, path)` pair naming one resource.
///
/// Both components are non-empty, and the path never ends with a trailing
/// [`PATH_SEPARATOR`] - such input is rejected as invalid rather than
/// silently normalized. Identifiers are immutable; equality and ordering are
/// lexicographic on `(namespace, path)`.
///
/// The textual form is `namespace:path`, e.g. `foo:recipes/a.json`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[must_use]
pub struct Identifier {
    namespace: Namespace,
    path: String,
}

impl Identifier {
    /// Builds an [`Identifier`] from its two components.
    ///
    /// The namespace is sanitized (trimmed, lowercased) before validation.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentifierError`] if either component is empty, or if the
    /// path ends with a trailing [`PATH_SEPARATOR`].
    pub fn new(namespace: impl AsRef<str>, path: impl Into<String>) -> Result<Self, IdentifierError> {
        let namespace = Namespace::try_new(namespace.as_ref().to_owned())
            .map_err(|_| IdentifierError::EmptyNamespace)?;
        let path = path.into();
        if path.is_empty() {
            return Err(IdentifierError::EmptyPath);
        }
        if path.ends_with(PATH_SEPARATOR) {
            return Err(IdentifierError::TrailingSeparator { path });
        }
        Ok(Self { namespace, path })
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{NAMESPACE_SEPARATOR}{}", self.namespace, self.path)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({self})")
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let Some((namespace, path)) = input.split_once(NAMESPACE_SEPARATOR) else {
            return Err(IdentifierError::MissingSeparator {
                input: input.to_owned(),
            });
        };
        Self::new(namespace, path)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        input.parse()
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.to_string()
    }
}

/// Ways in which textual input can fail to form a valid [`Identifier`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[must_use]
pub enum IdentifierError {
    #[error("The namespace of an identifier must not be empty")]
    EmptyNamespace,

    #[error("The path of an identifier must not be empty")]
    EmptyPath,

    #[error("The path {path:?} must not end with a trailing separator")]
    TrailingSeparator { path: String },

    #[error("Expected `namespace:path`, got {input:?}")]
    MissingSeparator { input: String },
}

/// One of the two independent resource spaces.
///
/// The two domains are mutually exclusive at manager-construction time: a
/// manager serves either client-facing assets or server-facing data, never
/// both.
#[derive(
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[must_use]
pub enum Domain {
    /// Client-facing assets (textures, models, localization).
    Assets,
    /// Server-facing data (recipes, loot tables, arbitrary datapack content).
    Data,
}

impl Domain {
    /// The per-domain root folder inside every pack.
    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Data => "data",
        }
    }

    /// Whether this domain may be served at all under `environment`.
    ///
    /// The [`Domain::Assets`] space is client-only; a dedicated server run
    /// has no business resolving it.
    #[must_use]
    pub const fn available_in(self, environment: Environment) -> bool {
        match self {
            Self::Assets => matches!(environment, Environment::Client),
            Self::Data => true,
        }
    }
}

/// The run-context discriminator supplied by the host runtime.
#[derive(
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[must_use]
pub enum Environment {
    Client,
    Server,
}
