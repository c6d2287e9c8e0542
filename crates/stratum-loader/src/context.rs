use std::path::PathBuf;

use stratum_resource::Environment;

/// Host-supplied facts the static loader assembles itself from.
///
/// The host runtime is an external collaborator; everything the engine needs
/// from it - the runtime root directory, the run-context discriminator and
/// the set of installed mod containers - is captured here once, at the
/// boundary.
#[derive(Debug, Clone)]
#[must_use]
pub struct RuntimeContext {
    pub root_dir: PathBuf,
    pub environment: Environment,
    pub mods: Vec<ModContainer>,
}

impl RuntimeContext {
    pub fn new(root_dir: impl Into<PathBuf>, environment: Environment) -> Self {
        Self {
            root_dir: root_dir.into(),
            environment,
            mods: vec![],
        }
    }

    /// Attaches the installed mod containers, in the host's load order.
    pub fn with_mods(mut self, mods: Vec<ModContainer>) -> Self {
        self.mods = mods;
        self
    }
}

/// One installed mod and the root path of its bundled files.
#[derive(Debug, Clone)]
#[must_use]
pub struct ModContainer {
    pub name: String,
    pub root: PathBuf,
}

impl ModContainer {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }
}
