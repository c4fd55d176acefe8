//! `gopkg.toml` manifest parsing and persistence.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::fsutil::write_atomic;
use crate::scope::{validate_module, validate_version};
use crate::version::VersionSpec;

/// The declared dependencies of a project (or of the global scope).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Project name.
    pub name: String,
    /// Module identifier → declared version spec. Sorted by module name.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// An empty manifest for `name`.
    pub fn new(name: &str) -> Self {
        Manifest {
            name: name.to_string(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Parse a manifest from a TOML string.
    pub fn parse(input: &str, path: &Path) -> Result<Self, ManifestError> {
        toml::from_str(input).map_err(|source| ManifestError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the manifest at `path`; a missing file is [`ManifestError::NotFound`].
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(ManifestError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Manifest::parse(&content, path)
    }

    /// Load the manifest, or start a fresh one named `default_name` when the
    /// file does not exist yet. Decode errors still propagate.
    pub fn load_or_new(path: &Path, default_name: &str) -> Result<Self, ManifestError> {
        match Manifest::load(path) {
            Err(ManifestError::NotFound { .. }) => Ok(Manifest::new(default_name)),
            other => other,
        }
    }

    /// Write the manifest to `path`, replacing any previous contents.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let text = toml::to_string(self)?;
        write_atomic(path, text.as_bytes()).map_err(|source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Declare (or re-declare) a dependency. Returns the previous spec.
    pub fn add(&mut self, module: &str, spec: &VersionSpec) -> Result<Option<String>, ManifestError> {
        validate_module(module)?;
        if let VersionSpec::Exact(tag) = spec {
            validate_version(module, tag)?;
        }
        Ok(self
            .dependencies
            .insert(module.to_string(), spec.as_str().to_string()))
    }

    /// Drop a dependency. Returns the removed spec, if it was declared.
    pub fn remove(&mut self, module: &str) -> Option<String> {
        self.dependencies.remove(module)
    }

    /// The declared spec for `module`.
    pub fn spec(&self, module: &str) -> Option<VersionSpec> {
        self.dependencies.get(module).map(|s| VersionSpec::parse(s))
    }
}
