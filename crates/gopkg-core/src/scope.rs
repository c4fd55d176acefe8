//! Installation scope and on-disk layout.
//!
//! Layout:
//! ```text
//! <project>/
//!   gopkg.toml            local manifest
//!   gopkg.lock            local lockfile
//!   gopkg_modules/<module>/
//! <home>/                 usually ~/.gopkg
//!   gopkg.toml            global manifest
//!   gopkg.lock            global lockfile
//!   modules/<module>/
//!   cache/<module!escaped>@<version>.zip
//! ```

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::ManifestError;

/// Manifest file name.
pub const MANIFEST_FILE: &str = "gopkg.toml";
/// Lockfile name.
pub const LOCK_FILE: &str = "gopkg.lock";
/// Project-local module store directory.
pub const LOCAL_STORE_DIR: &str = "gopkg_modules";

/// Whether an operation targets the project or the user-wide installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Local,
    Global,
}

impl Scope {
    pub fn from_global_flag(global: bool) -> Self {
        if global {
            Scope::Global
        } else {
            Scope::Local
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Local => f.write_str("local"),
            Scope::Global => f.write_str("global"),
        }
    }
}

/// Resolves every path the pipeline touches for a given scope.
#[derive(Debug, Clone)]
pub struct Layout {
    project_dir: PathBuf,
    home: PathBuf,
}

impl Layout {
    /// `project_dir` anchors the local scope; `home` anchors the global scope
    /// and the shared archive cache.
    pub fn new(project_dir: PathBuf, home: PathBuf) -> Self {
        Layout { project_dir, home }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    fn scope_root(&self, scope: Scope) -> &Path {
        match scope {
            Scope::Local => &self.project_dir,
            Scope::Global => &self.home,
        }
    }

    pub fn manifest_path(&self, scope: Scope) -> PathBuf {
        self.scope_root(scope).join(MANIFEST_FILE)
    }

    pub fn lock_path(&self, scope: Scope) -> PathBuf {
        self.scope_root(scope).join(LOCK_FILE)
    }

    /// Root directory under which extracted modules live.
    pub fn store_root(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::Local => self.project_dir.join(LOCAL_STORE_DIR),
            Scope::Global => self.home.join("modules"),
        }
    }

    /// Destination directory for one module's extracted contents.
    pub fn module_dir(&self, scope: Scope, module: &str) -> Result<PathBuf, ManifestError> {
        validate_module(module)?;
        let mut dir = self.store_root(scope);
        for seg in module.split('/') {
            dir.push(seg);
        }
        Ok(dir)
    }

    /// Directory holding downloaded archives, shared by both scopes.
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    /// The path recorded in the build tool's override for `module`.
    ///
    /// Local installs use a project-relative `./gopkg_modules/...` path;
    /// global installs use the absolute store path.
    pub fn override_path(&self, scope: Scope, module: &str) -> Result<String, ManifestError> {
        validate_module(module)?;
        match scope {
            Scope::Local => Ok(format!("./{LOCAL_STORE_DIR}/{module}")),
            Scope::Global => Ok(self.module_dir(scope, module)?.display().to_string()),
        }
    }
}

/// Reject module identifiers that cannot be mirrored safely onto the store.
pub fn validate_module(module: &str) -> Result<(), ManifestError> {
    let invalid = |reason: &str| ManifestError::InvalidModule {
        module: module.to_string(),
        reason: reason.to_string(),
    };

    if module.trim().is_empty() {
        return Err(invalid("empty"));
    }
    if module.contains('\\') {
        return Err(invalid("backslash in module path"));
    }
    if module.contains('@') {
        return Err(invalid("'@' belongs between module and version"));
    }
    for seg in module.split('/') {
        if seg.is_empty() {
            return Err(invalid("empty path segment"));
        }
        if seg == "." || seg == ".." {
            return Err(invalid("relative path segment"));
        }
    }
    let path = Path::new(module);
    for c in path.components() {
        match c {
            Component::Normal(_) => {}
            _ => return Err(invalid("absolute or relative path segment")),
        }
    }
    Ok(())
}

/// Reject version tags that would leave the registry's `@v/` directory or
/// the cache when used as a file name.
pub fn validate_version(module: &str, version: &str) -> Result<(), ManifestError> {
    let invalid = |reason: &str| ManifestError::InvalidVersion {
        module: module.to_string(),
        version: version.to_string(),
        reason: reason.to_string(),
    };
    if version.trim().is_empty() {
        return Err(invalid("empty"));
    }
    if version.contains(['/', '\\']) {
        return Err(invalid("path separator in version"));
    }
    if version.contains("..") {
        return Err(invalid("'..' in version"));
    }
    Ok(())
}
