//! Filesystem registry with the module proxy layout.
//!
//! Used for `file://` registry URLs (offline mirrors) and throughout the
//! test suites.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gopkg_core::fsutil::write_atomic;
use gopkg_core::{latest_release, validate_module, validate_version, ManifestError, VersionSpec};

use crate::client::{
    parse_info, parse_list, ArchiveStream, InfoDocument, OriginDocument, RegistryBackend,
    ResolvedMetadata,
};
use crate::error::{FetchError, RegistryError};

/// A registry rooted at a local directory.
pub struct LocalRegistry {
    root: PathBuf,
    origin: String,
}

impl LocalRegistry {
    pub fn new(root: PathBuf) -> Self {
        let origin = format!("file://{}", root.display());
        LocalRegistry { root, origin }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn module_dir(&self, module: &str) -> PathBuf {
        let mut dir = self.root.clone();
        for seg in module.split('/') {
            dir.push(seg);
        }
        dir
    }

    /// Module paths and tags become file names below the root; refuse any that
    /// would step outside it.
    fn check(module: &str, version: Option<&str>) -> Result<(), ManifestError> {
        validate_module(module)?;
        match version {
            Some(v) => validate_version(module, v),
            None => Ok(()),
        }
    }

    fn version_file(&self, module: &str, version: &str, ext: &str) -> PathBuf {
        self.module_dir(module).join("@v").join(format!("{version}.{ext}"))
    }

    fn read_info(&self, module: &str, spec: &str, path: &Path) -> Result<ResolvedMetadata, RegistryError> {
        match std::fs::read_to_string(path) {
            Ok(body) => parse_info(module, &body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RegistryError::NotFound {
                module: module.to_string(),
                spec: spec.to_string(),
                detail: format!("no {}", path.display()),
            }),
            Err(e) => Err(RegistryError::Transport {
                module: module.to_string(),
                detail: format!("reading {}: {e}", path.display()),
            }),
        }
    }

    /// Add an archive to the registry.
    ///
    /// Writes `<version>.zip` and `<version>.info`, appends the tag to the
    /// list, and refreshes `@latest`. Republishing a version replaces it.
    pub fn publish(
        &self,
        module: &str,
        version: &str,
        time: DateTime<Utc>,
        archive: &[u8],
        hash: Option<&str>,
    ) -> std::io::Result<()> {
        Self::check(module, Some(version))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        let vdir = self.module_dir(module).join("@v");
        write_atomic(&vdir.join(format!("{version}.zip")), archive)?;

        let info = InfoDocument {
            version: version.to_string(),
            time,
            origin: hash.map(|h| OriginDocument {
                hash: h.to_string(),
            }),
        };
        write_atomic(&vdir.join(format!("{version}.info")), &to_json(&info)?)?;

        let list_path = vdir.join("list");
        let mut versions = match std::fs::read_to_string(&list_path) {
            Ok(body) => parse_list(&body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        if !versions.iter().any(|v| v == version) {
            versions.push(version.to_string());
        }
        let mut list = versions.join("\n");
        list.push('\n');
        write_atomic(&list_path, list.as_bytes())?;

        if let Some(latest) = latest_release(&versions) {
            let latest_info = vdir.join(format!("{latest}.info"));
            let body = std::fs::read(latest_info)?;
            write_atomic(&self.module_dir(module).join("@latest"), &body)?;
        }
        tracing::debug!(module, version, root = %self.root.display(), "published");
        Ok(())
    }
}

fn to_json(info: &InfoDocument) -> std::io::Result<Vec<u8>> {
    serde_json::to_vec(info).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl RegistryBackend for LocalRegistry {
    fn resolve_version(
        &self,
        module: &str,
        spec: &VersionSpec,
    ) -> Result<ResolvedMetadata, RegistryError> {
        let tag = match spec {
            VersionSpec::Exact(v) => Some(v.as_str()),
            VersionSpec::Latest => None,
        };
        Self::check(module, tag).map_err(|e| RegistryError::NotFound {
            module: module.to_string(),
            spec: spec.as_str().to_string(),
            detail: e.to_string(),
        })?;
        match spec {
            VersionSpec::Exact(v) => {
                self.read_info(module, v, &self.version_file(module, v, "info"))
            }
            VersionSpec::Latest => {
                let latest = self.module_dir(module).join("@latest");
                if latest.is_file() {
                    return self.read_info(module, spec.as_str(), &latest);
                }
                let versions = self.list_versions(module)?;
                let newest = latest_release(&versions).ok_or_else(|| RegistryError::NotFound {
                    module: module.to_string(),
                    spec: spec.as_str().to_string(),
                    detail: "no published versions".to_string(),
                })?;
                self.read_info(module, spec.as_str(), &self.version_file(module, newest, "info"))
            }
        }
    }

    fn list_versions(&self, module: &str) -> Result<Vec<String>, RegistryError> {
        Self::check(module, None).map_err(|e| RegistryError::NotFound {
            module: module.to_string(),
            spec: "list".to_string(),
            detail: e.to_string(),
        })?;
        let dir = self.module_dir(module);
        if !dir.is_dir() {
            return Err(RegistryError::NotFound {
                module: module.to_string(),
                spec: "list".to_string(),
                detail: format!("no {}", dir.display()),
            });
        }
        match std::fs::read_to_string(dir.join("@v").join("list")) {
            Ok(body) => Ok(parse_list(&body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(RegistryError::Transport {
                module: module.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    fn open_archive(&self, module: &str, version: &str) -> Result<ArchiveStream, FetchError> {
        if let Err(e) = Self::check(module, Some(version)) {
            tracing::debug!(module, version, error = %e, "refusing archive path");
            return Err(FetchError::BadStatus {
                module: module.to_string(),
                version: version.to_string(),
                status: 404,
            });
        }
        let path = self.version_file(module, version, "zip");
        match std::fs::File::open(&path) {
            Ok(file) => {
                let length = file.metadata().ok().map(|m| m.len());
                Ok(ArchiveStream {
                    reader: Box::new(file),
                    length,
                })
            }
            // Same answer the HTTP backend gives for a missing archive.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::BadStatus {
                module: module.to_string(),
                version: version.to_string(),
                status: 404,
            }),
            Err(e) => Err(FetchError::io(path, e)),
        }
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}
