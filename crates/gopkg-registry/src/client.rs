//! Registry backend trait and the JSON documents shared by every backend.
//!
//! Every backend speaks the module proxy layout:
//!
//! ```text
//! <base>/<module>/@latest            {"Version", "Time"}
//! <base>/<module>/@v/list            newline-separated tags
//! <base>/<module>/@v/<version>.info  {"Version", "Time", "Origin": {"Hash"}}
//! <base>/<module>/@v/<version>.zip   archive
//! ```

use std::io::Read;

use chrono::{DateTime, Utc};
use gopkg_core::{ConfigError, Settings, VersionSpec};
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, RegistryError};
use crate::local::LocalRegistry;
use crate::proxy::ProxyRegistry;

/// What a registry reports for one resolved version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    /// Concrete version tag.
    pub version: String,
    /// When the version was published.
    pub published_at: DateTime<Utc>,
    /// Content hash reported by the registry; empty when it has none.
    pub content_hash: String,
}

/// An open archive download.
pub struct ArchiveStream {
    pub reader: Box<dyn Read + Send>,
    /// Expected length in bytes, when the registry reports it.
    pub length: Option<u64>,
}

impl std::fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Abstract registry backend.
///
/// Implementations must be shareable across the installer's worker threads.
pub trait RegistryBackend: Send + Sync {
    /// Resolve a declared spec to concrete version metadata.
    fn resolve_version(
        &self,
        module: &str,
        spec: &VersionSpec,
    ) -> Result<ResolvedMetadata, RegistryError>;

    /// Every published tag for `module`, in the order the registry lists them.
    fn list_versions(&self, module: &str) -> Result<Vec<String>, RegistryError>;

    /// Start downloading the archive of a resolved version.
    fn open_archive(&self, module: &str, version: &str) -> Result<ArchiveStream, FetchError>;

    /// Label recorded as the `source` of lock entries.
    fn origin(&self) -> &str;
}

/// The `.info` / `@latest` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InfoDocument {
    pub version: String,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<OriginDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct OriginDocument {
    #[serde(default)]
    pub hash: String,
}

/// Decode an info document into metadata.
pub(crate) fn parse_info(module: &str, body: &str) -> Result<ResolvedMetadata, RegistryError> {
    let doc: InfoDocument =
        serde_json::from_str(body).map_err(|e| RegistryError::Malformed {
            module: module.to_string(),
            detail: e.to_string(),
        })?;
    if doc.version.trim().is_empty() {
        return Err(RegistryError::Malformed {
            module: module.to_string(),
            detail: "empty Version field".to_string(),
        });
    }
    Ok(ResolvedMetadata {
        version: doc.version,
        published_at: doc.time,
        content_hash: doc.origin.map(|o| o.hash).unwrap_or_default(),
    })
}

/// Split a `@v/list` body into tags, dropping blank lines.
pub(crate) fn parse_list(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the backend selected by the configured registry URL.
///
/// `file://` URLs open a [`LocalRegistry`]; `http://` and `https://` URLs
/// open a [`ProxyRegistry`].
pub fn open_registry(settings: &Settings) -> Result<Box<dyn RegistryBackend>, ConfigError> {
    let url = settings.registry_url.as_str();
    if let Some(path) = url.strip_prefix("file://") {
        tracing::debug!(root = path, "using filesystem registry");
        return Ok(Box::new(LocalRegistry::new(path.into())));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        tracing::debug!(url, timeout = ?settings.timeout, "using proxy registry");
        return Ok(Box::new(ProxyRegistry::new(url, settings.timeout)));
    }
    Err(ConfigError::Invalid {
        key: "registry".to_string(),
        value: url.to_string(),
    })
}
