//! The persisted record of resolved installations.
//!
//! One lockfile per scope, one entry per module. Writes always replace the
//! whole file; callers merge old and new entries before saving.
//!
//! ```toml
//! [[dependencies]]
//! name = "github.com/mattn/go-sqlite3"
//! version = "latest"
//! resolved = "v1.14.17"
//! hash = "f1f8…"
//! resolved_time = "2023-05-09T13:03:14Z"
//! installed_time = "2024-01-02T10:00:00Z"
//! source = "https://proxy.golang.org"
//! checksum = "sha256:…"
//! ```

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LockError;
use crate::fsutil::write_atomic;

/// A single resolved installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Module identifier.
    pub name: String,
    /// The version spec declared in the manifest when this entry was created.
    #[serde(rename = "version")]
    pub declared: String,
    /// The concrete version that was fetched and extracted.
    pub resolved: String,
    /// Content hash reported by the registry (may be empty).
    #[serde(default)]
    pub hash: String,
    /// Registry publish time of the resolved version (RFC 3339).
    pub resolved_time: String,
    /// When this entry was last installed (RFC 3339).
    pub installed_time: String,
    /// Which registry the module came from.
    #[serde(default)]
    pub source: String,
    /// SHA-256 of the downloaded archive, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// An ordered collection of lock entries for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    pub dependencies: Vec<LockEntry>,
}

impl Lockfile {
    pub fn new(dependencies: Vec<LockEntry>) -> Self {
        Lockfile { dependencies }
    }

    /// Load the lockfile at `path`. A missing file yields an empty lockfile.
    pub fn load(path: &Path) -> Result<Self, LockError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no lockfile, starting empty");
                return Ok(Lockfile::default());
            }
            Err(source) => {
                return Err(LockError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| LockError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overwrite the lockfile at `path` with exactly these entries.
    pub fn save(&self, path: &Path) -> Result<(), LockError> {
        let text = toml::to_string(self)?;
        write_atomic(path, text.as_bytes()).map_err(|source| LockError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), entries = self.dependencies.len(), "wrote lockfile");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&LockEntry> {
        self.dependencies.iter().find(|e| e.name == name)
    }

    /// Insert or replace the entry for `entry.name`, keeping position.
    pub fn upsert(&mut self, entry: LockEntry) {
        if let Some(pos) = self.dependencies.iter().position(|e| e.name == entry.name) {
            self.dependencies[pos] = entry;
        } else {
            self.dependencies.push(entry);
        }
    }

    /// Remove the entry for `name`, returning whether one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.dependencies.len();
        self.dependencies.retain(|e| e.name != name);
        self.dependencies.len() != before
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Render a timestamp the way lock entries store it.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp; `None` if it is not RFC 3339.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
