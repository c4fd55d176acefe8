//! Error types for manifest, lockfile, and settings I/O.

use std::path::PathBuf;

/// Errors reading or writing a lockfile.
///
/// A missing lockfile is not an error; see [`crate::lockfile::Lockfile::load`].
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lockfile exists but could not be read.
    #[error("reading lockfile {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The lockfile contents are not a valid lock document.
    #[error("decoding lockfile {path}: {source}")]
    Decode {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Serializing the entries failed.
    #[error("encoding lockfile: {0}")]
    Encode(#[from] toml::ser::Error),

    /// The lockfile could not be written.
    #[error("writing lockfile {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors reading or writing a `gopkg.toml` manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// No manifest at the expected location.
    #[error("manifest not found: {path}")]
    NotFound { path: PathBuf },

    /// The manifest already exists (on init).
    #[error("manifest already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// I/O failure reading the manifest.
    #[error("reading manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The manifest is not valid TOML or has the wrong shape.
    #[error("decoding manifest {path}: {source}")]
    Decode {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Serializing the manifest failed.
    #[error("encoding manifest: {0}")]
    Encode(#[from] toml::ser::Error),

    /// I/O failure writing the manifest.
    #[error("writing manifest {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A module identifier that cannot be mapped onto the store.
    #[error("invalid module path '{module}': {reason}")]
    InvalidModule { module: String, reason: String },

    /// A version tag that cannot be used as a file name.
    #[error("invalid version '{version}' for {module}: {reason}")]
    InvalidVersion {
        module: String,
        version: String,
        reason: String,
    },
}

/// Errors resolving settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("reading config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("decoding config {path}: {source}")]
    Decode {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A setting has an unusable value.
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: String, value: String },

    /// Neither `GOPKG_HOME` nor `HOME` is set.
    #[error("cannot determine home directory (set GOPKG_HOME or HOME)")]
    NoHome,
}
