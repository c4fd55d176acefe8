//! Registry, fetch, and extraction error types.

use std::path::PathBuf;

/// Errors resolving versions or listing a module against a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry has no such module or version.
    #[error("{module}@{spec} not found in registry: {detail}")]
    NotFound {
        module: String,
        spec: String,
        detail: String,
    },

    /// The registry could not be reached, or the request timed out.
    #[error("registry request for {module} failed: {detail}")]
    Transport { module: String, detail: String },

    /// The response body was not in the expected shape.
    #[error("malformed registry response for {module}: {detail}")]
    Malformed { module: String, detail: String },

    /// The operation was cancelled before it completed.
    #[error("resolving {module} was cancelled")]
    Cancelled { module: String },
}

/// Errors obtaining an archive for a resolved version.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The download could not be started or was interrupted.
    #[error("downloading {module}@{version}: {detail}")]
    Transport {
        module: String,
        version: String,
        detail: String,
    },

    /// The registry answered with a non-success status.
    #[error("downloading {module}@{version}: registry answered status {status}")]
    BadStatus {
        module: String,
        version: String,
        status: u16,
    },

    /// Local filesystem failure in the cache.
    #[error("cache I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The archive does not match the checksum it was expected to have.
    #[error("integrity check failed for {module}@{version}: expected {expected}, got {actual}")]
    Integrity {
        module: String,
        version: String,
        expected: String,
        actual: String,
    },

    /// The download was cancelled; nothing was written to the cache.
    #[error("download of {module}@{version} was cancelled")]
    Cancelled { module: String, version: String },
}

/// Errors materialising an archive into the module store.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The archive is empty, unreadable as a zip, or has no root entry.
    #[error("malformed archive {archive}: {detail}")]
    MalformedArchive { archive: PathBuf, detail: String },

    /// Writing an extracted entry failed.
    #[error("extracting to {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Moving the staging directory onto the canonical module path failed.
    #[error("moving {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }
}
