//! Installer and build-tool error types.

use std::path::PathBuf;

use gopkg_core::{LockError, ManifestError};
use gopkg_registry::{ExtractError, FetchError, RegistryError};

/// Failures of the host build tool's edit interface.
#[derive(Debug, thiserror::Error)]
pub enum BuildToolError {
    /// The tool could not be started at all.
    #[error("running `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Errors that abort an operation as a whole.
///
/// Per-module failures during a batch install are not errors; they are
/// reported as [`crate::Outcome::Failed`].
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    BuildTool(#[from] BuildToolError),

    /// The run was cancelled before it could record anything.
    #[error("installation cancelled")]
    Cancelled,

    /// The module is not declared in the scope's manifest.
    #[error("{module} is not declared in {manifest}")]
    NotDeclared { module: String, manifest: PathBuf },

    /// A `module@version` argument that cannot be used.
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Filesystem failure outside the cache and the store.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
