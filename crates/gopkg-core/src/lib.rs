//! Core data model for gopkg.
//!
//! Manifests declare what a project wants, lockfiles record what was
//! actually installed, and [`scope::Layout`] maps both onto disk for the
//! local and global scopes.

pub mod cancel;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod lockfile;
pub mod manifest;
pub mod scope;
pub mod version;

pub use cancel::CancelToken;
pub use config::{ConfigFile, Overrides, Settings};
pub use error::{ConfigError, LockError, ManifestError};
pub use lockfile::{format_timestamp, parse_timestamp, LockEntry, Lockfile};
pub use manifest::Manifest;
pub use scope::{validate_module, validate_version, Layout, Scope, LOCAL_STORE_DIR, LOCK_FILE, MANIFEST_FILE};
pub use version::{
    compare_versions, is_prerelease, latest_release, sort_versions_desc, VersionSpec, LATEST,
};
