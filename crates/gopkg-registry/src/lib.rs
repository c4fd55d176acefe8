//! Module registry access for gopkg.
//!
//! Resolves declared versions against a module proxy, downloads archives
//! into a content-addressed cache, and unpacks them into the module store.
//!
//! # Architecture
//!
//! - [`RegistryBackend`]: version lookup and archive download, implemented
//!   over HTTP by [`ProxyRegistry`] and over a directory by [`LocalRegistry`]
//! - [`ArchiveCache`]: one immutable archive per `(module, version)`
//! - [`extract()`]: safe unpacking with a version marker
//!
//! Archives are checksummed with SHA-256 as they are downloaded.

pub mod cache;
pub mod client;
pub mod error;
pub mod extract;
pub mod integrity;
pub mod local;
pub mod proxy;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::{cache_key, ArchiveCache, CachedArchive, FetchOptions, NoProgress, ProgressReporter};
pub use client::{open_registry, ArchiveStream, RegistryBackend, ResolvedMetadata};
pub use error::{ExtractError, FetchError, RegistryError};
pub use extract::{extract, installed_version, is_installed, ExtractionResult, VERSION_MARKER};
pub use integrity::ContentHash;
pub use local::LocalRegistry;
pub use proxy::ProxyRegistry;
