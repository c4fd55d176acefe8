//! Content-addressed archive cache.
//!
//! One immutable file per `(module, version)`:
//!
//! ```text
//! <cache_root>/
//!   github.com!mattn!go-sqlite3@v1.14.17.zip      archive
//!   github.com!mattn!go-sqlite3@v1.14.17.sha256   its checksum
//!   github.com!mattn!go-sqlite3@v1.14.17.lock     download lock
//! ```
//!
//! Archives are streamed into a temporary file in the cache directory and
//! renamed onto their final name only after the whole body arrived, so a
//! file at the final name is always complete.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use gopkg_core::fsutil::write_atomic;
use gopkg_core::CancelToken;

use crate::client::RegistryBackend;
use crate::error::FetchError;
use crate::integrity::{hash_file, ContentHash, HashingWriter};

const CHUNK: usize = 32 * 1024;

/// Receives download progress.
pub trait ProgressReporter: Send + Sync {
    /// Called after every chunk with the bytes received so far.
    fn advanced(&self, module: &str, version: &str, received: u64, total: Option<u64>);

    /// Called once the archive is in the cache.
    fn finished(&self, _module: &str, _version: &str) {}
}

/// Discards progress.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn advanced(&self, _module: &str, _version: &str, _received: u64, _total: Option<u64>) {}
}

/// Per-call fetch behaviour.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Re-hash a cached archive before returning it.
    pub verify: bool,
    /// Checksum the archive must have (usually from the lock entry).
    pub expected: Option<String>,
    pub cancel: CancelToken,
}

/// An archive available in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArchive {
    pub path: PathBuf,
    pub checksum: ContentHash,
    /// `false` when this call downloaded it.
    pub from_cache: bool,
}

/// Downloads archives once and serves them from disk afterwards.
#[derive(Clone)]
pub struct ArchiveCache {
    root: PathBuf,
    progress: Arc<dyn ProgressReporter>,
}

impl std::fmt::Debug for ArchiveCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveCache").field("root", &self.root).finish()
    }
}

impl ArchiveCache {
    pub fn new(root: PathBuf) -> Self {
        ArchiveCache {
            root,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the archive for `module@version` lives once cached.
    pub fn archive_path(&self, module: &str, version: &str) -> PathBuf {
        self.root.join(format!("{}.zip", cache_key(module, version)))
    }

    fn sidecar_path(&self, module: &str, version: &str) -> PathBuf {
        self.root.join(format!("{}.sha256", cache_key(module, version)))
    }

    fn lock_path(&self, module: &str, version: &str) -> PathBuf {
        self.root.join(format!("{}.lock", cache_key(module, version)))
    }

    pub fn contains(&self, module: &str, version: &str) -> bool {
        self.archive_path(module, version).is_file()
    }

    /// Return the cached archive for `module@version`, downloading it from
    /// `registry` on a miss.
    pub fn fetch(
        &self,
        registry: &dyn RegistryBackend,
        module: &str,
        version: &str,
        opts: &FetchOptions,
    ) -> Result<CachedArchive, FetchError> {
        let expected = opts.expected.as_deref().and_then(ContentHash::parse);

        if let Some(hit) = self.lookup(module, version, opts.verify, expected.as_ref())? {
            return Ok(hit);
        }

        std::fs::create_dir_all(&self.root).map_err(|e| FetchError::io(&self.root, e))?;
        let lock_path = self.lock_path(module, version);
        let _guard = KeyLock::acquire(&lock_path).map_err(|e| FetchError::io(&lock_path, e))?;

        // Another fetch may have finished while we waited for the lock.
        if let Some(hit) = self.lookup(module, version, opts.verify, expected.as_ref())? {
            return Ok(hit);
        }

        let checksum = self.download(registry, module, version, &opts.cancel)?;
        if let Some(want) = expected {
            if want != checksum {
                self.evict(module, version)?;
                return Err(FetchError::Integrity {
                    module: module.to_string(),
                    version: version.to_string(),
                    expected: want.to_string(),
                    actual: checksum.to_string(),
                });
            }
        }
        Ok(CachedArchive {
            path: self.archive_path(module, version),
            checksum,
            from_cache: false,
        })
    }

    fn lookup(
        &self,
        module: &str,
        version: &str,
        verify: bool,
        expected: Option<&ContentHash>,
    ) -> Result<Option<CachedArchive>, FetchError> {
        let path = self.archive_path(module, version);
        if !path.is_file() {
            return Ok(None);
        }
        let recorded = self.read_sidecar(module, version);

        let checksum = match (&recorded, verify) {
            (Some(c), false) => c.clone(),
            _ => {
                let actual = hash_file(&path).map_err(|e| FetchError::io(&path, e))?;
                if verify {
                    if let Some(want) = expected.or(recorded.as_ref()) {
                        if *want != actual {
                            tracing::warn!(
                                module, version, expected = %want, actual = %actual,
                                "cached archive does not match its checksum, evicting"
                            );
                            self.evict(module, version)?;
                            return Ok(None);
                        }
                    }
                }
                if recorded.is_none() {
                    self.write_sidecar(module, version, &actual)?;
                }
                actual
            }
        };
        tracing::debug!(module, version, path = %path.display(), "archive cache hit");
        Ok(Some(CachedArchive {
            path,
            checksum,
            from_cache: true,
        }))
    }

    fn download(
        &self,
        registry: &dyn RegistryBackend,
        module: &str,
        version: &str,
        cancel: &CancelToken,
    ) -> Result<ContentHash, FetchError> {
        let cancelled = || FetchError::Cancelled {
            module: module.to_string(),
            version: version.to_string(),
        };
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        tracing::debug!(module, version, "downloading archive");
        let mut stream = registry.open_archive(module, version)?;
        let tmp = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| FetchError::io(&self.root, e))?;
        let tmp_path = tmp.path().to_path_buf();
        let mut writer = HashingWriter::new(tmp);

        let mut buf = vec![0u8; CHUNK];
        let mut received = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }
            let n = match stream.reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(FetchError::Transport {
                        module: module.to_string(),
                        version: version.to_string(),
                        detail: e.to_string(),
                    })
                }
            };
            writer
                .write_all(&buf[..n])
                .map_err(|e| FetchError::io(&tmp_path, e))?;
            received += n as u64;
            self.progress.advanced(module, version, received, stream.length);
        }

        if let Some(total) = stream.length {
            if received != total {
                return Err(FetchError::Transport {
                    module: module.to_string(),
                    version: version.to_string(),
                    detail: format!("body ended after {received} of {total} bytes"),
                });
            }
        }

        let (tmp, checksum) = writer.finish();
        tmp.as_file()
            .sync_all()
            .map_err(|e| FetchError::io(&tmp_path, e))?;
        let path = self.archive_path(module, version);
        tmp.persist(&path).map_err(|e| FetchError::io(&path, e.error))?;
        self.write_sidecar(module, version, &checksum)?;

        self.progress.finished(module, version);
        tracing::debug!(module, version, bytes = received, %checksum, "archive cached");
        Ok(checksum)
    }

    fn read_sidecar(&self, module: &str, version: &str) -> Option<ContentHash> {
        std::fs::read_to_string(self.sidecar_path(module, version))
            .ok()
            .and_then(|s| ContentHash::parse(&s))
    }

    fn write_sidecar(&self, module: &str, version: &str, sum: &ContentHash) -> Result<(), FetchError> {
        let path = self.sidecar_path(module, version);
        write_atomic(&path, sum.checksum().as_bytes()).map_err(|e| FetchError::io(&path, e))
    }

    /// Drop a cached archive and its checksum. Returns whether one existed.
    pub fn evict(&self, module: &str, version: &str) -> Result<bool, FetchError> {
        let mut existed = false;
        for path in [self.archive_path(module, version), self.sidecar_path(module, version)] {
            match std::fs::remove_file(&path) {
                Ok(()) => existed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(FetchError::io(&path, e)),
            }
        }
        Ok(existed)
    }

    /// Remove the whole cache directory. Returns whether it existed.
    pub fn clear(&self) -> std::io::Result<bool> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// File name stem for `module@version`; path separators become `!`.
pub fn cache_key(module: &str, version: &str) -> String {
    format!("{}@{}", module.replace(['/', '\\'], "!"), version.replace(['/', '\\'], "!"))
}

/// Exclusive advisory lock held for the duration of one download.
struct KeyLock {
    _file: File,
}

impl KeyLock {
    fn acquire(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(KeyLock { _file: file })
    }
}
