//! SHA-256 checksums for downloaded archives.
//!
//! Checksums are written as `sha256:<hex>` in lock entries and cache
//! sidecars; bare hex is accepted when reading.

use std::io::{Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

/// A SHA-256 digest in lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash an in-memory buffer.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex_encode(&hasher.finalize()))
    }

    /// Parse a stored checksum, with or without the `sha256:` prefix.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let hex = s.strip_prefix(PREFIX).unwrap_or(s);
        if hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(ContentHash(hex.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn hex(&self) -> &str {
        &self.0
    }

    /// The form stored in lock entries and sidecar files.
    pub fn checksum(&self) -> String {
        format!("{PREFIX}{}", self.0)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{PREFIX}{}", self.0)
    }
}

/// Hash a file without loading it into memory.
pub fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(ContentHash(hex_encode(&hasher.finalize())))
}

/// A writer that hashes everything passed through it.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        HashingWriter {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Return the wrapped writer and the digest of all bytes written.
    pub fn finish(self) -> (W, ContentHash) {
        (self.inner, ContentHash(hex_encode(&self.hasher.finalize())))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
