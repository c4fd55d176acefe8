//! Archive extraction into the module store.
//!
//! Registry archives hold a single root directory, normally
//! `<module>@<version>/`. Its contents are unpacked into a staging directory
//! next to the destination, which then replaces the destination in one
//! rename. A `.gopkg-version` marker naming the extracted version is written
//! last; its presence is what marks a module as installed.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

use crate::error::ExtractError;

/// Marker file written into every extracted module.
pub const VERSION_MARKER: &str = ".gopkg-version";

/// What an extraction produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub destination: PathBuf,
    /// Regular files written, not counting the marker.
    pub files: usize,
}

/// Unpack `archive` into `destination`, replacing whatever was there.
pub fn extract(archive: &Path, destination: &Path, version: &str) -> Result<ExtractionResult, ExtractError> {
    let malformed = |detail: &str| ExtractError::MalformedArchive {
        archive: archive.to_path_buf(),
        detail: detail.to_string(),
    };
    if version.is_empty() || version.contains(['/', '\\']) || version == "." || version == ".." {
        return Err(malformed("unusable version tag"));
    }

    let file = File::open(archive).map_err(|e| ExtractError::io(archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| malformed(&e.to_string()))?;
    if zip.is_empty() {
        return Err(malformed("archive is empty"));
    }
    let first = zip
        .by_index(0)
        .map_err(|e| malformed(&e.to_string()))?
        .name()
        .to_string();
    let root = archive_root(&first, version).ok_or_else(|| malformed("cannot determine root entry"))?;

    let staging = staging_dir(destination, version);
    remove_dir_if_present(&staging).map_err(|e| ExtractError::io(&staging, e))?;
    std::fs::create_dir_all(&staging).map_err(|e| ExtractError::io(&staging, e))?;

    let mut files = 0usize;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| malformed(&e.to_string()))?;
        let name = entry.name().to_string();
        let Some(rel) = name.strip_prefix(root.as_str()) else {
            tracing::debug!(entry = %name, "skipping entry outside archive root");
            continue;
        };
        if rel.is_empty() {
            continue;
        }
        let Some(rel) = safe_rel_path(rel) else {
            tracing::warn!(entry = %name, archive = %archive.display(), "skipping entry that escapes the destination");
            continue;
        };
        let out = staging.join(&rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&out).map_err(|e| ExtractError::io(&out, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
        }
        let mut w = File::create(&out).map_err(|e| ExtractError::io(&out, e))?;
        std::io::copy(&mut entry, &mut w).map_err(|e| ExtractError::io(&out, e))?;
        files += 1;
    }

    remove_dir_if_present(destination).map_err(|e| ExtractError::io(destination, e))?;
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
    }
    std::fs::rename(&staging, destination).map_err(|source| ExtractError::Rename {
        from: staging.clone(),
        to: destination.to_path_buf(),
        source,
    })?;

    let marker = destination.join(VERSION_MARKER);
    std::fs::write(&marker, version).map_err(|e| ExtractError::io(&marker, e))?;

    tracing::debug!(destination = %destination.display(), files, version, "extracted");
    Ok(ExtractionResult {
        destination: destination.to_path_buf(),
        files,
    })
}

/// The version recorded by the marker in `destination`, if any.
pub fn installed_version(destination: &Path) -> Option<String> {
    std::fs::read_to_string(destination.join(VERSION_MARKER))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Whether `destination` holds an extraction of exactly `version`.
pub fn is_installed(destination: &Path, version: &str) -> bool {
    installed_version(destination).as_deref() == Some(version)
}

/// The prefix shared by every archive entry, including its trailing `/`.
fn archive_root(first: &str, version: &str) -> Option<String> {
    let tagged = format!("@{version}/");
    if let Some(pos) = first.find(&tagged) {
        return Some(first[..pos + tagged.len()].to_string());
    }
    let (head, _) = first.split_once('/')?;
    if head.is_empty() {
        return None;
    }
    Some(format!("{head}/"))
}

fn staging_dir(destination: &Path, version: &str) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push("@");
    name.push(version);
    PathBuf::from(name)
}

/// Normalise an entry path, or `None` if it would leave the destination.
fn safe_rel_path(rel: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for c in Path::new(rel).components() {
        match c {
            Component::Normal(seg) => out.push(seg),
            Component::CurDir => {}
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

fn remove_dir_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
