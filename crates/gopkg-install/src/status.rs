//! Read-only views over a scope: what is declared, what is locked, and what
//! the registry has.

use std::cmp::Ordering;
use std::fmt;

use gopkg_core::{
    compare_versions, is_prerelease, latest_release, sort_versions_desc, validate_module, Layout,
    Lockfile, Manifest, Scope, VersionSpec,
};
use gopkg_registry::RegistryBackend;

use crate::error::InstallError;

/// How a locked version relates to its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    NotInstalled,
    UpToDate,
    /// The lock holds an older version than declared.
    Outdated,
    /// The lock holds a newer version than declared.
    Ahead,
}

impl fmt::Display for ListStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListStatus::NotInstalled => "Not installed",
            ListStatus::UpToDate => "Up to date",
            ListStatus::Outdated => "Outdated",
            ListStatus::Ahead => "Ahead",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub module: String,
    pub declared: String,
    pub locked: Option<String>,
    pub status: ListStatus,
}

/// Classify one declaration against its lock entry.
pub fn classify(declared: &str, locked: Option<&str>) -> ListStatus {
    let Some(locked) = locked else {
        return ListStatus::NotInstalled;
    };
    match VersionSpec::parse(declared) {
        VersionSpec::Latest => ListStatus::UpToDate,
        VersionSpec::Exact(tag) => match compare_versions(&tag, locked) {
            Ordering::Equal => ListStatus::UpToDate,
            Ordering::Greater => ListStatus::Outdated,
            Ordering::Less => ListStatus::Ahead,
        },
    }
}

/// Every declared module of `scope` with its lock state.
pub fn list(layout: &Layout, scope: Scope) -> Result<Vec<ListRow>, InstallError> {
    let manifest = Manifest::load(&layout.manifest_path(scope))?;
    let lock = Lockfile::load(&layout.lock_path(scope))?;
    Ok(manifest
        .dependencies
        .iter()
        .map(|(module, declared)| {
            let locked = lock.get(module).map(|e| e.resolved.clone());
            ListRow {
                module: module.clone(),
                declared: declared.clone(),
                status: classify(declared, locked.as_deref()),
                locked,
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    NotInstalled,
    UpToDate,
    UpdateAvailable,
    Failed(String),
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::NotInstalled => f.write_str("Not installed"),
            CheckStatus::UpToDate => f.write_str("Up to date"),
            CheckStatus::UpdateAvailable => f.write_str("Update available"),
            CheckStatus::Failed(detail) => write!(f, "Failed: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRow {
    pub module: String,
    pub locked: Option<String>,
    pub latest: Option<String>,
    pub status: CheckStatus,
}

/// Compare each locked module with the registry's latest version.
///
/// Modules without a lock entry are not looked up. Registry failures land
/// in the row, not in the result.
pub fn check(
    registry: &dyn RegistryBackend,
    layout: &Layout,
    scope: Scope,
) -> Result<Vec<CheckRow>, InstallError> {
    let manifest = Manifest::load(&layout.manifest_path(scope))?;
    let lock = Lockfile::load(&layout.lock_path(scope))?;
    Ok(manifest
        .dependencies
        .keys()
        .map(|module| check_one(registry, module, lock.get(module).map(|e| e.resolved.as_str())))
        .collect())
}

pub(crate) fn check_one(registry: &dyn RegistryBackend, module: &str, locked: Option<&str>) -> CheckRow {
    let row = |latest: Option<String>, status| CheckRow {
        module: module.to_string(),
        locked: locked.map(str::to_string),
        latest,
        status,
    };
    let Some(current) = locked else {
        return row(None, CheckStatus::NotInstalled);
    };
    match registry.resolve_version(module, &VersionSpec::Latest) {
        Ok(meta) => {
            let status = if compare_versions(&meta.version, current) == Ordering::Greater {
                CheckStatus::UpdateAvailable
            } else {
                CheckStatus::UpToDate
            };
            row(Some(meta.version), status)
        }
        Err(e) => {
            tracing::debug!(module, error = %e, "latest lookup failed");
            row(None, CheckStatus::Failed(e.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionNote {
    Latest,
    PreRelease,
    Older,
}

impl fmt::Display for VersionNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VersionNote::Latest => "latest",
            VersionNote::PreRelease => "pre-release",
            VersionNote::Older => "",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRow {
    pub version: String,
    pub note: VersionNote,
}

/// Everything the registry publishes for `module`, newest first.
pub fn versions(registry: &dyn RegistryBackend, module: &str) -> Result<Vec<VersionRow>, InstallError> {
    validate_module(module)?;
    let mut tags = registry.list_versions(module)?;
    sort_versions_desc(&mut tags);
    let latest = latest_release(&tags).map(str::to_string);
    Ok(tags
        .into_iter()
        .map(|version| {
            let note = if latest.as_deref() == Some(version.as_str()) {
                VersionNote::Latest
            } else if is_prerelease(&version) {
                VersionNote::PreRelease
            } else {
                VersionNote::Older
            };
            VersionRow { version, note }
        })
        .collect())
}
