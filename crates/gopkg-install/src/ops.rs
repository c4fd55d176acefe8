//! Single-target operations on a scope's manifest, lockfile, and store.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use gopkg_core::{
    compare_versions, validate_module, validate_version, Layout, Lockfile, Manifest, ManifestError, Scope,
    VersionSpec,
};
use gopkg_registry::ArchiveCache;

use crate::buildtool::BuildTool;
use crate::error::InstallError;
use crate::imports;
use crate::orchestrator::{InstallOptions, InstallReport, Installer};

/// Name given to manifests created implicitly.
pub const DEFAULT_PROJECT_NAME: &str = "unnamed";

/// Project name derived from a directory.
pub fn default_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string())
}

/// Split `module` or `module@version`.
pub fn parse_target(target: &str) -> Result<(String, Option<VersionSpec>), InstallError> {
    let invalid = |reason: &str| InstallError::InvalidTarget {
        target: target.to_string(),
        reason: reason.to_string(),
    };
    let (module, spec) = match target.split_once('@') {
        Some((_, "")) => return Err(invalid("empty version after '@'")),
        Some((m, v)) => (m, Some(VersionSpec::parse(v))),
        None => (target, None),
    };
    validate_module(module).map_err(|e| invalid(&e.to_string()))?;
    if let Some(VersionSpec::Exact(tag)) = &spec {
        validate_version(module, tag).map_err(|e| invalid(&e.to_string()))?;
    }
    Ok((module.to_string(), spec))
}

/// Create the project manifest and the local module store.
pub fn init(layout: &Layout) -> Result<Manifest, InstallError> {
    let path = layout.manifest_path(Scope::Local);
    if path.exists() {
        return Err(ManifestError::AlreadyExists { path }.into());
    }
    let manifest = Manifest::new(&default_name(layout.project_dir()));
    manifest.save(&path)?;
    let store = layout.store_root(Scope::Local);
    std::fs::create_dir_all(&store).map_err(|source| InstallError::Io { path: store, source })?;
    tracing::info!(name = %manifest.name, path = %path.display(), "initialized project");
    Ok(manifest)
}

/// What [`add`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    pub module: String,
    pub spec: VersionSpec,
    /// The spec this replaced, if the module was already declared.
    pub previous: Option<String>,
}

/// Declare `module@version` in the scope's manifest.
pub fn add(layout: &Layout, scope: Scope, target: &str) -> Result<Added, InstallError> {
    let (module, spec) = parse_target(target)?;
    let spec = spec.ok_or_else(|| InstallError::InvalidTarget {
        target: target.to_string(),
        reason: "expected module@version".to_string(),
    })?;
    let path = layout.manifest_path(scope);
    let mut manifest = Manifest::load_or_new(&path, DEFAULT_PROJECT_NAME)?;
    let previous = manifest.add(&module, &spec)?;
    manifest.save(&path)?;
    tracing::debug!(module = %module, spec = %spec, ?previous, "declared");
    Ok(Added {
        module,
        spec,
        previous,
    })
}

/// Undeclare `module`, forget its lock entry, and unwire it.
///
/// The manifest and lockfile are updated before the build tool is touched;
/// the first build-tool failure is returned afterwards.
pub fn remove(
    layout: &Layout,
    scope: Scope,
    build_tool: &dyn BuildTool,
    module: &str,
) -> Result<(), InstallError> {
    let path = layout.manifest_path(scope);
    let mut manifest = Manifest::load(&path)?;
    if manifest.remove(module).is_none() {
        return Err(InstallError::NotDeclared {
            module: module.to_string(),
            manifest: path,
        });
    }
    manifest.save(&path)?;

    let lock_path = layout.lock_path(scope);
    let mut lock = Lockfile::load(&lock_path)?;
    if lock.remove(module) {
        lock.save(&lock_path)?;
    }

    let dropped_require = build_tool.drop_requirement(module);
    let dropped_replace = build_tool.drop_path_override(module);
    dropped_require?;
    dropped_replace?;
    tracing::info!(module, %scope, "removed");
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    /// Also delete the scope's lockfile.
    pub lock: bool,
    /// Also empty the shared archive cache.
    pub cache: bool,
}

/// What [`clean`] actually deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cleaned {
    pub store: bool,
    pub lock: bool,
    pub cache: bool,
}

/// Delete the scope's module store and, on request, its lockfile and the cache.
pub fn clean(
    layout: &Layout,
    cache: &ArchiveCache,
    scope: Scope,
    opts: &CleanOptions,
) -> Result<Cleaned, InstallError> {
    let mut cleaned = Cleaned::default();

    let store = layout.store_root(scope);
    match std::fs::remove_dir_all(&store) {
        Ok(()) => cleaned.store = true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => return Err(InstallError::Io { path: store, source }),
    }

    if opts.lock {
        let lock = layout.lock_path(scope);
        match std::fs::remove_file(&lock) {
            Ok(()) => cleaned.lock = true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(InstallError::Io { path: lock, source }),
        }
    }

    if opts.cache {
        cleaned.cache = cache.clear().map_err(|source| InstallError::Io {
            path: cache.root().to_path_buf(),
            source,
        })?;
    }
    tracing::debug!(%scope, ?cleaned, "cleaned");
    Ok(cleaned)
}

/// Install everything declared for `scope`.
///
/// A missing manifest is created. With `auto`, third-party imports found in
/// the project's Go sources are declared as `latest` first. For the local
/// scope the build tool's module file is initialised when missing.
pub fn install_project(
    installer: &Installer<'_>,
    scope: Scope,
    opts: &InstallOptions,
    auto: bool,
) -> Result<InstallReport, InstallError> {
    let layout = installer.layout();
    let path = layout.manifest_path(scope);
    let existed = path.is_file();
    let root = match scope {
        Scope::Local => layout.project_dir(),
        Scope::Global => layout.home(),
    };
    let mut manifest = Manifest::load_or_new(&path, &default_name(root))?;
    let mut dirty = !existed;

    if auto {
        let project = layout.project_dir();
        let own = std::fs::read_to_string(project.join("go.mod"))
            .ok()
            .and_then(|text| imports::module_path(&text));
        for module in imports::scan(project, own.as_deref())? {
            if !manifest.dependencies.contains_key(&module) {
                tracing::info!(module = %module, "discovered import");
                manifest.add(&module, &VersionSpec::Latest)?;
                dirty = true;
            }
        }
    }
    if dirty {
        manifest.save(&path)?;
    }

    if scope == Scope::Local {
        if let Err(e) = installer.build_tool().ensure_module(&manifest.name) {
            tracing::warn!(error = %e, "could not initialise the build tool's module file");
        }
    }
    installer.install(&manifest, scope, opts)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    UpdateAvailable,
    Failed(String),
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStatus::UpToDate => f.write_str("Up to date"),
            UpdateStatus::UpdateAvailable => f.write_str("Update available"),
            UpdateStatus::Failed(detail) => write!(f, "Failed: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRow {
    pub module: String,
    /// Spec declared before the update.
    pub declared: String,
    /// The version the module is moving to, when known.
    pub latest: Option<String>,
    pub status: UpdateStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated {
    pub rows: Vec<UpdateRow>,
    pub install: InstallReport,
}

/// Move modules to newer versions, then reinstall the scope.
///
/// `targets` are `module` (newest release) or `module@version`; empty means
/// every declared module. Pinned specs are rewritten, `latest` specs stay
/// as they are and bypass the lockfile instead.
pub fn update(
    installer: &Installer<'_>,
    scope: Scope,
    targets: &[String],
    opts: &InstallOptions,
) -> Result<Updated, InstallError> {
    let layout = installer.layout();
    let path = layout.manifest_path(scope);
    let mut manifest = Manifest::load(&path)?;
    let lock = Lockfile::load(&layout.lock_path(scope))?;

    let mut wanted: Vec<(String, Option<String>)> = Vec::new();
    if targets.is_empty() {
        wanted.extend(manifest.dependencies.keys().map(|m| (m.clone(), None)));
    } else {
        let mut seen = BTreeSet::new();
        for target in targets {
            let (module, spec) = parse_target(target)?;
            if !manifest.dependencies.contains_key(&module) {
                return Err(InstallError::NotDeclared { module, manifest: path });
            }
            if !seen.insert(module.clone()) {
                return Err(InstallError::InvalidTarget {
                    target: target.clone(),
                    reason: format!("{module} is listed more than once"),
                });
            }
            let explicit = match spec {
                Some(VersionSpec::Exact(v)) => Some(v),
                Some(VersionSpec::Latest) | None => None,
            };
            wanted.push((module, explicit));
        }
    }

    let mut refresh = opts.refresh.clone();
    let mut rows = Vec::with_capacity(wanted.len());
    let mut dirty = false;
    for (module, explicit) in wanted {
        let Some(declared) = manifest.spec(&module) else {
            continue;
        };
        let locked = lock.get(&module).map(|e| e.resolved.clone());
        let row = |latest: Option<String>, status| UpdateRow {
            module: module.clone(),
            declared: declared.as_str().to_string(),
            latest,
            status,
        };

        if let Some(version) = explicit {
            let current = declared.as_str() == version && locked.as_deref() == Some(version.as_str());
            if current {
                rows.push(row(Some(version), UpdateStatus::UpToDate));
            } else {
                manifest.add(&module, &VersionSpec::Exact(version.clone()))?;
                dirty = true;
                rows.push(row(Some(version), UpdateStatus::UpdateAvailable));
            }
            continue;
        }

        let latest = match installer.registry().resolve_version(&module, &VersionSpec::Latest) {
            Ok(meta) => meta.version,
            Err(e) => {
                tracing::debug!(module = %module, error = %e, "latest lookup failed");
                rows.push(row(None, UpdateStatus::Failed(e.to_string())));
                continue;
            }
        };
        let current = match (&declared, &locked) {
            (_, Some(l)) => Some(l.as_str()),
            (VersionSpec::Exact(tag), None) => Some(tag.as_str()),
            (VersionSpec::Latest, None) => None,
        };
        let newer = current.map_or(true, |c| compare_versions(&latest, c) == Ordering::Greater);
        if !newer {
            rows.push(row(Some(latest), UpdateStatus::UpToDate));
            continue;
        }
        match declared {
            VersionSpec::Latest => {
                refresh.insert(module.clone());
            }
            VersionSpec::Exact(_) => {
                manifest.add(&module, &VersionSpec::Exact(latest.clone()))?;
                dirty = true;
            }
        }
        tracing::info!(module = %module, to = %latest, "updating");
        rows.push(row(Some(latest), UpdateStatus::UpdateAvailable));
    }

    if dirty {
        manifest.save(&path)?;
    }
    let opts = InstallOptions {
        refresh,
        ..opts.clone()
    };
    let install = installer.install(&manifest, scope, &opts)?;
    Ok(Updated { rows, install })
}
