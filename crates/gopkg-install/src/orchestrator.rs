//! Batch installation of a manifest's dependencies.
//!
//! Per module:
//!
//! ```text
//! Pending -> LockHit | Resolving -> Resolved -> Cached | Fetching -> Extracted -> Wired -> Locked
//! ```
//!
//! Any stage may end the module in `Failed`; the rest of the batch carries
//! on. Resolution, download, and extraction run on up to `jobs` threads.
//! Wiring into the build tool runs afterwards on the calling thread in
//! module order, and the lockfile is written once at the end with exactly
//! the modules that made it through.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::Utc;
use gopkg_core::{
    format_timestamp, validate_version, CancelToken, Layout, LockEntry, Lockfile, Manifest, Scope,
    VersionSpec,
};
use gopkg_registry::{extract, is_installed, ArchiveCache, FetchOptions, RegistryBackend, RegistryError};

use crate::buildtool::BuildTool;
use crate::error::{BuildToolError, InstallError};

/// Knobs for one install run.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Modules prepared concurrently.
    pub jobs: usize,
    /// Check cached archives against recorded checksums before use.
    pub verify: bool,
    /// Modules that must be re-resolved even when their lock entry matches.
    pub refresh: BTreeSet<String>,
    pub cancel: CancelToken,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {
            jobs: 1,
            verify: false,
            refresh: BTreeSet::new(),
            cancel: CancelToken::new(),
        }
    }
}

/// Pipeline stage at which a module failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Download,
    Extract,
    Wire,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolve => "Resolve",
            Stage::Download => "Download",
            Stage::Extract => "Extract",
            Stage::Wire => "Wire",
        })
    }
}

/// How one module's installation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Freshly resolved against the registry.
    Installed,
    /// Reused the version recorded in the lockfile.
    Locked,
    Failed { stage: Stage, detail: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// One row of an install report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReport {
    pub module: String,
    pub declared: String,
    /// Known once resolution succeeded.
    pub resolved: Option<String>,
    pub outcome: Outcome,
}

/// The result of a batch install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub scope: Scope,
    /// One row per declared module, sorted by module.
    pub modules: Vec<ModuleReport>,
    /// Where the new lockfile was written.
    pub lock_path: PathBuf,
}

impl InstallReport {
    pub fn failures(&self) -> usize {
        self.modules.iter().filter(|m| m.outcome.is_failure()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}

/// Everything known about a module once it is ready to be wired.
#[derive(Debug)]
struct Prepared {
    resolved: String,
    hash: String,
    resolved_time: String,
    source: String,
    checksum: Option<String>,
    locked: bool,
}

#[derive(Debug)]
struct Failure {
    stage: Stage,
    resolved: Option<String>,
    detail: String,
}

impl Failure {
    fn new(stage: Stage, resolved: Option<&str>, err: impl fmt::Display) -> Self {
        Failure {
            stage,
            resolved: resolved.map(str::to_string),
            detail: err.to_string(),
        }
    }
}

/// Drives resolve, fetch, extract, and wire for a manifest.
pub struct Installer<'a> {
    registry: &'a dyn RegistryBackend,
    cache: &'a ArchiveCache,
    build_tool: &'a dyn BuildTool,
    layout: &'a Layout,
}

impl<'a> Installer<'a> {
    pub fn new(
        registry: &'a dyn RegistryBackend,
        cache: &'a ArchiveCache,
        build_tool: &'a dyn BuildTool,
        layout: &'a Layout,
    ) -> Self {
        Installer {
            registry,
            cache,
            build_tool,
            layout,
        }
    }

    pub fn registry(&self) -> &'a dyn RegistryBackend {
        self.registry
    }

    pub fn build_tool(&self) -> &'a dyn BuildTool {
        self.build_tool
    }

    pub fn layout(&self) -> &'a Layout {
        self.layout
    }

    pub fn cache(&self) -> &'a ArchiveCache {
        self.cache
    }

    /// Install every dependency declared in `manifest` into `scope`.
    ///
    /// Lockfile read/write failures and cancellation are errors; a cancelled
    /// run leaves the lockfile untouched. Everything that goes wrong for an
    /// individual module is reported in its row.
    pub fn install(
        &self,
        manifest: &Manifest,
        scope: Scope,
        opts: &InstallOptions,
    ) -> Result<InstallReport, InstallError> {
        let lock_path = self.layout.lock_path(scope);
        let prior = Lockfile::load(&lock_path)?;

        let work: Vec<(&str, &str)> = manifest
            .dependencies
            .iter()
            .map(|(m, v)| (m.as_str(), v.as_str()))
            .collect();
        tracing::debug!(%scope, modules = work.len(), jobs = opts.jobs, "installing");

        let prepared = self.prepare_all(&work, &prior, scope, opts);
        if opts.cancel.is_cancelled() {
            tracing::debug!(%scope, "cancelled, lockfile left as it was");
            return Err(InstallError::Cancelled);
        }

        let installed_time = format_timestamp(&Utc::now());
        let mut entries = Vec::new();
        let mut modules = Vec::with_capacity(work.len());
        for (&(module, declared), prep) in work.iter().zip(prepared) {
            let row = match prep.and_then(|p| self.wire(module, p, scope)) {
                Ok(p) => {
                    let outcome = if p.locked {
                        Outcome::Locked
                    } else {
                        Outcome::Installed
                    };
                    tracing::info!(module, version = %p.resolved, ?outcome, "installed");
                    let resolved = p.resolved.clone();
                    entries.push(LockEntry {
                        name: module.to_string(),
                        declared: declared.to_string(),
                        resolved: p.resolved,
                        hash: p.hash,
                        resolved_time: p.resolved_time,
                        installed_time: installed_time.clone(),
                        source: p.source,
                        checksum: p.checksum,
                    });
                    ModuleReport {
                        module: module.to_string(),
                        declared: declared.to_string(),
                        resolved: Some(resolved),
                        outcome,
                    }
                }
                Err(f) => {
                    tracing::debug!(module, stage = %f.stage, detail = %f.detail, "failed");
                    ModuleReport {
                        module: module.to_string(),
                        declared: declared.to_string(),
                        resolved: f.resolved,
                        outcome: Outcome::Failed {
                            stage: f.stage,
                            detail: f.detail,
                        },
                    }
                }
            };
            modules.push(row);
        }

        Lockfile::new(entries).save(&lock_path)?;
        Ok(InstallReport {
            scope,
            modules,
            lock_path,
        })
    }

    /// Prepare every module, on up to `jobs` threads.
    ///
    /// `work` is sorted by module. Modules whose store directories nest
    /// (`a/b` and `a/b/v2`) share a worker and run in that order, because
    /// replacing the outer directory removes the inner one.
    fn prepare_all(
        &self,
        work: &[(&str, &str)],
        prior: &Lockfile,
        scope: Scope,
        opts: &InstallOptions,
    ) -> Vec<Result<Prepared, Failure>> {
        let jobs = opts.jobs.max(1);
        if jobs == 1 {
            return work
                .iter()
                .map(|&(m, d)| self.prepare(m, d, prior.get(m), scope, opts))
                .collect();
        }

        let families = nested_families(work);
        let mut out = Vec::with_capacity(work.len());
        for batch in families.chunks(jobs) {
            std::thread::scope(|s| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|family| {
                        s.spawn(move || {
                            family
                                .iter()
                                .map(|&i| {
                                    let (m, d) = work[i];
                                    (i, self.prepare(m, d, prior.get(m), scope, opts))
                                })
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                for (family, h) in batch.iter().zip(handles) {
                    match h.join() {
                        Ok(results) => out.extend(results),
                        Err(_) => out.extend(family.iter().map(|&i| {
                            let msg = format!("worker for {} panicked", work[i].0);
                            (i, Err(Failure::new(Stage::Resolve, None, msg)))
                        })),
                    }
                }
            });
        }
        out.sort_by_key(|(i, _)| *i);
        out.into_iter().map(|(_, r)| r).collect()
    }

    fn prepare(
        &self,
        module: &str,
        declared: &str,
        prior: Option<&LockEntry>,
        scope: Scope,
        opts: &InstallOptions,
    ) -> Result<Prepared, Failure> {
        tracing::debug!(module, stage = "pending");
        let destination = self
            .layout
            .module_dir(scope, module)
            .map_err(|e| Failure::new(Stage::Resolve, None, e))?;
        if let VersionSpec::Exact(tag) = VersionSpec::parse(declared) {
            validate_version(module, &tag).map_err(|e| Failure::new(Stage::Resolve, None, e))?;
        }
        if opts.cancel.is_cancelled() {
            let err = RegistryError::Cancelled {
                module: module.to_string(),
            };
            return Err(Failure::new(Stage::Resolve, None, err));
        }

        let reuse = prior.filter(|e| e.declared == declared && !opts.refresh.contains(module));
        let mut prepared = match reuse {
            Some(entry) => {
                tracing::debug!(module, resolved = %entry.resolved, stage = "lock-hit");
                Prepared {
                    resolved: entry.resolved.clone(),
                    hash: entry.hash.clone(),
                    resolved_time: entry.resolved_time.clone(),
                    source: entry.source.clone(),
                    checksum: entry.checksum.clone(),
                    locked: true,
                }
            }
            None => {
                tracing::debug!(module, spec = declared, stage = "resolving");
                let meta = self
                    .registry
                    .resolve_version(module, &VersionSpec::parse(declared))
                    .map_err(|e| Failure::new(Stage::Resolve, None, e))?;
                let checksum = prior
                    .filter(|e| e.resolved == meta.version)
                    .and_then(|e| e.checksum.clone());
                Prepared {
                    resolved_time: format_timestamp(&meta.published_at),
                    resolved: meta.version,
                    hash: meta.content_hash,
                    source: self.registry.origin().to_string(),
                    checksum,
                    locked: false,
                }
            }
        };
        let version = prepared.resolved.clone();
        tracing::debug!(module, resolved = %version, stage = "resolved");

        if is_installed(&destination, &version) {
            tracing::debug!(module, destination = %destination.display(), stage = "cached");
            return Ok(prepared);
        }

        tracing::debug!(module, version = %version, stage = "fetching");
        let fetch_opts = FetchOptions {
            verify: opts.verify,
            expected: prepared.checksum.clone().filter(|_| opts.verify),
            cancel: opts.cancel.clone(),
        };
        let archive = self
            .cache
            .fetch(self.registry, module, &version, &fetch_opts)
            .map_err(|e| Failure::new(Stage::Download, Some(&version), e))?;
        let result = extract(&archive.path, &destination, &version)
            .map_err(|e| Failure::new(Stage::Extract, Some(&version), e))?;
        tracing::debug!(module, files = result.files, stage = "extracted");

        prepared.checksum = Some(archive.checksum.checksum());
        Ok(prepared)
    }

    fn wire(&self, module: &str, p: Prepared, scope: Scope) -> Result<Prepared, Failure> {
        let fail = |e: BuildToolError| Failure::new(Stage::Wire, Some(&p.resolved), e);
        let path = self
            .layout
            .override_path(scope, module)
            .map_err(|e| Failure::new(Stage::Wire, Some(&p.resolved), e))?;
        self.build_tool
            .add_requirement(module, &p.resolved)
            .map_err(&fail)?;
        self.build_tool
            .add_path_override(module, &path)
            .map_err(&fail)?;
        tracing::debug!(module, path = %path, stage = "wired");
        Ok(p)
    }
}

/// Indices of `work` grouped so that every module lands with the modules
/// whose store directories contain it. Expects `work` sorted by module.
fn nested_families(work: &[(&str, &str)]) -> Vec<Vec<usize>> {
    let mut families: Vec<Vec<usize>> = Vec::new();
    for (i, &(module, _)) in work.iter().enumerate() {
        let home = families
            .iter()
            .position(|f| f.iter().any(|&j| contains_module(work[j].0, module)));
        match home {
            Some(f) => families[f].push(i),
            None => families.push(vec![i]),
        }
    }
    families
}

/// Whether `inner`'s store directory lies under `outer`'s.
fn contains_module(outer: &str, inner: &str) -> bool {
    inner
        .strip_prefix(outer)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{manifest, module_zip, Fixture};
    use gopkg_registry::VERSION_MARKER;

    fn outcomes(report: &InstallReport) -> Vec<(String, Outcome)> {
        report
            .modules
            .iter()
            .map(|m| (m.module.clone(), m.outcome.clone()))
            .collect()
    }

    fn stage_of(report: &InstallReport, module: &str) -> Option<Stage> {
        report.modules.iter().find(|m| m.module == module).and_then(|m| match &m.outcome {
            Outcome::Failed { stage, .. } => Some(*stage),
            _ => None,
        })
    }

    #[test]
    fn fresh_install_extracts_wires_and_locks() {
        let fx = Fixture::new();
        fx.publish("github.com/a/one", "v1.0.0");
        fx.publish("github.com/a/one", "v1.1.0");
        fx.publish("golang.org/x/two", "v0.3.0");
        let m = manifest(&[("github.com/a/one", "latest"), ("golang.org/x/two", "v0.3.0")]);

        let report = fx.installer().install(&m, Scope::Local, &InstallOptions::default()).unwrap();
        assert!(report.is_success());
        assert_eq!(
            outcomes(&report),
            vec![
                ("github.com/a/one".to_string(), Outcome::Installed),
                ("golang.org/x/two".to_string(), Outcome::Installed),
            ]
        );
        assert_eq!(report.modules[0].resolved.as_deref(), Some("v1.1.0"));

        let one = fx.project().join("gopkg_modules/github.com/a/one");
        assert!(one.join("go.mod").is_file());
        assert_eq!(std::fs::read_to_string(one.join(VERSION_MARKER)).unwrap(), "v1.1.0");

        let lock = Lockfile::load(&fx.layout.lock_path(Scope::Local)).unwrap();
        assert_eq!(lock.len(), 2);
        let entry = lock.get("github.com/a/one").unwrap();
        assert_eq!(entry.declared, "latest");
        assert_eq!(entry.resolved, "v1.1.0");
        assert_eq!(entry.hash, "origin-hash");
        assert_eq!(entry.resolved_time, "2024-03-01T12:00:00Z");
        assert_eq!(entry.source, fx.registry.origin());
        assert!(entry.checksum.as_deref().unwrap().starts_with("sha256:"));

        let calls = fx.tool.calls();
        assert!(calls.contains(&"require github.com/a/one@v1.1.0".to_string()));
        assert!(calls.contains(&"replace github.com/a/one=./gopkg_modules/github.com/a/one".to_string()));
        assert!(calls.contains(&"require golang.org/x/two@v0.3.0".to_string()));
    }

    #[test]
    fn unchanged_lock_entry_skips_the_registry() {
        let fx = Fixture::new();
        fx.publish("github.com/a/one", "v1.0.0");
        let m = manifest(&[("github.com/a/one", "latest")]);
        let installer = fx.installer();
        installer.install(&m, Scope::Local, &InstallOptions::default()).unwrap();

        // A newer release must not be picked up while the lock entry matches.
        fx.publish("github.com/a/one", "v2.0.0");
        fx.registry.reset();

        let report = installer.install(&m, Scope::Local, &InstallOptions::default()).unwrap();
        assert_eq!(fx.registry.resolves(), 0);
        assert_eq!(report.modules[0].outcome, Outcome::Locked);
        assert_eq!(report.modules[0].resolved.as_deref(), Some("v1.0.0"));

        let lock = Lockfile::load(&fx.layout.lock_path(Scope::Local)).unwrap();
        assert_eq!(lock.get("github.com/a/one").unwrap().resolved, "v1.0.0");
    }

    #[test]
    fn changed_spec_or_refresh_re_resolves() {
        let fx = Fixture::new();
        fx.publish("github.com/a/one", "v1.0.0");
        fx.publish("github.com/a/one", "v1.2.0");
        let installer = fx.installer();
        installer
            .install(&manifest(&[("github.com/a/one", "v1.0.0")]), Scope::Local, &InstallOptions::default())
            .unwrap();

        fx.registry.reset();
        let m = manifest(&[("github.com/a/one", "latest")]);
        let report = installer.install(&m, Scope::Local, &InstallOptions::default()).unwrap();
        assert_eq!(fx.registry.resolves(), 1);
        assert_eq!(report.modules[0].outcome, Outcome::Installed);
        assert_eq!(report.modules[0].resolved.as_deref(), Some("v1.2.0"));
        let marker = fx.project().join("gopkg_modules/github.com/a/one").join(VERSION_MARKER);
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "v1.2.0");

        fx.publish("github.com/a/one", "v1.3.0");
        fx.registry.reset();
        let opts = InstallOptions {
            refresh: ["github.com/a/one".to_string()].into_iter().collect(),
            ..InstallOptions::default()
        };
        let report = installer.install(&m, Scope::Local, &opts).unwrap();
        assert_eq!(fx.registry.resolves(), 1);
        assert_eq!(report.modules[0].resolved.as_deref(), Some("v1.3.0"));
    }

    #[test]
    fn one_failed_resolution_does_not_stop_the_batch() {
        let fx = Fixture::new();
        for m in ["github.com/a/one", "github.com/a/two", "github.com/a/three"] {
            fx.publish(m, "v1.0.0");
        }
        fx.registry.fail("github.com/a/two");
        let m = manifest(&[
            ("github.com/a/one", "latest"),
            ("github.com/a/two", "latest"),
            ("github.com/a/three", "latest"),
        ]);

        let report = fx.installer().install(&m, Scope::Local, &InstallOptions::default()).unwrap();
        assert_eq!(report.failures(), 1);
        assert_eq!(stage_of(&report, "github.com/a/two"), Some(Stage::Resolve));

        let lock = Lockfile::load(&fx.layout.lock_path(Scope::Local)).unwrap();
        assert_eq!(lock.len(), 2);
        assert!(lock.get("github.com/a/one").is_some());
        assert!(lock.get("github.com/a/three").is_some());
        assert!(lock.get("github.com/a/two").is_none());
    }

    #[test]
    fn failed_modules_are_pruned_from_an_existing_lock() {
        let fx = Fixture::new();
        fx.publish("github.com/a/one", "v1.0.0");
        fx.publish("github.com/a/two", "v1.0.0");
        let installer = fx.installer();
        installer
            .install(
                &manifest(&[("github.com/a/one", "v1.0.0"), ("github.com/a/two", "v1.0.0")]),
                Scope::Local,
                &InstallOptions::default(),
            )
            .unwrap();

        // Changing the spec forces resolution, which now fails.
        fx.registry.fail("github.com/a/two");
        let report = installer
            .install(
                &manifest(&[("github.com/a/one", "v1.0.0"), ("github.com/a/two", "latest")]),
                Scope::Local,
                &InstallOptions::default(),
            )
            .unwrap();
        assert_eq!(report.failures(), 1);
        let lock = Lockfile::load(&fx.layout.lock_path(Scope::Local)).unwrap();
        assert_eq!(lock.len(), 1);
        assert!(lock.get("github.com/a/two").is_none());
    }

    #[test]
    fn download_and_extract_failures_have_their_own_stage() {
        let fx = Fixture::new();
        fx.publish("github.com/a/gone", "v1.0.0");
        std::fs::remove_file(fx.dir.path().join("registry/github.com/a/gone/@v/v1.0.0.zip")).unwrap();
        fx.publish_bytes("github.com/a/broken", "v1.0.0", b"definitely not a zip");
        fx.publish("github.com/a/fine", "v1.0.0");
        let m = manifest(&[
            ("github.com/a/broken", "v1.0.0"),
            ("github.com/a/fine", "v1.0.0"),
            ("github.com/a/gone", "v1.0.0"),
        ]);

        let report = fx.installer().install(&m, Scope::Local, &InstallOptions::default()).unwrap();
        assert_eq!(stage_of(&report, "github.com/a/gone"), Some(Stage::Download));
        assert_eq!(stage_of(&report, "github.com/a/broken"), Some(Stage::Extract));
        assert_eq!(stage_of(&report, "github.com/a/fine"), None);
        assert_eq!(report.modules[2].resolved.as_deref(), Some("v1.0.0"));

        let lock = Lockfile::load(&fx.layout.lock_path(Scope::Local)).unwrap();
        assert_eq!(lock.len(), 1);
        assert!(!fx.tool.calls().iter().any(|c| c.contains("broken") || c.contains("gone")));
    }

    #[test]
    fn wire_failures_are_per_module() {
        let fx = Fixture::new();
        fx.publish("github.com/a/one", "v1.0.0");
        fx.publish("github.com/a/two", "v1.0.0");
        fx.tool.fail("github.com/a/one");
        let m = manifest(&[("github.com/a/one", "latest"), ("github.com/a/two", "latest")]);

        let report = fx.installer().install(&m, Scope::Local, &InstallOptions::default()).unwrap();
        assert_eq!(stage_of(&report, "github.com/a/one"), Some(Stage::Wire));
        assert_eq!(report.modules[1].outcome, Outcome::Installed);

        let lock = Lockfile::load(&fx.layout.lock_path(Scope::Local)).unwrap();
        assert_eq!(lock.len(), 1);
        assert!(lock.get("github.com/a/two").is_some());
    }

    #[test]
    fn present_content_is_not_downloaded_again() {
        let fx = Fixture::new();
        fx.publish("github.com/a/one", "v1.0.0");
        let m = manifest(&[("github.com/a/one", "v1.0.0")]);
        let installer = fx.installer();
        installer.install(&m, Scope::Local, &InstallOptions::default()).unwrap();

        fx.cache.clear().unwrap();
        std::fs::remove_file(fx.layout.lock_path(Scope::Local)).unwrap();

        let report = installer.install(&m, Scope::Local, &InstallOptions::default()).unwrap();
        assert_eq!(report.modules[0].outcome, Outcome::Installed);
        assert!(!fx.cache.contains("github.com/a/one", "v1.0.0"));
    }

    #[test]
    fn global_scope_uses_home_store_and_lock() {
        let fx = Fixture::new();
        fx.publish("github.com/a/one", "v1.0.0");
        let m = manifest(&[("github.com/a/one", "v1.0.0")]);

        let report = fx.installer().install(&m, Scope::Global, &InstallOptions::default()).unwrap();
        assert!(report.is_success());
        assert_eq!(report.lock_path, fx.layout.lock_path(Scope::Global));

        let dest = fx.layout.module_dir(Scope::Global, "github.com/a/one").unwrap();
        assert!(dest.join("go.mod").is_file());
        assert!(!fx.layout.lock_path(Scope::Local).exists());
        let expected = format!("replace github.com/a/one={}", dest.display());
        assert!(fx.tool.calls().contains(&expected));
    }

    #[test]
    fn parallel_preparation_matches_sequential() {
        let fx = Fixture::new();
        let modules: Vec<String> = (0..7).map(|i| format!("github.com/org/mod{i}")).collect();
        for m in &modules {
            fx.publish(m, "v1.0.0");
        }
        fx.registry.fail("github.com/org/mod3");
        let deps: Vec<(&str, &str)> = modules.iter().map(|m| (m.as_str(), "latest")).collect();
        let m = manifest(&deps);
        let installer = fx.installer();

        let sequential = installer.install(&m, Scope::Local, &InstallOptions::default()).unwrap();
        let lock_seq = Lockfile::load(&fx.layout.lock_path(Scope::Local)).unwrap();

        std::fs::remove_dir_all(fx.layout.store_root(Scope::Local)).unwrap();
        std::fs::remove_file(fx.layout.lock_path(Scope::Local)).unwrap();

        let opts = InstallOptions {
            jobs: 4,
            ..InstallOptions::default()
        };
        let parallel = installer.install(&m, Scope::Local, &opts).unwrap();
        let lock_par = Lockfile::load(&fx.layout.lock_path(Scope::Local)).unwrap();

        assert_eq!(sequential, parallel);
        let strip = |l: &Lockfile| -> Vec<LockEntry> {
            l.dependencies
                .iter()
                .cloned()
                .map(|mut e| {
                    e.installed_time.clear();
                    e
                })
                .collect()
        };
        assert_eq!(strip(&lock_seq), strip(&lock_par));
        assert_eq!(lock_par.len(), 6);
    }

    #[test]
    fn cancelled_run_leaves_the_lockfile_alone() {
        let fx = Fixture::new();
        fx.publish("github.com/a/one", "v1.0.0");
        fx.publish("github.com/a/two", "v1.0.0");
        let installer = fx.installer();
        let lock_path = fx.layout.lock_path(Scope::Local);

        let opts = InstallOptions::default();
        opts.cancel.cancel();
        let first = manifest(&[("github.com/a/one", "latest")]);
        assert!(matches!(installer.install(&first, Scope::Local, &opts), Err(InstallError::Cancelled)));
        assert!(!lock_path.exists());
        assert_eq!(fx.registry.resolves(), 0);

        installer.install(&first, Scope::Local, &InstallOptions::default()).unwrap();
        let before = Lockfile::load(&lock_path).unwrap();
        assert_eq!(before.len(), 1);

        let both = manifest(&[("github.com/a/one", "latest"), ("github.com/a/two", "latest")]);
        for jobs in [1, 2] {
            let opts = InstallOptions {
                jobs,
                ..InstallOptions::default()
            };
            opts.cancel.cancel();
            let result = installer.install(&both, Scope::Local, &opts);
            assert!(matches!(result, Err(InstallError::Cancelled)));
            assert_eq!(Lockfile::load(&lock_path).unwrap(), before);
        }
        assert!(fx.project().join("gopkg_modules/github.com/a/one/go.mod").is_file());
    }

    #[test]
    fn nested_modules_survive_a_parallel_reinstall() {
        let fx = Fixture::new();
        fx.publish("github.com/a/b", "v1.0.0");
        fx.publish("github.com/a/b", "v1.1.0");
        fx.publish("github.com/a/b/v2", "v2.0.0");
        let installer = fx.installer();
        let opts = InstallOptions {
            jobs: 2,
            ..InstallOptions::default()
        };
        installer
            .install(
                &manifest(&[("github.com/a/b", "v1.0.0"), ("github.com/a/b/v2", "v2.0.0")]),
                Scope::Local,
                &opts,
            )
            .unwrap();

        // Replacing the outer module's directory must not strand the inner one.
        let report = installer
            .install(
                &manifest(&[("github.com/a/b", "v1.1.0"), ("github.com/a/b/v2", "v2.0.0")]),
                Scope::Local,
                &opts,
            )
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.modules[1].outcome, Outcome::Locked);

        let outer = fx.layout.module_dir(Scope::Local, "github.com/a/b").unwrap();
        let inner = fx.layout.module_dir(Scope::Local, "github.com/a/b/v2").unwrap();
        assert_eq!(std::fs::read_to_string(outer.join(VERSION_MARKER)).unwrap(), "v1.1.0");
        assert_eq!(std::fs::read_to_string(inner.join(VERSION_MARKER)).unwrap(), "v2.0.0");
        assert!(inner.join("go.mod").is_file());
        assert_eq!(Lockfile::load(&fx.layout.lock_path(Scope::Local)).unwrap().len(), 2);
    }

    #[test]
    fn nested_store_paths_share_a_family() {
        let work = [
            ("github.com/a/b", "latest"),
            ("github.com/a/b-x", "latest"),
            ("github.com/a/b/v2", "latest"),
            ("github.com/a/b/v2/sub", "latest"),
            ("golang.org/x/net", "latest"),
        ];
        assert_eq!(nested_families(&work), vec![vec![0, 2, 3], vec![1], vec![4]]);
        assert!(contains_module("github.com/a/b", "github.com/a/b/v2"));
        assert!(!contains_module("github.com/a/b", "github.com/a/b-x"));
        assert!(!contains_module("github.com/a/b", "github.com/a/b"));
    }

    #[test]
    fn traversing_version_spec_is_a_resolve_failure() {
        let fx = Fixture::new();
        let mut m = manifest(&[]);
        m.dependencies.insert("github.com/a/one".to_string(), "../../escape".to_string());
        let report = fx.installer().install(&m, Scope::Local, &InstallOptions::default()).unwrap();
        assert_eq!(stage_of(&report, "github.com/a/one"), Some(Stage::Resolve));
        assert_eq!(fx.registry.resolves(), 0);
    }

    #[test]
    fn verify_uses_the_locked_checksum() {
        let fx = Fixture::new();
        fx.publish("github.com/a/one", "v1.0.0");
        let m = manifest(&[("github.com/a/one", "v1.0.0")]);
        let installer = fx.installer();
        installer.install(&m, Scope::Local, &InstallOptions::default()).unwrap();

        // Content in the registry changes under the same version.
        let other = module_zip("github.com/a/one", "v1.0.0", &[("go.mod", "module tampered\n")]);
        fx.publish_bytes("github.com/a/one", "v1.0.0", &other);
        fx.cache.clear().unwrap();
        std::fs::remove_dir_all(fx.layout.store_root(Scope::Local)).unwrap();

        let opts = InstallOptions {
            verify: true,
            ..InstallOptions::default()
        };
        let report = installer.install(&m, Scope::Local, &opts).unwrap();
        assert_eq!(stage_of(&report, "github.com/a/one"), Some(Stage::Download));
    }

    #[test]
    fn unreadable_lock_is_an_error() {
        let fx = Fixture::new();
        std::fs::write(fx.layout.lock_path(Scope::Local), "dependencies = [[[").unwrap();
        let result = fx
            .installer()
            .install(&manifest(&[]), Scope::Local, &InstallOptions::default());
        assert!(matches!(result, Err(InstallError::Lock(_))));
    }

    #[test]
    fn invalid_module_is_a_resolve_failure() {
        let fx = Fixture::new();
        let mut m = manifest(&[]);
        m.dependencies.insert("../escape".to_string(), "latest".to_string());
        let report = fx.installer().install(&m, Scope::Local, &InstallOptions::default()).unwrap();
        assert_eq!(stage_of(&report, "../escape"), Some(Stage::Resolve));
        assert_eq!(fx.registry.resolves(), 0);
    }
}
