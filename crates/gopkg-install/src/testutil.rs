//! Shared fixtures: a filesystem registry that counts lookups, a build
//! tool that records edits, and a project/home pair in a temp directory.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use gopkg_core::{Layout, Manifest, VersionSpec};
use gopkg_registry::{
    ArchiveCache, ArchiveStream, FetchError, LocalRegistry, RegistryBackend, RegistryError,
    ResolvedMetadata,
};
use zip::write::SimpleFileOptions;

use crate::buildtool::BuildTool;
use crate::error::BuildToolError;
use crate::orchestrator::Installer;

/// A registry archive: every file under `<module>@<version>/`.
pub fn module_zip(module: &str, version: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::<u8>::new()));
    let opts = SimpleFileOptions::default();
    for (name, body) in files {
        zip.start_file(format!("{module}@{version}/{name}"), opts).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Wraps a [`LocalRegistry`], counting resolutions and failing on demand.
pub struct CountingRegistry {
    inner: LocalRegistry,
    resolves: AtomicUsize,
    failing: Mutex<BTreeSet<String>>,
}

impl CountingRegistry {
    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.resolves.store(0, Ordering::SeqCst);
    }

    pub fn fail(&self, module: &str) {
        self.failing.lock().unwrap().insert(module.to_string());
    }

    pub fn local(&self) -> &LocalRegistry {
        &self.inner
    }
}

impl RegistryBackend for CountingRegistry {
    fn resolve_version(
        &self,
        module: &str,
        spec: &VersionSpec,
    ) -> Result<ResolvedMetadata, RegistryError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(module) {
            return Err(RegistryError::Transport {
                module: module.to_string(),
                detail: "connection refused".to_string(),
            });
        }
        self.inner.resolve_version(module, spec)
    }

    fn list_versions(&self, module: &str) -> Result<Vec<String>, RegistryError> {
        if self.failing.lock().unwrap().contains(module) {
            return Err(RegistryError::Transport {
                module: module.to_string(),
                detail: "connection refused".to_string(),
            });
        }
        self.inner.list_versions(module)
    }

    fn open_archive(&self, module: &str, version: &str) -> Result<ArchiveStream, FetchError> {
        self.inner.open_archive(module, version)
    }

    fn origin(&self) -> &str {
        self.inner.origin()
    }
}

/// Records every edit; fails requirement edits for selected modules.
#[derive(Default)]
pub struct RecordingTool {
    calls: Mutex<Vec<String>>,
    failing: Mutex<BTreeSet<String>>,
}

impl RecordingTool {
    pub fn fail(&self, module: &str) {
        self.failing.lock().unwrap().insert(module.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, module: &str, call: String) -> Result<(), BuildToolError> {
        self.calls.lock().unwrap().push(call.clone());
        if self.failing.lock().unwrap().contains(module) {
            return Err(BuildToolError::Failed {
                command: call,
                status: "exit status: 1".to_string(),
                stderr: "go: malformed module path".to_string(),
            });
        }
        Ok(())
    }
}

impl BuildTool for RecordingTool {
    fn ensure_module(&self, name: &str) -> Result<(), BuildToolError> {
        self.calls.lock().unwrap().push(format!("init {name}"));
        Ok(())
    }

    fn add_requirement(&self, module: &str, version: &str) -> Result<(), BuildToolError> {
        self.record(module, format!("require {module}@{version}"))
    }

    fn add_path_override(&self, module: &str, path: &str) -> Result<(), BuildToolError> {
        self.record(module, format!("replace {module}={path}"))
    }

    fn drop_requirement(&self, module: &str) -> Result<(), BuildToolError> {
        self.record(module, format!("droprequire {module}"))
    }

    fn drop_path_override(&self, module: &str) -> Result<(), BuildToolError> {
        self.record(module, format!("dropreplace {module}"))
    }
}

/// A project directory, a gopkg home, and a registry, all in one tempdir.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub layout: Layout,
    pub registry: CountingRegistry,
    pub cache: ArchiveCache,
    pub tool: RecordingTool,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("app");
        let home = dir.path().join("home");
        std::fs::create_dir_all(&project).unwrap();
        let layout = Layout::new(project, home);
        let registry = CountingRegistry {
            inner: LocalRegistry::new(dir.path().join("registry")),
            resolves: AtomicUsize::new(0),
            failing: Mutex::new(BTreeSet::new()),
        };
        let cache = ArchiveCache::new(layout.cache_dir());
        Fixture {
            dir,
            layout,
            registry,
            cache,
            tool: RecordingTool::default(),
        }
    }

    /// Publish `module@version` with a go.mod and one source file.
    pub fn publish(&self, module: &str, version: &str) {
        let gomod = format!("module {module}\n");
        let bytes = module_zip(module, version, &[("go.mod", &gomod), ("lib.go", "package lib\n")]);
        self.publish_bytes(module, version, &bytes);
    }

    pub fn publish_bytes(&self, module: &str, version: &str, bytes: &[u8]) {
        let time = gopkg_core::parse_timestamp("2024-03-01T12:00:00Z").unwrap();
        self.registry
            .local()
            .publish(module, version, time, bytes, Some("origin-hash"))
            .unwrap();
    }

    pub fn installer(&self) -> Installer<'_> {
        Installer::new(&self.registry, &self.cache, &self.tool, &self.layout)
    }

    pub fn project(&self) -> &Path {
        self.layout.project_dir()
    }
}

pub fn manifest(deps: &[(&str, &str)]) -> Manifest {
    let mut m = Manifest::new("app");
    for (module, spec) in deps {
        m.add(module, &VersionSpec::parse(spec)).unwrap();
    }
    m
}
