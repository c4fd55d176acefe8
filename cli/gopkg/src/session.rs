//! Per-invocation state shared by the commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use gopkg_core::{Layout, Settings, MANIFEST_FILE};
use gopkg_install::GoModTool;
use gopkg_registry::{open_registry, ArchiveCache, RegistryBackend};

use crate::commands::progress::StderrProgress;

pub struct Session {
    pub settings: Settings,
    pub layout: Layout,
    pub tool: GoModTool,
}

impl Session {
    /// The project is the nearest directory at or above `cwd` holding a
    /// manifest, or `cwd` itself.
    pub fn new(settings: Settings, cwd: &Path) -> Self {
        let project = find_project_dir(cwd).unwrap_or_else(|| cwd.to_path_buf());
        let layout = Layout::new(project.clone(), settings.home.clone());
        Session {
            settings,
            layout,
            tool: GoModTool::new(project),
        }
    }

    pub fn registry(&self) -> anyhow::Result<Box<dyn RegistryBackend>> {
        open_registry(&self.settings)
            .with_context(|| format!("opening registry {}", self.settings.registry_url))
    }

    pub fn cache(&self) -> ArchiveCache {
        ArchiveCache::new(self.layout.cache_dir()).with_progress(Arc::new(StderrProgress::default()))
    }
}

/// Search `start` and its ancestors for a manifest.
pub fn find_project_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
pub(crate) fn test_session(dir: &Path) -> Session {
    use std::time::Duration;

    let project = dir.join("app");
    std::fs::create_dir_all(&project).unwrap();
    let settings = Settings {
        home: dir.join("home"),
        registry_url: format!("file://{}", dir.join("registry").display()),
        timeout: Duration::from_secs(5),
        jobs: 1,
        verify: false,
    };
    let mut session = Session::new(settings, &project);
    session.tool = GoModTool::new(project).with_program("true");
    session
}
