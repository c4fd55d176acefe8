//! Discovery of third-party imports in Go sources.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use gopkg_core::LOCAL_STORE_DIR;
use regex::Regex;

use crate::error::InstallError;

fn single_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*import\s+(?:[A-Za-z_.][\w.]*\s+)?"([^"]+)""#).expect("valid regex")
    })
}

fn import_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?ms)^\s*import\s*\((.*?)\)").expect("valid regex"))
}

fn block_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*(?:[A-Za-z_.][\w.]*\s+)?"([^"]+)""#).expect("valid regex")
    })
}

fn major_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v[0-9]+$").expect("valid regex"))
}

/// Import paths in one Go source file.
pub fn parse_imports(source: &str) -> Vec<String> {
    let mut out: Vec<String> = single_import()
        .captures_iter(source)
        .map(|c| c[1].to_string())
        .collect();
    for block in import_block().captures_iter(source) {
        out.extend(block_line().captures_iter(&block[1]).map(|c| c[1].to_string()));
    }
    out
}

/// Whether an import refers to something outside the standard library.
pub fn is_external(import: &str) -> bool {
    import.split('/').next().is_some_and(|first| first.contains('.'))
}

/// Reduce an import path to the module that provides it.
///
/// `github.com/go-chi/chi/v5/middleware` becomes `github.com/go-chi/chi/v5`.
pub fn module_root(import: &str) -> String {
    let segs: Vec<&str> = import.split('/').collect();
    let mut take = segs.len().min(3);
    if segs.len() > 3 && major_suffix().is_match(segs[3]) {
        take = 4;
    }
    segs[..take].join("/")
}

/// The `module` line of a `go.mod` file, if any.
pub fn module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        let name = rest.trim().trim_matches('"');
        (!name.is_empty() && rest.starts_with(char::is_whitespace)).then(|| name.to_string())
    })
}

/// Module roots of every external import under `dir`.
///
/// Test files, `vendor/`, the local module store, and hidden directories
/// are skipped. Imports inside `own_module` are not dependencies.
pub fn scan(dir: &Path, own_module: Option<&str>) -> Result<BTreeSet<String>, InstallError> {
    let mut roots = BTreeSet::new();
    walk(dir, &mut |source| {
        for import in parse_imports(source) {
            if !is_external(&import) {
                continue;
            }
            if let Some(own) = own_module {
                if import == own || import.starts_with(&format!("{own}/")) {
                    continue;
                }
            }
            roots.insert(module_root(&import));
        }
    })?;
    tracing::debug!(dir = %dir.display(), modules = roots.len(), "scanned imports");
    Ok(roots)
}

fn walk(dir: &Path, visit: &mut dyn FnMut(&str)) -> Result<(), InstallError> {
    let io = |e| InstallError::Io {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(io)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io)?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let path = entry.path();
        let kind = entry.file_type().map_err(io)?;
        if kind.is_dir() {
            if name.starts_with('.') || name == "vendor" || name == LOCAL_STORE_DIR {
                continue;
            }
            walk(&path, visit)?;
        } else if kind.is_file() && name.ends_with(".go") && !name.ends_with("_test.go") {
            let source = std::fs::read_to_string(&path).map_err(|source| InstallError::Io {
                path: path.clone(),
                source,
            })?;
            visit(&source);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN: &str = r#"package main

import "fmt"
import log "github.com/sirupsen/logrus"

import (
	"net/http"
	chi "github.com/go-chi/chi/v5/middleware"
	_ "github.com/mattn/go-sqlite3"
	"golang.org/x/net/http2"
	"example.com/app/internal/db"
)
"#;

    #[test]
    fn parses_single_and_block_imports() {
        let imports = parse_imports(MAIN);
        for want in [
            "fmt",
            "github.com/sirupsen/logrus",
            "net/http",
            "github.com/go-chi/chi/v5/middleware",
            "github.com/mattn/go-sqlite3",
            "golang.org/x/net/http2",
        ] {
            assert!(imports.iter().any(|i| i == want), "missing {want} in {imports:?}");
        }
    }

    #[test]
    fn roots() {
        assert_eq!(module_root("golang.org/x/net/http2"), "golang.org/x/net");
        assert_eq!(module_root("github.com/go-chi/chi/v5/middleware"), "github.com/go-chi/chi/v5");
        assert_eq!(module_root("github.com/a/b/version"), "github.com/a/b");
        assert_eq!(module_root("gopkg.in/yaml.v3"), "gopkg.in/yaml.v3");
        assert!(is_external("gopkg.in/yaml.v3"));
        assert!(!is_external("net/http"));
    }

    #[test]
    fn module_line() {
        assert_eq!(module_path("// c\nmodule example.com/app\n\ngo 1.21\n").as_deref(), Some("example.com/app"));
        assert_eq!(module_path("go 1.21\n"), None);
        assert_eq!(module_path("modulex foo\n"), None);
    }

    #[test]
    fn scan_skips_tests_vendor_store_and_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("main.go"), MAIN).unwrap();
        std::fs::write(
            root.join("main_test.go"),
            "package main\nimport \"github.com/stretchr/testify/assert\"\n",
        )
        .unwrap();
        for skipped in ["vendor/x", "gopkg_modules/y", ".git/z"] {
            let d = root.join(skipped);
            std::fs::create_dir_all(&d).unwrap();
            std::fs::write(d.join("a.go"), "package a\nimport \"github.com/skip/me\"\n").unwrap();
        }
        std::fs::create_dir_all(root.join("cmd/tool")).unwrap();
        std::fs::write(
            root.join("cmd/tool/tool.go"),
            "package main\nimport \"github.com/spf13/cobra\"\n",
        )
        .unwrap();

        let found = scan(root, Some("example.com/app")).unwrap();
        let found: Vec<_> = found.into_iter().collect();
        assert_eq!(
            found,
            vec![
                "github.com/go-chi/chi/v5",
                "github.com/mattn/go-sqlite3",
                "github.com/sirupsen/logrus",
                "github.com/spf13/cobra",
                "golang.org/x/net",
            ]
        );
    }
}
