//! `gopkg add` and `gopkg remove`.

use anyhow::Result;
use gopkg_core::Scope;

use crate::session::Session;

pub fn add(session: &Session, scope: Scope, target: &str) -> Result<()> {
    let added = gopkg_install::add(&session.layout, scope, target)?;
    match added.previous {
        Some(prev) if prev != added.spec.as_str() => {
            println!("Updated {}: {} -> {}", added.module, prev, added.spec)
        }
        Some(_) => println!("{} is already declared as {}", added.module, added.spec),
        None => println!("Added {} {}", added.module, added.spec),
    }
    println!("Run `gopkg install{}` to fetch it.", if scope == Scope::Global { " -g" } else { "" });
    Ok(())
}

pub fn remove(session: &Session, scope: Scope, module: &str) -> Result<()> {
    gopkg_install::remove(&session.layout, scope, &session.tool, module)?;
    println!("Removed {module}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_session;
    use gopkg_core::Manifest;

    #[cfg(unix)]
    #[test]
    fn add_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let session = test_session(dir.path());
        add(&session, Scope::Local, "github.com/a/b@v1.0.0").unwrap();
        add(&session, Scope::Local, "github.com/a/b@v1.1.0").unwrap();
        let m = Manifest::load(&session.layout.manifest_path(Scope::Local)).unwrap();
        assert_eq!(m.dependencies["github.com/a/b"], "v1.1.0");

        remove(&session, Scope::Local, "github.com/a/b").unwrap();
        let m = Manifest::load(&session.layout.manifest_path(Scope::Local)).unwrap();
        assert!(m.dependencies.is_empty());

        let err = remove(&session, Scope::Local, "github.com/a/b").unwrap_err();
        assert!(format!("{err:#}").contains("not declared"));
    }

    #[test]
    fn add_requires_a_version() {
        let dir = tempfile::tempdir().unwrap();
        let session = test_session(dir.path());
        assert!(add(&session, Scope::Local, "github.com/a/b").is_err());
    }
}
