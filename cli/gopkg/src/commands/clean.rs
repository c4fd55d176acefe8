//! `gopkg clean`: remove installed modules.

use anyhow::Result;
use gopkg_core::Scope;
use gopkg_install::CleanOptions;

use crate::session::Session;

pub fn run(session: &Session, scope: Scope, cache: bool, lock: bool) -> Result<()> {
    let archives = session.cache();
    let cleaned = gopkg_install::clean(&session.layout, &archives, scope, &CleanOptions { lock, cache })?;

    let store = session.layout.store_root(scope);
    if cleaned.store {
        println!("Removed {}", store.display());
    } else {
        println!("Already clean: {} does not exist", store.display());
    }
    if cleaned.lock {
        println!("Removed {}", session.layout.lock_path(scope).display());
    }
    if cleaned.cache {
        println!("Removed {}", archives.root().display());
    }
    Ok(())
}
