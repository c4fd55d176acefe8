//! `gopkg list`, `gopkg check`, and `gopkg versions`.

use anyhow::Result;
use gopkg_core::Scope;
use gopkg_install::format_table;

use crate::session::Session;

pub fn list(session: &Session, scope: Scope) -> Result<()> {
    let rows = gopkg_install::list(&session.layout, scope)?;
    if rows.is_empty() {
        println!("No dependencies declared.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|r| {
            vec![
                r.module,
                r.declared,
                r.locked.unwrap_or_else(|| "-".to_string()),
                r.status.to_string(),
            ]
        })
        .collect();
    print!("{}", format_table(&["Module", "Declared", "Installed", "Status"], &rows));
    Ok(())
}

pub fn check(session: &Session, scope: Scope) -> Result<()> {
    let registry = session.registry()?;
    let rows = gopkg_install::check(registry.as_ref(), &session.layout, scope)?;
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|r| {
            vec![
                r.module,
                r.locked.unwrap_or_else(|| "-".to_string()),
                r.latest.unwrap_or_else(|| "-".to_string()),
                r.status.to_string(),
            ]
        })
        .collect();
    print!("{}", format_table(&["Module", "Installed", "Latest", "Status"], &rows));
    Ok(())
}

pub fn versions(session: &Session, module: &str) -> Result<()> {
    let registry = session.registry()?;
    let rows = gopkg_install::versions(registry.as_ref(), module)?;
    if rows.is_empty() {
        println!("{module} has no published versions.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|r| vec![r.version, r.note.to_string()])
        .collect();
    print!("{}", format_table(&["Version", ""], &rows));
    Ok(())
}
