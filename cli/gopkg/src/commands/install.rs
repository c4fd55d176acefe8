//! `gopkg install` and `gopkg update`.

use anyhow::{bail, Result};
use gopkg_core::Scope;
use gopkg_install::{format_report, format_table, InstallOptions, InstallReport, Installer};

use crate::session::Session;

fn options(session: &Session) -> InstallOptions {
    InstallOptions {
        jobs: session.settings.jobs,
        verify: session.settings.verify,
        ..InstallOptions::default()
    }
}

fn finish(report: &InstallReport) -> Result<()> {
    print!("{}", format_report(report));
    if !report.is_success() {
        bail!("{} of {} modules failed to install", report.failures(), report.modules.len());
    }
    Ok(())
}

pub fn install(session: &Session, scope: Scope, auto: bool) -> Result<()> {
    let registry = session.registry()?;
    let cache = session.cache();
    let installer = Installer::new(registry.as_ref(), &cache, &session.tool, &session.layout);
    let report = gopkg_install::install_project(&installer, scope, &options(session), auto)?;
    if report.modules.is_empty() {
        println!("No dependencies declared in {}", session.layout.manifest_path(scope).display());
        return Ok(());
    }
    finish(&report)
}

pub fn update(session: &Session, scope: Scope, targets: &[String]) -> Result<()> {
    let registry = session.registry()?;
    let cache = session.cache();
    let installer = Installer::new(registry.as_ref(), &cache, &session.tool, &session.layout);
    let updated = gopkg_install::update(&installer, scope, targets, &options(session))?;

    let rows: Vec<Vec<String>> = updated
        .rows
        .iter()
        .map(|r| {
            vec![
                r.module.clone(),
                r.declared.clone(),
                r.latest.clone().unwrap_or_else(|| "-".to_string()),
                r.status.to_string(),
            ]
        })
        .collect();
    print!("{}", format_table(&["Module", "Declared", "Latest", "Status"], &rows));
    println!();
    finish(&updated.install)
}
