//! `gopkg init`: create the project manifest.

use anyhow::Result;

use crate::session::Session;

pub fn run(session: &Session) -> Result<()> {
    let manifest = gopkg_install::init(&session.layout)?;
    println!("Created gopkg.toml for '{}'", manifest.name);
    Ok(())
}
