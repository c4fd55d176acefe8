//! Small filesystem helpers shared across the workspace.

use std::io::Write;
use std::path::Path;

/// Replace `path` with `data` so readers see either the old or the new
/// contents, never a partial write.
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over the target. Parent directories are created as needed.
pub fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
