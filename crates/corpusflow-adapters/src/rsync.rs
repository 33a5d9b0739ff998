//! `rsync` wrapper used by installer/uninstaller example processors to
//! fetch or remove model data under the data directory.

use std::path::Path;

use anyhow::Result;

use crate::subprocess;

/// Mirrors `src` into `dst` with `rsync -a --delete`, creating `dst` if it
/// doesn't already exist.
pub fn sync_dir(src: &str, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let args = vec!["-a".to_string(), "--delete".to_string(), src.to_string(), dst.display().to_string()];
    subprocess::run(Path::new("rsync"), &args, None)?;
    Ok(())
}
