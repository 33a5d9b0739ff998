//! Thin wrapper around [`std::process::Command`] shared by processor
//! bodies that shell out to an external tool (a tagger, a model
//! downloader, a PDF renderer) rather than reimplementing it.

use std::path::Path;
use std::process::Output;

use anyhow::{Context, Result, bail};

/// Runs `binary` with `args`, optionally in `cwd`, and returns its
/// captured output. Fails if the process cannot be spawned or exits
/// non-zero; stderr is included in the error so a failing external tool
/// doesn't just look like a silent no-op.
pub fn run(binary: &Path, args: &[String], cwd: Option<&Path>) -> Result<Output> {
    let mut cmd = std::process::Command::new(binary);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = cmd
        .output()
        .with_context(|| format!("spawning {}", binary.display()))?;
    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            binary.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_a_trivial_command() {
        let out = run(Path::new("true"), &[], None).unwrap();
        assert!(out.status.success());
    }

    #[test]
    fn surfaces_stderr_on_failure() {
        let err = run(Path::new("false"), &[], None).unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }
}
