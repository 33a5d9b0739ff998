//! Atomic output publishing (§3 "a rule's outputs are written atomically").
//!
//! A processor writes to a temporary sibling path; the scheduler renames it
//! into place only once the processor returns success, so a crash mid-job
//! never leaves a partially written output looking fresh.

use std::path::{Path, PathBuf};

/// The temp path a job should have a processor write `output` to instead
/// of the real path, derived by prefixing the file name with `.tmp-`.
pub fn temp_path_for(output: &Path) -> PathBuf {
    let file_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("output");
    output.with_file_name(format!(".tmp-{file_name}"))
}

/// Publishes every temp path produced by a successful job, creating parent
/// directories for the final paths as needed. Stops and reports the first
/// failure; earlier renames in the same call are left in place, since a
/// partially published job is always re-run from scratch next time (its
/// content key won't match).
pub fn publish(outputs: &[PathBuf]) -> anyhow::Result<()> {
    for output in outputs {
        let temp = temp_path_for(output);
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&temp, output)?;
    }
    Ok(())
}

/// Removes any leftover temp paths for outputs a job was about to publish,
/// for cleanup after a failed or cancelled job.
pub fn discard_temp_paths(outputs: &[PathBuf]) {
    for output in outputs {
        let _ = std::fs::remove_file(temp_path_for(output));
    }
}
