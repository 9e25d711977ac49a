//! State file persistence
//!
//! The parameter snapshot lives at `<config_dir>/ripple/state.txt`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ripple_audio::{load_into, serialize_state, LoadReport, Params};
use tracing::info;

/// Default state file path
pub fn state_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ripple")
        .join("state.txt")
}

/// Read `path` into `params`
pub fn load_state(params: &Params, path: &Path) -> anyhow::Result<LoadReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file {}", path.display()))?;
    let report = load_into(params, &content);
    info!(
        path = %path.display(),
        version = ?report.version,
        applied = report.applied,
        skipped = report.skipped,
        defaulted = report.defaulted,
        "State loaded"
    );
    Ok(report)
}

/// Load `path` if it exists; a missing file leaves the defaults in place
pub fn load_state_if_present(params: &Params, path: &Path) -> anyhow::Result<Option<LoadReport>> {
    if !path.exists() {
        info!(path = %path.display(), "No state file; using defaults");
        return Ok(None);
    }
    load_state(params, path).map(Some)
}

/// Write the current parameter values to `path`
pub fn save_state(params: &Params, path: &Path) -> anyhow::Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = serialize_state(&params.snapshot());
    fs::write(path, content)
        .with_context(|| format!("Failed to write state file {}", path.display()))?;
    info!(path = %path.display(), "State saved");
    Ok(())
}
