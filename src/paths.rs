//! Home-based storage paths for ad-script-agent output.
//!
//! Everything lives under `~/.ad-script-agent/`:
//! - `runs/<run-id>/events.jsonl` - Structured event log of one run
//!
//! `ADSCRIPT_HOME` replaces the home directory when set.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// The name of the ad-script-agent directory.
const AD_SCRIPT_AGENT_DIR: &str = ".ad-script-agent";

/// Replaces `~/.ad-script-agent` when set.
pub const HOME_ENV_OVERRIDE: &str = "ADSCRIPT_HOME";

/// Returns the home-based directory: `~/.ad-script-agent/`
///
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if:
/// - Home directory cannot be determined
/// - Directory creation fails
pub fn home_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(HOME_ENV_OVERRIDE) {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => dirs::home_dir()
            .context("Could not determine home directory for run storage")?
            .join(AD_SCRIPT_AGENT_DIR),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create home directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the runs directory: `~/.ad-script-agent/runs/`
///
/// Creates the directory if it doesn't exist.
pub fn runs_dir() -> Result<PathBuf> {
    let dir = home_dir()?.join("runs");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create runs directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the directory for one run's logs, under `base` if given.
///
/// Creates the directory if it doesn't exist.
pub fn run_dir(base: Option<&Path>, run_id: &str) -> Result<PathBuf> {
    let root = match base {
        Some(dir) => dir.to_path_buf(),
        None => runs_dir()?,
    };
    let dir = root.join(run_id);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create run directory: {}", dir.display()))?;
    Ok(dir)
}
