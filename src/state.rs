use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::{ExecuteSummary, RunReport};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

// ============================================================================
// State Structures
// ============================================================================

/// Record of the most recent `apply`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LastRun {
    pub timestamp: DateTime<Utc>,
    /// Node name the catalog was compiled for
    pub host: String,
    pub dry_run: bool,
    pub success: bool,
    pub summary: ExecuteSummary,
    pub report: RunReport,
}

const LAST_RUN_FILE: &str = "last_run.json";

// ============================================================================
// LastRun Implementation
// ============================================================================

impl LastRun {
    pub fn new(host: &str, report: RunReport) -> Self {
        Self {
            timestamp: Utc::now(),
            host: host.to_string(),
            dry_run: report.dry_run,
            success: report.is_success(),
            summary: report.summary(),
            report,
        }
    }

    /// Default location: `<state_dir>/last_run.json`
    pub fn default_path() -> Result<PathBuf> {
        Ok(paths::state_dir()?.join(LAST_RUN_FILE))
    }

    /// Load the last run, `None` if there is none yet
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            log::debug!("No last run recorded at {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let last: LastRun = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded last run from {}", path.display());
        Ok(Some(last))
    }

    /// Save to disk, creating the state directory
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved last run to {}", path.display());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
