//! # Run loading
//!
//! Reads a finished run directory back into typed records for the report
//! and comparison tools. Failures are `ArtifactRead` (exit class 2).

use std::fs;
use std::path::{Path, PathBuf};

use af_api::record::ActionRecord;
use af_api::resolved::ResolvedConfig;
use af_artifacts::writer::RunSummaryDoc;
use af_types::{ForgeError, ForgeResult};

/// A run directory parsed back into memory.
pub struct LoadedRun {
    pub dir: PathBuf,
    pub summary: RunSummaryDoc,
    pub config: ResolvedConfig,
    pub actions: Vec<ActionRecord>,
    pub metrics_csv: String,
}

/// Load `summary.json`, `config_resolved.json`, `actions.ndjson`, and
/// `metrics.csv` from a run directory.
pub fn load_run(dir: &Path) -> ForgeResult<LoadedRun> {
    let summary: RunSummaryDoc = read_json(dir, "summary.json")?;
    let config: ResolvedConfig = read_json(dir, "config_resolved.json")?;
    let metrics_csv = read_text(dir, "metrics.csv")?;

    let actions_body = read_text(dir, "actions.ndjson")?;
    let mut actions = Vec::new();
    for (idx, line) in actions_body.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let record: ActionRecord = serde_json::from_str(line).map_err(|e| {
            ForgeError::ArtifactRead(format!("actions.ndjson line {}: {}", idx + 1, e))
        })?;
        actions.push(record);
    }

    Ok(LoadedRun {
        dir: dir.to_path_buf(),
        summary,
        config,
        actions,
        metrics_csv,
    })
}

fn read_text(dir: &Path, name: &str) -> ForgeResult<String> {
    fs::read_to_string(dir.join(name))
        .map_err(|e| ForgeError::ArtifactRead(format!("failed to read {}: {}", name, e)))
}

fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, name: &str) -> ForgeResult<T> {
    let body = read_text(dir, name)?;
    serde_json::from_str(&body)
        .map_err(|e| ForgeError::ArtifactRead(format!("failed to parse {}: {}", name, e)))
}
