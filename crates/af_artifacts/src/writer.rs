//! # Artifact writer
//!
//! Owns one run directory `<out_dir>/<run_id>/` and emits the canonical
//! output set: `summary.json`, `metrics.csv`, `actions.ndjson`,
//! `config_resolved.json`, and optionally `run.log`.
//!
//! ## Crash behavior
//! Files are written whole and fsynced; any I/O failure is fatal
//! (`ArtifactWrite`, exit class 2).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use af_api::record::{ActionRecord, AgentStatsEntry, FailedAssertion};
use af_api::resolved::ResolvedConfig;
use af_api::RunResult;
use af_types::{ForgeError, ForgeResult, MetricMap};

use crate::clock::wall_clock_path_stamp;
use crate::json::{to_compact_line, to_pretty_document};

/// Compute the run id: stable `<scenario>-ci` in CI mode, wall-stamped
/// otherwise. The stamp is never part of the determinism fingerprint.
pub fn run_id_for(scenario_name: &str, ci: bool) -> String {
    if ci {
        format!("{}-ci", scenario_name)
    } else {
        format!("{}-{}", scenario_name, wall_clock_path_stamp())
    }
}

/// `summary.json`: the run result plus the wall-clock stamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummaryDoc {
    pub run_id: String,
    pub scenario_name: String,
    pub seed: u64,
    pub ticks: u64,
    pub duration_ms: u64,
    pub success: bool,
    pub failed_assertions: Vec<FailedAssertion>,
    pub final_metrics: MetricMap,
    pub agent_stats: Vec<AgentStatsEntry>,
    pub output_dir: String,
    /// Wall clock; excluded from the determinism fingerprint
    pub timestamp: String,
}

impl RunSummaryDoc {
    pub fn new(result: &RunResult, timestamp: String) -> Self {
        RunSummaryDoc {
            run_id: result.run_id.clone(),
            scenario_name: result.scenario_name.clone(),
            seed: result.seed,
            ticks: result.ticks,
            duration_ms: result.duration_ms,
            success: result.success,
            failed_assertions: result.failed_assertions.clone(),
            final_metrics: result.final_metrics.clone(),
            agent_stats: result.agent_stats.clone(),
            output_dir: result.output_dir.clone(),
            timestamp,
        }
    }

    /// Recover the embedded run result (for report/compare tooling).
    pub fn into_run_result(self) -> RunResult {
        RunResult {
            run_id: self.run_id,
            scenario_name: self.scenario_name,
            seed: self.seed,
            ticks: self.ticks,
            duration_ms: self.duration_ms,
            success: self.success,
            failed_assertions: self.failed_assertions,
            final_metrics: self.final_metrics,
            agent_stats: self.agent_stats,
            output_dir: self.output_dir,
        }
    }
}

/// Writes the canonical artifact set for one run.
pub struct ArtifactWriter {
    run_dir: PathBuf,
}

impl ArtifactWriter {
    /// Create (or reuse) the run directory `<out_dir>/<run_id>/`.
    pub fn create(out_dir: &Path, run_id: &str) -> ForgeResult<Self> {
        let run_dir = out_dir.join(run_id);
        fs::create_dir_all(&run_dir).map_err(|e| {
            ForgeError::ArtifactWrite(format!("failed to create run dir {:?}: {}", run_dir, e))
        })?;
        debug!("Initialized run directory {:?}", run_dir);
        Ok(ArtifactWriter { run_dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn write_summary(&self, result: &RunResult, wall_timestamp: String) -> ForgeResult<()> {
        let doc = RunSummaryDoc::new(result, wall_timestamp);
        self.write_file("summary.json", &to_pretty_document(&doc)?)
    }

    pub fn write_metrics_csv(&self, csv: &str) -> ForgeResult<()> {
        self.write_file("metrics.csv", csv)
    }

    /// One compact JSON object per record, in append order, each followed
    /// by a newline; no extra blank line after the last record.
    pub fn write_actions(&self, records: &[ActionRecord]) -> ForgeResult<()> {
        let mut body = String::new();
        for record in records {
            body.push_str(&to_compact_line(record)?);
            body.push('\n');
        }
        self.write_file("actions.ndjson", &body)
    }

    pub fn write_config(&self, config: &ResolvedConfig) -> ForgeResult<()> {
        self.write_file("config_resolved.json", &to_pretty_document(config)?)
    }

    pub fn write_run_log(&self, lines: &[String]) -> ForgeResult<()> {
        let mut body = String::new();
        for line in lines {
            body.push_str(line);
            body.push('\n');
        }
        self.write_file("run.log", &body)
    }

    fn write_file(&self, name: &str, contents: &str) -> ForgeResult<()> {
        let path = self.run_dir.join(name);

        let mut file = File::create(&path)
            .map_err(|e| ForgeError::ArtifactWrite(format!("failed to create {}: {}", name, e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ForgeError::ArtifactWrite(format!("failed to write {}: {}", name, e)))?;

        file.sync_all()
            .map_err(|e| ForgeError::ArtifactWrite(format!("failed to sync {}: {}", name, e)))?;

        debug!("Wrote {} ({} bytes)", name, contents.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_types::Tick;
    use std::env::temp_dir;

    fn temp_out() -> PathBuf {
        temp_dir().join(format!("af_writer_test_{}", std::process::id()))
    }

    #[test]
    fn run_id_is_stable_in_ci_mode() {
        assert_eq!(run_id_for("toy", true), "toy-ci");
        let stamped = run_id_for("toy", false);
        assert!(stamped.starts_with("toy-"));
        assert!(!stamped.contains(':'));
    }

    #[test]
    fn actions_file_has_one_line_per_record() {
        let writer = ArtifactWriter::create(&temp_out(), "actions-test").unwrap();
        let records = vec![
            ActionRecord {
                tick: Tick(0),
                timestamp: 1.0,
                agent_id: "a-0".into(),
                agent_type: "a".into(),
                action: None,
                result: None,
                duration_ms: 0,
            },
            ActionRecord {
                tick: Tick(1),
                timestamp: 2.0,
                agent_id: "a-0".into(),
                agent_type: "a".into(),
                action: None,
                result: None,
                duration_ms: 0,
            },
        ];
        writer.write_actions(&records).unwrap();

        let body = fs::read_to_string(writer.run_dir().join("actions.ndjson")).unwrap();
        assert_eq!(body.lines().count(), 2);
        assert!(body.ends_with('\n'));
        assert!(!body.ends_with("\n\n"));
    }

    #[test]
    fn summary_is_pretty_with_trailing_newline() {
        let writer = ArtifactWriter::create(&temp_out(), "summary-test").unwrap();
        let result = RunResult {
            run_id: "summary-test".into(),
            scenario_name: "s".into(),
            seed: 1,
            ticks: 10,
            duration_ms: 5,
            success: true,
            failed_assertions: vec![],
            final_metrics: MetricMap::new(),
            agent_stats: vec![],
            output_dir: "out/summary-test".into(),
        };
        writer
            .write_summary(&result, "2026-01-01T00:00:00.000Z".into())
            .unwrap();

        let body = fs::read_to_string(writer.run_dir().join("summary.json")).unwrap();
        assert!(body.contains("  \"runId\": \"summary-test\""));
        assert!(body.ends_with("}\n"));

        let doc: RunSummaryDoc = serde_json::from_str(&body).unwrap();
        assert_eq!(doc.into_run_result(), result);
    }
}
