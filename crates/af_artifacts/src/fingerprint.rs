//! # Determinism fingerprint
//!
//! SHA-256 over the canonical bytes of a run's artifacts, with the
//! wall-clock-influenced fields projected out first:
//!
//! - `summary.json` minus `timestamp` and `durationMs`
//! - `config_resolved.json` minus `options.outDir`
//! - `metrics.csv` as written
//! - `actions.ndjson` with per-record `durationMs` and `timestamp` removed
//!
//! Two runs are observably identical iff these hashes match.

use std::fs;
use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};

use af_types::{ForgeError, ForgeResult};

/// The four hashes certifying a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFingerprint {
    pub summary: String,
    pub config: String,
    pub metrics: String,
    pub actions: String,
}

impl RunFingerprint {
    /// Determinism equivalence for run comparison: metrics, normalized
    /// actions, and config (without `outDir`) must match. The summary hash
    /// is informational (it still covers `outputDir`, which legitimately
    /// differs between output locations).
    pub fn is_equivalent(&self, other: &RunFingerprint) -> bool {
        self.metrics == other.metrics
            && self.actions == other.actions
            && self.config == other.config
    }
}

/// Hex-encoded SHA-256.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Compute the fingerprint of an existing run directory.
pub fn fingerprint_run(run_dir: &Path) -> ForgeResult<RunFingerprint> {
    let summary = normalized_summary(run_dir)?;
    let config = normalized_config(run_dir)?;
    let metrics = read_artifact(run_dir, "metrics.csv")?;
    let actions = normalized_actions(run_dir)?;

    Ok(RunFingerprint {
        summary: sha256_hex(summary.as_bytes()),
        config: sha256_hex(config.as_bytes()),
        metrics: sha256_hex(metrics.as_bytes()),
        actions: sha256_hex(actions.as_bytes()),
    })
}

fn read_artifact(run_dir: &Path, name: &str) -> ForgeResult<String> {
    fs::read_to_string(run_dir.join(name))
        .map_err(|e| ForgeError::ArtifactRead(format!("failed to read {}: {}", name, e)))
}

fn parse_artifact(run_dir: &Path, name: &str) -> ForgeResult<Value> {
    let body = read_artifact(run_dir, name)?;
    serde_json::from_str(&body)
        .map_err(|e| ForgeError::ArtifactRead(format!("failed to parse {}: {}", name, e)))
}

/// Canonical bytes of a JSON value: compact encoding with object keys in
/// `serde_json`'s map order (sorted), which is stable across runs.
fn canonical_bytes(value: &Value) -> ForgeResult<String> {
    serde_json::to_string(value)
        .map_err(|e| ForgeError::ArtifactRead(format!("failed to re-encode artifact: {}", e)))
}

fn normalized_summary(run_dir: &Path) -> ForgeResult<String> {
    let mut value = parse_artifact(run_dir, "summary.json")?;
    if let Value::Object(map) = &mut value {
        let _ = map.remove("timestamp");
        let _ = map.remove("durationMs");
    }
    canonical_bytes(&value)
}

fn normalized_config(run_dir: &Path) -> ForgeResult<String> {
    let mut value = parse_artifact(run_dir, "config_resolved.json")?;
    if let Some(options) = value.get_mut("options").and_then(Value::as_object_mut) {
        let _ = options.remove("outDir");
    }
    canonical_bytes(&value)
}

fn normalized_actions(run_dir: &Path) -> ForgeResult<String> {
    let body = read_artifact(run_dir, "actions.ndjson")?;
    let mut out = String::with_capacity(body.len());

    for (idx, line) in body.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let mut record: Value = serde_json::from_str(line).map_err(|e| {
            ForgeError::ArtifactRead(format!("actions.ndjson line {}: {}", idx + 1, e))
        })?;
        if let Value::Object(map) = &mut record {
            let _ = map.remove("durationMs");
            let _ = map.remove("timestamp");
        }
        out.push_str(&canonical_bytes(&record)?);
        out.push('\n');
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;
    use std::path::PathBuf;

    fn write_run(dir: &PathBuf, duration: u64, stamp: &str, out_dir: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("summary.json"),
            format!(
                "{{\n  \"runId\": \"x-ci\",\n  \"seed\": 1,\n  \"durationMs\": {},\n  \"timestamp\": \"{}\"\n}}\n",
                duration, stamp
            ),
        )
        .unwrap();
        fs::write(
            dir.join("config_resolved.json"),
            format!(
                "{{\n  \"scenario\": {{\"name\": \"x\"}},\n  \"options\": {{\"outDir\": \"{}\", \"ci\": true}}\n}}\n",
                out_dir
            ),
        )
        .unwrap();
        fs::write(dir.join("metrics.csv"), "tick,timestamp,volume\n0,100,5\n").unwrap();
        fs::write(
            dir.join("actions.ndjson"),
            format!(
                "{{\"tick\":0,\"timestamp\":100.0,\"agentId\":\"a-0\",\"durationMs\":{}}}\n",
                duration
            ),
        )
        .unwrap();
    }

    #[test]
    fn wall_clock_fields_do_not_affect_fingerprint() {
        let base = temp_dir().join(format!("af_fp_test_{}", std::process::id()));
        let dir_a = base.join("a");
        let dir_b = base.join("b");
        write_run(&dir_a, 17, "2026-01-01T00:00:00.000Z", "out/a");
        write_run(&dir_b, 99, "2026-02-02T12:34:56.789Z", "out/b");

        let fp_a = fingerprint_run(&dir_a).unwrap();
        let fp_b = fingerprint_run(&dir_b).unwrap();

        assert!(fp_a.is_equivalent(&fp_b));
        assert_eq!(fp_a.summary, fp_b.summary);
        assert_eq!(fp_a.actions, fp_b.actions);
    }

    #[test]
    fn metric_changes_break_equivalence() {
        let base = temp_dir().join(format!("af_fp_diff_test_{}", std::process::id()));
        let dir_a = base.join("a");
        let dir_b = base.join("b");
        write_run(&dir_a, 1, "t", "o");
        write_run(&dir_b, 1, "t", "o");
        fs::write(dir_b.join("metrics.csv"), "tick,timestamp,volume\n0,100,6\n").unwrap();

        let fp_a = fingerprint_run(&dir_a).unwrap();
        let fp_b = fingerprint_run(&dir_b).unwrap();
        assert!(!fp_a.is_equivalent(&fp_b));
    }

    #[test]
    fn missing_artifact_is_a_read_error() {
        let dir = temp_dir().join(format!("af_fp_missing_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let err = fingerprint_run(&dir).unwrap_err();
        assert_eq!(err.kind_code(), "artifact_read");
    }
}
