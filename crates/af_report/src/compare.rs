//! # Run comparison
//!
//! Diffs two finished runs: metadata, KPIs, action frequencies, revert
//! reasons, and determinism equivalence via the artifact fingerprints.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;

use af_artifacts::{fingerprint_run, RunFingerprint};
use af_types::ForgeResult;

use crate::loader::{load_run, LoadedRun};
use crate::markdown::{fmt_num, table};
use crate::run_report::{action_frequencies, revert_reasons};

/// `percent_change` convention shared with the matrix orchestrator:
/// 0 when both averages are 0, 100 when only the baseline is 0, otherwise
/// `100 * delta / |a|`.
pub fn percent_change(a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        0.0
    } else if a == 0.0 {
        100.0
    } else {
        100.0 * (b - a) / a.abs()
    }
}

/// A scalar configuration field that differs between the runs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDiff {
    pub field: String,
    pub a: String,
    pub b: String,
}

/// One final-metric difference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiDiff {
    pub metric: String,
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub delta: f64,
    pub percent_change: f64,
    /// Whether `|percent_change|` exceeds the caller's threshold
    pub significant: bool,
}

/// A count that differs between the runs (action names, revert reasons).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountDiff {
    pub key: String,
    pub a: u64,
    pub b: u64,
}

/// The full comparison document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunComparison {
    pub run_a: String,
    pub run_b: String,
    pub metadata_diffs: Vec<MetadataDiff>,
    pub kpi_diffs: Vec<KpiDiff>,
    pub action_frequency_diffs: Vec<CountDiff>,
    pub revert_reason_diffs: Vec<CountDiff>,
    /// Fingerprints of `metrics.csv`, normalized `actions.ndjson`, and
    /// `config_resolved.json` (without `outDir`) all match
    pub deterministically_equivalent: bool,
    #[serde(skip)]
    pub fingerprint_a: RunFingerprint,
    #[serde(skip)]
    pub fingerprint_b: RunFingerprint,
}

impl RunComparison {
    /// Total differences across every category.
    pub fn difference_count(&self) -> usize {
        self.metadata_diffs.len()
            + self.kpi_diffs.len()
            + self.action_frequency_diffs.len()
            + self.revert_reason_diffs.len()
    }
}

/// Compare two run directories. `threshold_pct` marks KPI diffs whose
/// percent change exceeds it as significant.
pub fn compare_runs(dir_a: &Path, dir_b: &Path, threshold_pct: f64) -> ForgeResult<RunComparison> {
    let a = load_run(dir_a)?;
    let b = load_run(dir_b)?;

    let fingerprint_a = fingerprint_run(dir_a)?;
    let fingerprint_b = fingerprint_run(dir_b)?;

    Ok(RunComparison {
        run_a: a.summary.run_id.clone(),
        run_b: b.summary.run_id.clone(),
        metadata_diffs: metadata_diffs(&a, &b),
        kpi_diffs: kpi_diffs(&a, &b, threshold_pct),
        action_frequency_diffs: count_diffs(action_frequencies(&a.actions), action_frequencies(&b.actions)),
        revert_reason_diffs: count_diffs(revert_reasons(&a.actions), revert_reasons(&b.actions)),
        deterministically_equivalent: fingerprint_a.is_equivalent(&fingerprint_b),
        fingerprint_a,
        fingerprint_b,
    })
}

fn metadata_diffs(a: &LoadedRun, b: &LoadedRun) -> Vec<MetadataDiff> {
    let mut diffs = Vec::new();
    let sa = &a.config.scenario;
    let sb = &b.config.scenario;

    if sa.seed != sb.seed {
        diffs.push(MetadataDiff {
            field: "seed".into(),
            a: sa.seed.to_string(),
            b: sb.seed.to_string(),
        });
    }
    if sa.ticks != sb.ticks {
        diffs.push(MetadataDiff {
            field: "ticks".into(),
            a: sa.ticks.to_string(),
            b: sb.ticks.to_string(),
        });
    }
    if sa.tick_seconds != sb.tick_seconds {
        diffs.push(MetadataDiff {
            field: "tickSeconds".into(),
            a: format!("{}", sa.tick_seconds),
            b: format!("{}", sb.tick_seconds),
        });
    }

    diffs
}

fn kpi_diffs(a: &LoadedRun, b: &LoadedRun, threshold_pct: f64) -> Vec<KpiDiff> {
    let keys: BTreeSet<&String> = a
        .summary
        .final_metrics
        .keys()
        .chain(b.summary.final_metrics.keys())
        .collect();

    let mut diffs = Vec::new();
    for key in keys {
        let va = a.summary.final_metrics.get(key).and_then(|v| v.as_f64());
        let vb = b.summary.final_metrics.get(key).and_then(|v| v.as_f64());

        if va == vb {
            continue;
        }

        let (fa, fb) = (va.unwrap_or(0.0), vb.unwrap_or(0.0));
        let pct = percent_change(fa, fb);
        diffs.push(KpiDiff {
            metric: key.clone(),
            a: va,
            b: vb,
            delta: fb - fa,
            percent_change: pct,
            significant: pct.abs() > threshold_pct,
        });
    }

    diffs
}

fn count_diffs(
    a: std::collections::BTreeMap<String, u64>,
    b: std::collections::BTreeMap<String, u64>,
) -> Vec<CountDiff> {
    let keys: BTreeSet<String> = a.keys().chain(b.keys()).cloned().collect();
    keys.into_iter()
        .filter_map(|key| {
            let ca = a.get(&key).copied().unwrap_or(0);
            let cb = b.get(&key).copied().unwrap_or(0);
            (ca != cb).then(|| CountDiff { key, a: ca, b: cb })
        })
        .collect()
}

/// Render the comparison as markdown.
pub fn comparison_markdown(comparison: &RunComparison) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Run Comparison: {} vs {}\n\n",
        comparison.run_a, comparison.run_b
    ));

    out.push_str(&format!(
        "Deterministically equivalent: **{}**\n\n",
        comparison.deterministically_equivalent
    ));

    out.push_str("## Metadata\n\n");
    if comparison.metadata_diffs.is_empty() {
        out.push_str("No differences.\n");
    } else {
        let rows: Vec<Vec<String>> = comparison
            .metadata_diffs
            .iter()
            .map(|d| vec![d.field.clone(), d.a.clone(), d.b.clone()])
            .collect();
        out.push_str(&table(&["field", "A", "B"], &rows));
    }
    out.push('\n');

    out.push_str("## KPI Differences\n\n");
    if comparison.kpi_diffs.is_empty() {
        out.push_str("No differences.\n");
    } else {
        let rows: Vec<Vec<String>> = comparison
            .kpi_diffs
            .iter()
            .map(|d| {
                vec![
                    d.metric.clone(),
                    d.a.map(fmt_num).unwrap_or_else(|| "-".into()),
                    d.b.map(fmt_num).unwrap_or_else(|| "-".into()),
                    fmt_num(d.delta),
                    format!("{}%", fmt_num(d.percent_change)),
                    if d.significant { "yes" } else { "" }.into(),
                ]
            })
            .collect();
        out.push_str(&table(
            &["metric", "A", "B", "delta", "change", "significant"],
            &rows,
        ));
    }
    out.push('\n');

    out.push_str("## Action Frequencies\n\n");
    if comparison.action_frequency_diffs.is_empty() {
        out.push_str("No differences.\n");
    } else {
        let rows: Vec<Vec<String>> = comparison
            .action_frequency_diffs
            .iter()
            .map(|d| vec![d.key.clone(), d.a.to_string(), d.b.to_string()])
            .collect();
        out.push_str(&table(&["action", "A", "B"], &rows));
    }
    out.push('\n');

    out.push_str("## Revert Reasons\n\n");
    if comparison.revert_reason_diffs.is_empty() {
        out.push_str("No differences.\n");
    } else {
        let rows: Vec<Vec<String>> = comparison
            .revert_reason_diffs
            .iter()
            .map(|d| vec![d.key.clone(), d.a.to_string(), d.b.to_string()])
            .collect();
        out.push_str(&table(&["reason", "A", "B"], &rows));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_change_conventions() {
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert_eq!(percent_change(0.0, 5.0), 100.0);
        assert_eq!(percent_change(10.0, 15.0), 50.0);
        assert_eq!(percent_change(10.0, 5.0), -50.0);
        assert_eq!(percent_change(-10.0, -5.0), 50.0);
    }
}
