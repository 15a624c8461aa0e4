//! # Variant matrix
//!
//! Runs every variant of a base scenario against every seed, averages each
//! variant's metrics, and compares all unordered variant pairs.
//!
//! A variant is synthesized by shallow merge: `name = <base>-<variant>`,
//! the pack replaced when an override is supplied, and scalar overrides
//! applied over the base values.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use af_api::RunResult;
use af_engine::{run, PackFactory, RunOptions, Scenario};
use af_report::compare::percent_change;
use af_report::markdown::{fmt_num, table};
use af_types::{ForgeError, ForgeResult};

/// Scalar scenario overrides a variant may carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioOverrides {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub tick_seconds: Option<f64>,
}

/// One variant, fully resolved (pack override already constructed).
#[derive(Clone)]
pub struct VariantSpec {
    pub name: String,
    pub description: Option<String>,
    pub pack_override: Option<Arc<dyn PackFactory>>,
    pub overrides: ScenarioOverrides,
}

impl VariantSpec {
    pub fn new(name: impl Into<String>) -> Self {
        VariantSpec {
            name: name.into(),
            description: None,
            pack_override: None,
            overrides: ScenarioOverrides::default(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn pack_override(mut self, pack: Arc<dyn PackFactory>) -> Self {
        self.pack_override = Some(pack);
        self
    }

    pub fn overrides(mut self, overrides: ScenarioOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Variant as it appears in a variants file; the pack override is a
/// registry label the caller resolves.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pack: Option<String>,
    #[serde(default)]
    pub overrides: ScenarioOverrides,
}

/// Load a JSON array of variant entries.
pub fn load_variant_entries(path: &Path) -> ForgeResult<Vec<VariantEntry>> {
    let body = fs::read_to_string(path)
        .map_err(|e| ForgeError::ScenarioLoad(format!("failed to read {:?}: {}", path, e)))?;
    serde_json::from_str(&body)
        .map_err(|e| ForgeError::InvalidScenario(format!("bad variants file {:?}: {}", path, e)))
}

#[derive(Debug, Clone)]
pub struct MatrixOptions {
    pub seeds: Vec<u64>,
    pub ticks: Option<u64>,
    pub out_dir: PathBuf,
    pub ci: bool,
}

/// Aggregated outcome for one variant.
pub struct VariantOutcome {
    pub name: String,
    pub description: Option<String>,
    pub runs: Vec<RunResult>,
    pub passed: usize,
    pub failed: usize,
    /// Mean of each numeric metric over the runs it appears in
    pub averaged: BTreeMap<String, f64>,
}

/// One metric's delta between two variants' averages.
pub struct PairwiseMetric {
    pub metric: String,
    pub avg_a: f64,
    pub avg_b: f64,
    pub delta: f64,
    pub percent_change: f64,
}

/// Comparison of one unordered variant pair (`a` earlier in list order).
pub struct PairwiseComparison {
    pub a: String,
    pub b: String,
    pub metrics: Vec<PairwiseMetric>,
}

pub struct MatrixResult {
    pub matrix_dir: PathBuf,
    pub variants: Vec<VariantOutcome>,
    pub pairwise: Vec<PairwiseComparison>,
}

impl MatrixResult {
    /// A variant "fails" when none of its runs pass.
    pub fn any_variant_failed_entirely(&self) -> bool {
        self.variants.iter().any(|v| v.passed == 0 && !v.runs.is_empty())
    }
}

/// Run the full matrix: every variant against every seed.
pub fn run_matrix(
    base: &Scenario,
    variants: &[VariantSpec],
    options: &MatrixOptions,
) -> ForgeResult<MatrixResult> {
    if variants.is_empty() {
        return Err(ForgeError::InvalidScenario(
            "matrix requires at least one variant".into(),
        ));
    }
    if options.seeds.is_empty() {
        return Err(ForgeError::InvalidScenario(
            "matrix requires at least one seed".into(),
        ));
    }

    let matrix_dir = options.out_dir.join(format!("{}-matrix", base.name));
    fs::create_dir_all(&matrix_dir).map_err(|e| {
        ForgeError::ArtifactWrite(format!("failed to create matrix dir {:?}: {}", matrix_dir, e))
    })?;

    let mut outcomes = Vec::with_capacity(variants.len());
    for variant in variants {
        let scenario = synthesize(base, variant)?;
        let mut runs = Vec::with_capacity(options.seeds.len());

        for seed in &options.seeds {
            let run_options = RunOptions {
                seed: Some(*seed),
                ticks: options.ticks,
                tick_seconds: None,
                out_dir: matrix_dir
                    .join(&variant.name)
                    .join("runs")
                    .join(format!("seed_{}", seed)),
                ci: options.ci,
                verbose: false,
            };
            info!(variant = %variant.name, seed, "matrix run");
            runs.push(run(&scenario, &run_options)?);
        }

        let passed = runs.iter().filter(|r| r.success).count();
        let failed = runs.len() - passed;
        let averaged = averaged_metrics(&runs);
        outcomes.push(VariantOutcome {
            name: variant.name.clone(),
            description: variant.description.clone(),
            runs,
            passed,
            failed,
            averaged,
        });
    }

    let pairwise = pairwise_comparisons(&outcomes);
    write_report(&matrix_dir, base, &outcomes, &pairwise)?;

    Ok(MatrixResult {
        matrix_dir,
        variants: outcomes,
        pairwise,
    })
}

/// Shallow-merge a variant over the base scenario.
fn synthesize(base: &Scenario, variant: &VariantSpec) -> ForgeResult<Scenario> {
    if variant.name.is_empty()
        || !variant
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ForgeError::InvalidScenario(format!(
            "variant name \"{}\" must match [A-Za-z0-9_-]+",
            variant.name
        )));
    }

    let mut scenario = base.clone();
    scenario.name = format!("{}-{}", base.name, variant.name);
    if let Some(pack) = &variant.pack_override {
        scenario.pack = pack.clone();
    }
    if let Some(seed) = variant.overrides.seed {
        scenario.seed = af_types::Seed::new(seed);
    }
    if let Some(ticks) = variant.overrides.ticks {
        scenario.ticks = ticks;
    }
    if let Some(tick_seconds) = variant.overrides.tick_seconds {
        scenario.tick_seconds = tick_seconds;
    }
    Ok(scenario)
}

/// Mean of each numeric metric over the runs it appears in.
fn averaged_metrics(runs: &[RunResult]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for run in runs {
        for (key, value) in &run.final_metrics {
            if let Some(v) = value.as_f64() {
                let entry = sums.entry(key.clone()).or_insert((0.0, 0));
                entry.0 += v;
                entry.1 += 1;
            }
        }
    }
    sums.into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}

/// All unordered pairs `(A, B)` with `A` before `B` in list order.
fn pairwise_comparisons(outcomes: &[VariantOutcome]) -> Vec<PairwiseComparison> {
    let mut comparisons = Vec::new();
    for i in 0..outcomes.len() {
        for j in (i + 1)..outcomes.len() {
            let a = &outcomes[i];
            let b = &outcomes[j];
            let keys: BTreeSet<&String> = a.averaged.keys().chain(b.averaged.keys()).collect();

            let metrics = keys
                .into_iter()
                .map(|key| {
                    let avg_a = a.averaged.get(key).copied().unwrap_or(0.0);
                    let avg_b = b.averaged.get(key).copied().unwrap_or(0.0);
                    PairwiseMetric {
                        metric: key.clone(),
                        avg_a,
                        avg_b,
                        delta: avg_b - avg_a,
                        percent_change: percent_change(avg_a, avg_b),
                    }
                })
                .collect();

            comparisons.push(PairwiseComparison {
                a: a.name.clone(),
                b: b.name.clone(),
                metrics,
            });
        }
    }
    comparisons
}

fn write_report(
    matrix_dir: &Path,
    base: &Scenario,
    outcomes: &[VariantOutcome],
    pairwise: &[PairwiseComparison],
) -> ForgeResult<()> {
    let mut out = String::new();
    out.push_str(&format!("# Matrix Report: {}\n\n", base.name));

    out.push_str("## Variants\n\n");
    let rows: Vec<Vec<String>> = outcomes
        .iter()
        .map(|v| {
            vec![
                v.name.clone(),
                v.description.clone().unwrap_or_else(|| "-".into()),
                v.passed.to_string(),
                v.failed.to_string(),
            ]
        })
        .collect();
    out.push_str(&table(&["variant", "description", "passed", "failed"], &rows));
    out.push('\n');

    out.push_str("## Averaged Metrics\n\n");
    let metric_keys: BTreeSet<String> = outcomes
        .iter()
        .flat_map(|v| v.averaged.keys().cloned())
        .collect();
    if metric_keys.is_empty() {
        out.push_str("No numeric metrics captured.\n");
    } else {
        let mut headers: Vec<&str> = vec!["metric"];
        let names: Vec<String> = outcomes.iter().map(|v| v.name.clone()).collect();
        headers.extend(names.iter().map(String::as_str));

        let rows: Vec<Vec<String>> = metric_keys
            .iter()
            .map(|key| {
                let mut row = vec![key.clone()];
                for outcome in outcomes {
                    row.push(
                        outcome
                            .averaged
                            .get(key)
                            .map(|v| fmt_num(*v))
                            .unwrap_or_else(|| "-".into()),
                    );
                }
                row
            })
            .collect();
        out.push_str(&table(&headers, &rows));
    }
    out.push('\n');

    for comparison in pairwise {
        out.push_str(&format!("## {} vs {}\n\n", comparison.a, comparison.b));
        let rows: Vec<Vec<String>> = comparison
            .metrics
            .iter()
            .map(|m| {
                vec![
                    m.metric.clone(),
                    fmt_num(m.avg_a),
                    fmt_num(m.avg_b),
                    fmt_num(m.delta),
                    format!("{}%", fmt_num(m.percent_change)),
                ]
            })
            .collect();
        out.push_str(&table(
            &[
                "metric",
                comparison.a.as_str(),
                comparison.b.as_str(),
                "delta",
                "percentChange",
            ],
            &rows,
        ));
        out.push('\n');
    }

    fs::write(matrix_dir.join("report.md"), out)
        .map_err(|e| ForgeError::ArtifactWrite(format!("failed to write report.md: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averaged_metrics_skips_missing_runs() {
        use af_types::{MetricMap, MetricValue};

        let mk = |volume: Option<f64>| {
            let mut metrics = MetricMap::new();
            if let Some(v) = volume {
                let _ = metrics.insert("volume".into(), MetricValue::Number(v));
            }
            RunResult {
                run_id: "r".into(),
                scenario_name: "s".into(),
                seed: 1,
                ticks: 1,
                duration_ms: 0,
                success: true,
                failed_assertions: vec![],
                final_metrics: metrics,
                agent_stats: vec![],
                output_dir: ".".into(),
            }
        };

        let averaged = averaged_metrics(&[mk(Some(10.0)), mk(None), mk(Some(20.0))]);
        assert_eq!(averaged.get("volume"), Some(&15.0));
    }
}
